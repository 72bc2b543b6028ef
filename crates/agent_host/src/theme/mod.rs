//! Theme directives: the closed mutation interpreter and the directive flow
//! that feeds it.

pub mod executor;
pub mod processor;

pub use executor::{ExecutionReport, SafeMutationExecutor};
pub use processor::{extract_plan, render_result, ThemeDirectiveProcessor, ThemePlan};
