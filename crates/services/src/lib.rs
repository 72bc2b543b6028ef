//! Infrastructure behind the assistant: web search backends, the in-memory
//! page model, and durable theme history.

pub mod page;
pub mod search;
pub mod theme_store;

pub use page::{ElementSpec, PageDocument};
pub use search::{DuckDuckGoSearch, SearchProvider, TavilySearch};
pub use theme_store::{FileSlot, MemorySlot, ReloadRequest, ThemeHistoryStore, ThemeSlot};
