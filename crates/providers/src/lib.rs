//! Model providers and the gateway the assistant core talks to.

pub mod gateway;
pub mod ollama;
pub mod openai;
pub mod router;
pub mod sse;

pub use gateway::{ModelGateway, RouterGateway};
pub use router::{GenerationOptions, ModelProfile, ProviderRouter};
