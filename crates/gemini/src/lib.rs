pub mod client;
pub mod error;
pub mod producer;
pub mod types;

pub use client::GeminiClient;
pub use error::{GeminiError, Result};
pub use producer::TextProducer;
pub use types::*;
