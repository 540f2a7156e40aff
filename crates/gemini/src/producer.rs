use async_trait::async_trait;

use crate::error::Result;
use crate::types::GenerationConfig;

/// The opaque remote producer behind every agent call.
///
/// Implementations may be slow, may fail for transport reasons, and must be
/// treated as untrusted with respect to output structure. Retry policy is
/// the caller's concern, not the producer's.
#[async_trait]
pub trait TextProducer: Send + Sync {
    /// Run one generation call and return the raw response text.
    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String>;
}
