//! Workflow configuration, constructed once at process start and passed by
//! reference into the engine and agent client. No ambient lookup.

use std::path::PathBuf;
use std::time::Duration;

use gemini::GenerationConfig;

/// Retry behavior for a single agent invocation.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum remote-call attempts per invocation (including the first).
    pub max_attempts: u32,
    /// Base delay; the wait doubles with each failed attempt.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff delay after the given zero-indexed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Root directory that holds one subdirectory per project.
    pub projects_dir: PathBuf,
    pub retry: RetryPolicy,
    /// Fixed sampling configuration used for every remote call.
    pub generation: GenerationConfig,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            projects_dir: PathBuf::from("projects"),
            retry: RetryPolicy::default(),
            generation: GenerationConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_policy_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_backoff_doubles_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    }

    #[test]
    fn test_workflow_config_defaults() {
        let config = WorkflowConfig::default();
        assert_eq!(config.projects_dir, PathBuf::from("projects"));
        assert_eq!(config.generation.max_output_tokens, 8192);
    }
}
