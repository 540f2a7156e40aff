//! Remote agent invocation with retry, backoff, and fallback.
//!
//! `AgentClient::invoke` never fails outward: after exhausting its retry
//! budget it substitutes the role's schema-valid placeholder record, so the
//! workflow keeps advancing even under total producer failure. Content
//! correctness is traded for pipeline liveness; the record's status field
//! carries the degradation signal.

use std::sync::Arc;

use forge_core::{
    AgentRole, ArchitectureSpec, DeploymentSpec, ModuleSpec, ProjectContext, RequirementsSpec,
    ReviewReport,
};
use gemini::{GeminiError, GenerationConfig, TextProducer};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::RetryPolicy;
use crate::parser;
use crate::prompts::AgentPrompts;

/// A typed stage record an agent role can produce.
pub trait AgentRecord: DeserializeOwned + Serialize + Send + 'static {
    const ROLE: AgentRole;

    /// Placeholder substituted when every attempt failed.
    fn fallback() -> Self;
}

impl AgentRecord for RequirementsSpec {
    const ROLE: AgentRole = AgentRole::Planner;

    fn fallback() -> Self {
        Self::parse_failed()
    }
}

impl AgentRecord for ArchitectureSpec {
    const ROLE: AgentRole = AgentRole::Architect;

    fn fallback() -> Self {
        Self::parse_failed()
    }
}

impl AgentRecord for ModuleSpec {
    const ROLE: AgentRole = AgentRole::Developer;

    fn fallback() -> Self {
        Self::parse_failed()
    }
}

impl AgentRecord for ReviewReport {
    const ROLE: AgentRole = AgentRole::Reviewer;

    fn fallback() -> Self {
        Self::parse_failed()
    }
}

impl AgentRecord for DeploymentSpec {
    const ROLE: AgentRole = AgentRole::Devops;

    fn fallback() -> Self {
        Self::parse_failed()
    }
}

/// Why a single attempt did not yield a usable record.
#[derive(Debug)]
enum AttemptError {
    /// The remote call itself failed.
    Producer(GeminiError),
    /// The call returned text, but no strategy recovered a matching record.
    Unparseable,
}

/// Wraps one role's request/response cycle against the remote producer.
pub struct AgentClient {
    producer: Arc<dyn TextProducer>,
    generation: GenerationConfig,
    retry: RetryPolicy,
}

impl AgentClient {
    pub fn new(
        producer: Arc<dyn TextProducer>,
        generation: GenerationConfig,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            producer,
            generation,
            retry,
        }
    }

    /// Run one agent invocation to completion.
    ///
    /// Makes at most `retry.max_attempts` remote calls, sleeping with
    /// exponential backoff between failures, and returns the role's
    /// fallback record once the budget is exhausted.
    pub async fn invoke<R: AgentRecord>(
        &self,
        instruction: &str,
        context: &ProjectContext,
        reference: &str,
    ) -> R {
        let role = R::ROLE;
        let prompt = AgentPrompts::compose(role, context, reference, instruction);

        for attempt in 0..self.retry.max_attempts {
            match self.attempt::<R>(&prompt).await {
                Ok(record) => {
                    info!(role = role.as_str(), attempt, "Agent call successful");
                    return record;
                }
                Err(AttemptError::Producer(e)) => {
                    warn!(role = role.as_str(), attempt, error = %e, "Remote call failed");
                }
                Err(AttemptError::Unparseable) => {
                    warn!(
                        role = role.as_str(),
                        attempt, "Response did not contain a usable record"
                    );
                }
            }

            if attempt + 1 < self.retry.max_attempts {
                let delay = self.retry.delay_for(attempt);
                debug!(
                    role = role.as_str(),
                    delay_ms = delay.as_millis() as u64,
                    "Backing off before retry"
                );
                tokio::time::sleep(delay).await;
            }
        }

        warn!(
            role = role.as_str(),
            "Falling back to placeholder record after all retries"
        );
        R::fallback()
    }

    async fn attempt<R: AgentRecord>(&self, prompt: &str) -> Result<R, AttemptError> {
        let raw = self
            .producer
            .generate(prompt, &self.generation)
            .await
            .map_err(AttemptError::Producer)?;

        let value = parser::parse(&raw).ok_or(AttemptError::Unparseable)?;
        serde_json::from_value(value).map_err(|_| AttemptError::Unparseable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use forge_core::ResultStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct ScriptedProducer {
        responses: Mutex<Vec<gemini::Result<String>>>,
        calls: AtomicUsize,
    }

    impl ScriptedProducer {
        fn new(responses: Vec<gemini::Result<String>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TextProducer for ScriptedProducer {
        async fn generate(&self, _prompt: &str, _config: &GenerationConfig) -> gemini::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                Err(GeminiError::EmptyResponse)
            } else {
                responses.remove(0)
            }
        }
    }

    fn client(producer: Arc<ScriptedProducer>) -> AgentClient {
        AgentClient::new(producer, GenerationConfig::default(), RetryPolicy::default())
    }

    fn sample_context() -> ProjectContext {
        ProjectContext::new("p").unwrap()
    }

    #[tokio::test]
    async fn test_first_attempt_success_makes_one_call() {
        let producer = Arc::new(ScriptedProducer::new(vec![Ok(
            r#"{"requirements":["login"],"timeline":"2 weeks"}"#.to_string(),
        )]));
        let agent = client(Arc::clone(&producer));

        let record: RequirementsSpec = agent.invoke("r", &sample_context(), "").await;

        assert_eq!(producer.calls(), 1);
        assert_eq!(record.requirements, vec!["login"]);
        assert_eq!(record.status, ResultStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_producer_error_then_success() {
        let producer = Arc::new(ScriptedProducer::new(vec![
            Err(GeminiError::Api {
                message: "overloaded".to_string(),
                status_code: Some(503),
            }),
            Ok(r#"{"modules":["backend"],"dependencies":["fastapi"]}"#.to_string()),
        ]));
        let agent = client(Arc::clone(&producer));

        let record: ModuleSpec = agent.invoke("m", &sample_context(), "").await;

        assert_eq!(producer.calls(), 2);
        assert_eq!(record.dependencies, vec!["fastapi"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unparseable_response_retries() {
        let producer = Arc::new(ScriptedProducer::new(vec![
            Ok("I could not produce JSON, sorry.".to_string()),
            Ok(r#"{"code_quality_score": 90}"#.to_string()),
        ]));
        let agent = client(Arc::clone(&producer));

        let record: ReviewReport = agent.invoke("r", &sample_context(), "").await;

        assert_eq!(producer.calls(), 2);
        assert_eq!(record.code_quality_score, 90);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_return_fallback_not_error() {
        let producer = Arc::new(ScriptedProducer::new(vec![]));
        let agent = client(Arc::clone(&producer));

        let record: RequirementsSpec = agent.invoke("r", &sample_context(), "").await;

        // Retry bound: exactly three remote-call attempts, then the fallback.
        assert_eq!(producer.calls(), 3);
        assert_eq!(record.status, ResultStatus::PartialFailure);
        assert_eq!(record, RequirementsSpec::parse_failed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_doubles_between_attempts() {
        let producer = Arc::new(ScriptedProducer::new(vec![]));
        let agent = client(Arc::clone(&producer));

        let start = tokio::time::Instant::now();
        let _: ReviewReport = agent.invoke("r", &sample_context(), "").await;

        // Sleeps of 1s and 2s between the three attempts; none after the last.
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_wrapped_response_parses_via_fallback_chain() {
        let producer = Arc::new(ScriptedProducer::new(vec![Ok(
            "Here you go:\n```json\n{\"architecture_type\":\"monolith\",\"modules\":[\"api\"]}\n```"
                .to_string(),
        )]));
        let agent = client(Arc::clone(&producer));

        let record: ArchitectureSpec = agent.invoke("a", &sample_context(), "").await;

        assert_eq!(producer.calls(), 1);
        assert_eq!(record.architecture_type, "monolith");
        assert_eq!(record.modules, vec!["api"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_type_mismatch_counts_as_unparseable() {
        // `requirements` must be an array of strings; a plain string is
        // malformed output, so the attempt is retried until the budget runs out.
        let producer = Arc::new(ScriptedProducer::new(vec![
            Ok(r#"{"requirements": "not a list"}"#.to_string()),
            Ok(r#"{"requirements": "still not"}"#.to_string()),
            Ok(r#"{"requirements": "nope"}"#.to_string()),
        ]));
        let agent = client(Arc::clone(&producer));

        let record: RequirementsSpec = agent.invoke("r", &sample_context(), "").await;

        assert_eq!(producer.calls(), 3);
        assert_eq!(record.status, ResultStatus::PartialFailure);
    }
}
