use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::results::{
    ArchitectureSpec, CodebaseSpec, DeploymentSpec, RequirementsSpec, ReviewReport,
};
use crate::domain::stage::{Stage, GENERATION_STAGES};
use crate::error::CoreError;

/// Shared context threaded through every stage of a project run.
///
/// Append-only with respect to stage outputs: a stage field is `Some` iff
/// that stage finished (a fallback record still counts), and is never
/// cleared. `current_stage` reflects the last stage *entered*, which may be
/// ahead of the last completed field after a crash mid-call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectContext {
    pub project_name: String,
    #[serde(default)]
    pub requirements: Option<RequirementsSpec>,
    #[serde(default)]
    pub architecture: Option<ArchitectureSpec>,
    #[serde(default)]
    pub codebase: Option<CodebaseSpec>,
    #[serde(default)]
    pub test_results: Option<ReviewReport>,
    #[serde(default)]
    pub deployment: Option<DeploymentSpec>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub current_stage: Stage,
}

impl ProjectContext {
    /// Create a fresh context for a named project.
    ///
    /// The name becomes a directory component, so path separators and
    /// traversal are rejected here rather than at write time.
    pub fn new(project_name: impl Into<String>) -> Result<Self, CoreError> {
        let project_name = project_name.into();
        let trimmed = project_name.trim();
        if trimmed.is_empty() {
            return Err(CoreError::Validation(
                "project name must not be empty".to_string(),
            ));
        }
        if trimmed.contains(['/', '\\']) || trimmed == "." || trimmed == ".." {
            return Err(CoreError::Validation(format!(
                "project name is not a valid directory name: {trimmed:?}"
            )));
        }

        Ok(Self {
            project_name: trimmed.to_string(),
            requirements: None,
            architecture: None,
            codebase: None,
            test_results: None,
            deployment: None,
            created_at: Utc::now(),
            current_stage: Stage::NotStarted,
        })
    }

    /// Whether the given stage's result field is present.
    pub fn stage_complete(&self, stage: Stage) -> bool {
        match stage {
            Stage::Requirements => self.requirements.is_some(),
            Stage::Architecture => self.architecture.is_some(),
            Stage::Code => self.codebase.is_some(),
            Stage::Review => self.test_results.is_some(),
            Stage::Deployment => self.deployment.is_some(),
            Stage::NotStarted => true,
            Stage::Completed => self.is_complete(),
        }
    }

    /// Number of generation stages with a present result.
    pub fn completed_stage_count(&self) -> usize {
        GENERATION_STAGES
            .iter()
            .filter(|s| self.stage_complete(**s))
            .count()
    }

    pub fn is_complete(&self) -> bool {
        GENERATION_STAGES.iter().all(|s| self.stage_complete(*s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::results::ResultStatus;

    #[test]
    fn test_new_context_starts_empty() {
        let ctx = ProjectContext::new("ecommerce_platform").unwrap();
        assert_eq!(ctx.project_name, "ecommerce_platform");
        assert_eq!(ctx.current_stage, Stage::NotStarted);
        assert_eq!(ctx.completed_stage_count(), 0);
        assert!(!ctx.is_complete());
    }

    #[test]
    fn test_new_rejects_bad_names() {
        assert!(ProjectContext::new("").is_err());
        assert!(ProjectContext::new("   ").is_err());
        assert!(ProjectContext::new("../escape").is_err());
        assert!(ProjectContext::new("a/b").is_err());
        assert!(ProjectContext::new("..").is_err());
    }

    #[test]
    fn test_stage_complete_tracks_fields() {
        let mut ctx = ProjectContext::new("p").unwrap();
        assert!(!ctx.stage_complete(Stage::Requirements));

        ctx.requirements = Some(RequirementsSpec::default());
        assert!(ctx.stage_complete(Stage::Requirements));
        assert_eq!(ctx.completed_stage_count(), 1);
    }

    #[test]
    fn test_fallback_record_counts_as_complete() {
        let mut ctx = ProjectContext::new("p").unwrap();
        let fallback = RequirementsSpec::parse_failed();
        assert_eq!(fallback.status, ResultStatus::PartialFailure);

        ctx.requirements = Some(fallback);
        assert!(ctx.stage_complete(Stage::Requirements));
    }

    #[test]
    fn test_context_round_trips_through_json() {
        let mut ctx = ProjectContext::new("p").unwrap();
        ctx.architecture = Some(ArchitectureSpec {
            modules: vec!["auth".to_string()],
            ..Default::default()
        });
        ctx.current_stage = Stage::Architecture;

        let json = serde_json::to_string(&ctx).unwrap();
        let back: ProjectContext = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ctx);
    }

    #[test]
    fn test_context_loads_with_missing_fields() {
        // A context persisted by an older run may omit stage fields entirely.
        let back: ProjectContext = serde_json::from_str(
            r#"{"project_name":"p","created_at":"2026-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(back.current_stage, Stage::NotStarted);
        assert!(back.requirements.is_none());
    }
}
