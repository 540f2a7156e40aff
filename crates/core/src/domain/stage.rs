use serde::{Deserialize, Serialize};

use crate::domain::role::AgentRole;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    NotStarted,
    Requirements,
    Architecture,
    Code,
    Review,
    Deployment,
    Completed,
}

/// The five generation stages, in execution order.
pub const GENERATION_STAGES: [Stage; 5] = [
    Stage::Requirements,
    Stage::Architecture,
    Stage::Code,
    Stage::Review,
    Stage::Deployment,
];

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Requirements => "requirements",
            Self::Architecture => "architecture",
            Self::Code => "code",
            Self::Review => "review",
            Self::Deployment => "deployment",
            Self::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "not_started" => Some(Self::NotStarted),
            "requirements" => Some(Self::Requirements),
            "architecture" => Some(Self::Architecture),
            "code" => Some(Self::Code),
            "review" => Some(Self::Review),
            "deployment" => Some(Self::Deployment),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    /// Next stage in the linear progression, `None` once completed.
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::NotStarted => Some(Self::Requirements),
            Self::Requirements => Some(Self::Architecture),
            Self::Architecture => Some(Self::Code),
            Self::Code => Some(Self::Review),
            Self::Review => Some(Self::Deployment),
            Self::Deployment => Some(Self::Completed),
            Self::Completed => None,
        }
    }

    /// The agent role that produces this stage's result.
    ///
    /// `NotStarted` and `Completed` are bookkeeping states with no role.
    pub fn role(&self) -> Option<AgentRole> {
        match self {
            Self::Requirements => Some(AgentRole::Planner),
            Self::Architecture => Some(AgentRole::Architect),
            Self::Code => Some(AgentRole::Developer),
            Self::Review => Some(AgentRole::Reviewer),
            Self::Deployment => Some(AgentRole::Devops),
            Self::NotStarted | Self::Completed => None,
        }
    }

    /// Numbered output directory for this stage's artifacts.
    pub fn output_dir(&self) -> Option<&'static str> {
        match self {
            Self::Requirements => Some("01_requirements"),
            Self::Architecture => Some("02_architecture"),
            Self::Code => Some("03_code"),
            Self::Review => Some("04_tests"),
            Self::Deployment => Some("05_deployment"),
            Self::NotStarted | Self::Completed => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_serialization() {
        assert_eq!(Stage::NotStarted.as_str(), "not_started");
        assert_eq!(Stage::Code.as_str(), "code");
        assert_eq!(Stage::Completed.as_str(), "completed");
    }

    #[test]
    fn test_stage_parsing() {
        assert_eq!(Stage::parse("requirements"), Some(Stage::Requirements));
        assert_eq!(Stage::parse("deployment"), Some(Stage::Deployment));
        assert_eq!(Stage::parse("invalid"), None);
    }

    #[test]
    fn test_stage_progression_is_linear() {
        let mut stage = Stage::NotStarted;
        let mut seen = vec![stage];
        while let Some(next) = stage.next() {
            seen.push(next);
            stage = next;
        }

        assert_eq!(
            seen,
            vec![
                Stage::NotStarted,
                Stage::Requirements,
                Stage::Architecture,
                Stage::Code,
                Stage::Review,
                Stage::Deployment,
                Stage::Completed,
            ]
        );
    }

    #[test]
    fn test_generation_stages_have_roles_and_dirs() {
        for stage in GENERATION_STAGES {
            assert!(stage.role().is_some());
            assert!(stage.output_dir().is_some());
        }
        assert!(Stage::NotStarted.role().is_none());
        assert!(Stage::Completed.output_dir().is_none());
    }

    #[test]
    fn test_stage_serde_round_trip() {
        let json = serde_json::to_string(&Stage::Review).unwrap();
        assert_eq!(json, "\"review\"");
        let back: Stage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Stage::Review);
    }
}
