use serde::{Deserialize, Serialize};

/// Specialized responsibility assigned to one remote-producer configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Planner,
    Architect,
    Developer,
    Reviewer,
    Devops,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planner => "planner",
            Self::Architect => "architect",
            Self::Developer => "developer",
            Self::Reviewer => "reviewer",
            Self::Devops => "devops",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "planner" => Some(Self::Planner),
            "architect" => Some(Self::Architect),
            "developer" => Some(Self::Developer),
            "reviewer" => Some(Self::Reviewer),
            "devops" => Some(Self::Devops),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        assert_eq!(AgentRole::Planner.as_str(), "planner");
        assert_eq!(AgentRole::Devops.as_str(), "devops");
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!(AgentRole::parse("architect"), Some(AgentRole::Architect));
        assert_eq!(AgentRole::parse("reviewer"), Some(AgentRole::Reviewer));
        assert_eq!(AgentRole::parse("manager"), None);
    }
}
