//! Typed result records, one per agent role.
//!
//! The remote producer is untrusted with respect to output shape, so every
//! field defaults when absent and unknown keys are ignored. A record that
//! deserialized from any well-formed JSON object is considered usable; the
//! orchestrator only reads the keys it directly consumes (`modules`,
//! `code_files`, `test_files`, `dependencies`).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Outcome marker carried by every stage record.
///
/// `PartialFailure` means the record (or part of it) was substituted by a
/// fallback placeholder; the workflow still advances.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    #[default]
    Completed,
    PartialFailure,
}

impl ResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::PartialFailure => "partial_failure",
        }
    }
}

const PARSE_FAILED: &str = "Parse failed - manual review needed";

/// Planner output: requirements analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RequirementsSpec {
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub user_stories: Vec<String>,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    #[serde(default)]
    pub timeline: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub status: ResultStatus,
}

impl RequirementsSpec {
    /// Schema-valid placeholder substituted when all retries are exhausted.
    pub fn parse_failed() -> Self {
        Self {
            requirements: vec![PARSE_FAILED.to_string()],
            user_stories: vec![PARSE_FAILED.to_string()],
            acceptance_criteria: vec![PARSE_FAILED.to_string()],
            timeline: PARSE_FAILED.to_string(),
            priority: String::new(),
            status: ResultStatus::PartialFailure,
        }
    }
}

/// Architect output: system design.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ArchitectureSpec {
    #[serde(default)]
    pub architecture_type: String,
    #[serde(default)]
    pub tech_stack: BTreeMap<String, String>,
    #[serde(default)]
    pub database_schema: String,
    #[serde(default)]
    pub api_design: String,
    #[serde(default)]
    pub modules: Vec<String>,
    #[serde(default)]
    pub status: ResultStatus,
}

impl ArchitectureSpec {
    pub fn parse_failed() -> Self {
        Self {
            architecture_type: "microservices".to_string(),
            tech_stack: BTreeMap::from([
                ("backend".to_string(), "FastAPI".to_string()),
                ("frontend".to_string(), "React".to_string()),
                ("database".to_string(), "PostgreSQL".to_string()),
            ]),
            database_schema: PARSE_FAILED.to_string(),
            api_design: PARSE_FAILED.to_string(),
            modules: Vec::new(),
            status: ResultStatus::PartialFailure,
        }
    }
}

/// Developer output for a single module.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ModuleSpec {
    #[serde(default)]
    pub modules: Vec<String>,
    #[serde(default)]
    pub file_structure: BTreeMap<String, String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub code_files: BTreeMap<String, String>,
    #[serde(default)]
    pub status: ResultStatus,
}

impl ModuleSpec {
    pub fn parse_failed() -> Self {
        Self {
            modules: vec![
                "backend".to_string(),
                "frontend".to_string(),
                "database".to_string(),
            ],
            file_structure: BTreeMap::from([
                ("backend/".to_string(), "API server files".to_string()),
                ("frontend/".to_string(), "UI application files".to_string()),
                ("database/".to_string(), "Schema and migration files".to_string()),
            ]),
            dependencies: Vec::new(),
            code_files: BTreeMap::from([(
                "README.md".to_string(),
                "# Generated with parsing issues\nManual review required.\n".to_string(),
            )]),
            status: ResultStatus::PartialFailure,
        }
    }
}

/// Fan-in aggregate of all module generation tasks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CodebaseSpec {
    #[serde(default)]
    pub modules: BTreeMap<String, ModuleSpec>,
    #[serde(default)]
    pub file_structure: BTreeMap<String, String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub status: ResultStatus,
}

impl CodebaseSpec {
    /// Merge per-module results into the combined stage record.
    ///
    /// Dependencies are unioned and deduplicated; the combined status is
    /// `PartialFailure` if any module record carries it.
    pub fn merge(modules: BTreeMap<String, ModuleSpec>) -> Self {
        let mut dependencies = BTreeSet::new();
        let mut file_structure = BTreeMap::new();
        let mut status = ResultStatus::Completed;

        for module in modules.values() {
            dependencies.extend(module.dependencies.iter().cloned());
            file_structure.extend(
                module
                    .file_structure
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone())),
            );
            if module.status == ResultStatus::PartialFailure {
                status = ResultStatus::PartialFailure;
            }
        }

        Self {
            modules,
            file_structure,
            dependencies: dependencies.into_iter().collect(),
            status,
        }
    }
}

/// Reviewer output: code review plus generated test files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ReviewReport {
    #[serde(default)]
    pub code_quality_score: u32,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub test_files: BTreeMap<String, String>,
    #[serde(default)]
    pub security_report: String,
    #[serde(default)]
    pub status: ResultStatus,
}

impl ReviewReport {
    pub fn parse_failed() -> Self {
        Self {
            code_quality_score: 0,
            issues: vec!["JSON parsing failed - manual code review required".to_string()],
            suggestions: vec!["Fix JSON parsing issues".to_string()],
            test_files: BTreeMap::new(),
            security_report: PARSE_FAILED.to_string(),
            status: ResultStatus::PartialFailure,
        }
    }
}

/// Devops output: deployment configuration files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DeploymentSpec {
    #[serde(default)]
    pub docker_files: BTreeMap<String, String>,
    #[serde(default)]
    pub ci_cd_config: BTreeMap<String, String>,
    #[serde(default)]
    pub k8s_manifests: BTreeMap<String, String>,
    #[serde(default)]
    pub deployment_guide: String,
    #[serde(default)]
    pub status: ResultStatus,
}

impl DeploymentSpec {
    pub fn parse_failed() -> Self {
        Self {
            docker_files: BTreeMap::new(),
            ci_cd_config: BTreeMap::new(),
            k8s_manifests: BTreeMap::new(),
            deployment_guide: PARSE_FAILED.to_string(),
            status: ResultStatus::PartialFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_status_default_is_completed() {
        assert_eq!(ResultStatus::default(), ResultStatus::Completed);
        assert_eq!(ResultStatus::PartialFailure.as_str(), "partial_failure");
    }

    #[test]
    fn test_record_deserializes_from_sparse_object() {
        let spec: RequirementsSpec =
            serde_json::from_str(r#"{"requirements":["a","b"]}"#).unwrap();
        assert_eq!(spec.requirements, vec!["a", "b"]);
        assert!(spec.user_stories.is_empty());
        assert_eq!(spec.status, ResultStatus::Completed);
    }

    #[test]
    fn test_record_ignores_unknown_keys() {
        let spec: ArchitectureSpec =
            serde_json::from_str(r#"{"modules":["auth"],"surprise":42}"#).unwrap();
        assert_eq!(spec.modules, vec!["auth"]);
    }

    #[test]
    fn test_parse_failed_records_signal_partial_failure() {
        assert_eq!(
            RequirementsSpec::parse_failed().status,
            ResultStatus::PartialFailure
        );
        assert_eq!(
            ModuleSpec::parse_failed().status,
            ResultStatus::PartialFailure
        );
        assert_eq!(
            DeploymentSpec::parse_failed().status,
            ResultStatus::PartialFailure
        );
    }

    #[test]
    fn test_merge_unions_and_dedups_dependencies() {
        let mut modules = BTreeMap::new();
        modules.insert(
            "backend".to_string(),
            ModuleSpec {
                dependencies: vec!["fastapi".to_string(), "postgres".to_string()],
                ..Default::default()
            },
        );
        modules.insert(
            "frontend".to_string(),
            ModuleSpec {
                dependencies: vec!["react".to_string(), "postgres".to_string()],
                ..Default::default()
            },
        );

        let combined = CodebaseSpec::merge(modules);
        assert_eq!(combined.dependencies, vec!["fastapi", "postgres", "react"]);
        assert_eq!(combined.status, ResultStatus::Completed);
    }

    #[test]
    fn test_merge_propagates_partial_failure() {
        let mut modules = BTreeMap::new();
        modules.insert("backend".to_string(), ModuleSpec::default());
        modules.insert("frontend".to_string(), ModuleSpec::parse_failed());

        let combined = CodebaseSpec::merge(modules);
        assert_eq!(combined.status, ResultStatus::PartialFailure);
    }
}
