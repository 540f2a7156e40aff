use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One indexed file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileEntry {
    /// Coarse language/format classification derived from the extension.
    #[serde(rename = "type")]
    pub kind: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
    /// First part of the file content, capped for prompt budgets.
    pub content_preview: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct IndexSummary {
    pub total_files: usize,
    pub file_types: BTreeMap<String, usize>,
    pub last_scan: Option<DateTime<Utc>>,
}

/// Snapshot of the project tree used to ground prompts in existing files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ProjectIndex {
    pub files: BTreeMap<String, FileEntry>,
    pub directories: Vec<String>,
    /// Relative paths grouped by top-level module.
    pub modules: BTreeMap<String, Vec<String>>,
    pub summary: IndexSummary,
}

impl ProjectIndex {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Paths whose relative path contains the given fragment.
    pub fn files_matching(&self, fragment: &str) -> Vec<&str> {
        self.files
            .keys()
            .filter(|path| path.contains(fragment))
            .map(String::as_str)
            .collect()
    }
}

/// Classify a path by extension, `"unknown"` for anything unrecognized.
pub fn classify(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("rs") => "rust",
        Some("py") => "python",
        Some("js") => "javascript",
        Some("ts") => "typescript",
        Some("java") => "java",
        Some("sql") => "sql",
        Some("json") => "json",
        Some("yml") | Some("yaml") => "yaml",
        Some("toml") => "toml",
        Some("md") => "markdown",
        Some("txt") => "text",
        Some("properties") => "properties",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_classify_known_extensions() {
        assert_eq!(classify(&PathBuf::from("src/main.rs")), "rust");
        assert_eq!(classify(&PathBuf::from("app.PY")), "python");
        assert_eq!(classify(&PathBuf::from("deploy.yaml")), "yaml");
        assert_eq!(classify(&PathBuf::from("Dockerfile")), "unknown");
    }

    #[test]
    fn test_files_matching() {
        let mut index = ProjectIndex::default();
        index.files.insert(
            "01_requirements/spec.json".to_string(),
            FileEntry {
                kind: "json".to_string(),
                size: 10,
                modified: Utc::now(),
                content_preview: String::new(),
            },
        );
        index.files.insert(
            "03_code/backend/main.py".to_string(),
            FileEntry {
                kind: "python".to_string(),
                size: 20,
                modified: Utc::now(),
                content_preview: String::new(),
            },
        );

        assert_eq!(
            index.files_matching("01_requirements"),
            vec!["01_requirements/spec.json"]
        );
        assert!(index.files_matching("05_deployment").is_empty());
    }
}
