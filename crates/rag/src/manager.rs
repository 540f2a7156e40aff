//! Project scanner and per-stage context builders.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use forge_core::Stage;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::index::{classify, FileEntry, ProjectIndex};

/// Files above this size are indexed without content.
const MAX_READ_BYTES: u64 = 50_000;
/// Files up to this size keep their full content cached for context text.
const MAX_CACHED_BYTES: u64 = 10_000;
/// Preview length stored in the index, in characters.
const PREVIEW_CHARS: usize = 500;
/// File name of the persisted index.
const INDEX_FILE: &str = "rag_index.json";

/// Scans a project directory and renders stage-specific reference context.
pub struct RagManager {
    project_dir: PathBuf,
    index: ProjectIndex,
    contents: BTreeMap<String, String>,
}

impl RagManager {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            index: ProjectIndex::default(),
            contents: BTreeMap::new(),
        }
    }

    pub fn index(&self) -> &ProjectIndex {
        &self.index
    }

    /// Rebuild the index from the on-disk project tree.
    pub async fn scan(&mut self) -> Result<&ProjectIndex> {
        debug!(dir = %self.project_dir.display(), "Scanning project files");

        let mut index = ProjectIndex::default();
        let mut contents = BTreeMap::new();

        if fs::try_exists(&self.project_dir).await.unwrap_or(false) {
            let mut pending = vec![self.project_dir.clone()];

            while let Some(dir) = pending.pop() {
                let mut entries = match fs::read_dir(&dir).await {
                    Ok(entries) => entries,
                    Err(e) => {
                        warn!(dir = %dir.display(), error = %e, "Could not read directory");
                        continue;
                    }
                };

                while let Some(entry) = entries.next_entry().await? {
                    let path = entry.path();
                    let file_type = entry.file_type().await?;

                    if file_type.is_dir() {
                        if let Some(rel) = self.relative(&path) {
                            index.directories.push(rel);
                        }
                        pending.push(path);
                    } else if file_type.is_file() {
                        if let Err(e) = self
                            .index_file(&path, &mut index, &mut contents)
                            .await
                        {
                            warn!(file = %path.display(), error = %e, "Could not process file");
                        }
                    }
                }
            }
        }

        index.directories.sort();
        group_modules(&mut index);
        index.summary.last_scan = Some(Utc::now());

        info!(total_files = index.summary.total_files, "Project scan complete");

        self.index = index;
        self.contents = contents;
        Ok(&self.index)
    }

    async fn index_file(
        &self,
        path: &Path,
        index: &mut ProjectIndex,
        contents: &mut BTreeMap<String, String>,
    ) -> Result<()> {
        let Some(rel) = self.relative(path) else {
            return Ok(());
        };

        let metadata = fs::metadata(path).await?;
        let size = metadata.len();
        let modified: DateTime<Utc> = metadata
            .modified()
            .map(DateTime::from)
            .unwrap_or_else(|_| Utc::now());

        let content = if size < MAX_READ_BYTES {
            let bytes = fs::read(path).await?;
            String::from_utf8_lossy(&bytes).into_owned()
        } else {
            format!("[File too large: {size} bytes]")
        };

        if size < MAX_CACHED_BYTES {
            contents.insert(rel.clone(), content.clone());
        }

        let kind = classify(path).to_string();
        *index.summary.file_types.entry(kind.clone()).or_insert(0) += 1;
        index.summary.total_files += 1;

        index.files.insert(
            rel,
            FileEntry {
                kind,
                size,
                modified,
                content_preview: content.chars().take(PREVIEW_CHARS).collect(),
            },
        );

        Ok(())
    }

    fn relative(&self, path: &Path) -> Option<String> {
        path.strip_prefix(&self.project_dir)
            .ok()
            .map(|p| p.to_string_lossy().replace('\\', "/"))
    }

    /// Reference context for a stage, built from the current index.
    ///
    /// Bookkeeping stages fall through to the general project dump.
    pub fn context_for(&self, stage: Stage) -> String {
        match stage {
            Stage::Requirements => self.requirements_context(),
            Stage::Architecture => self.architecture_context(),
            Stage::Code => self.code_context(),
            Stage::Review => self.review_context(),
            Stage::Deployment => self.deployment_context(),
            Stage::NotStarted | Stage::Completed => self.general_context(),
        }
    }

    /// Persist the index next to the generated artifacts.
    pub async fn save_index(&self) -> Result<PathBuf> {
        let index_path = self.project_dir.join(INDEX_FILE);
        let json = serde_json::to_string_pretty(&self.index)?;
        fs::write(&index_path, json).await?;

        info!(path = %index_path.display(), "Saved reference index");
        Ok(index_path)
    }

    fn requirements_context(&self) -> String {
        let mut context = String::from("EXISTING REQUIREMENTS FILES:\n");
        for path in self.index.files.keys() {
            if path.contains("01_requirements") || path.to_lowercase().contains("requirements") {
                if let Some(content) = self.contents.get(path) {
                    let _ = write!(context, "\n{path}:\n{content}\n");
                }
            }
        }
        context
    }

    fn architecture_context(&self) -> String {
        let mut context = String::from("EXISTING ARCHITECTURE & REQUIREMENTS:\n");

        for path in self.index.files_matching("01_requirements") {
            if let Some(content) = self.contents.get(path) {
                let _ = write!(context, "\nREQUIREMENTS - {path}:\n{content}\n");
            }
        }
        for path in self.index.files.keys() {
            if path.contains("02_architecture") || path.to_lowercase().contains("architecture") {
                if let Some(content) = self.contents.get(path) {
                    let _ = write!(context, "\nARCHITECTURE - {path}:\n{content}\n");
                }
            }
        }

        context
    }

    fn code_context(&self) -> String {
        let mut context = String::from("PROJECT CONTEXT FOR CODE GENERATION:\n\n");

        for fragment in ["01_requirements", "02_architecture"] {
            for path in self.index.files_matching(fragment) {
                if let Some(content) = self.contents.get(path) {
                    let label = if path.contains("01_") {
                        "REQUIREMENTS"
                    } else {
                        "ARCHITECTURE"
                    };
                    let _ = write!(context, "{label} - {path}:\n{content}\n\n");
                }
            }
        }

        let code_files = self.index.files_matching("03_code");
        if !code_files.is_empty() {
            context.push_str("EXISTING CODE STRUCTURE:\n");
            for (module, files) in &self.index.modules {
                if !files.iter().any(|f| f.contains("03_code")) {
                    continue;
                }
                let _ = write!(context, "\nModule: {module}\n");
                for path in files.iter().take(5) {
                    if path.contains("03_code") {
                        if let Some(content) = self.contents.get(path) {
                            let _ = write!(context, "  {path}: {} chars\n", content.chars().count());
                        }
                    }
                }
            }
        }

        context
    }

    fn review_context(&self) -> String {
        let mut context = String::from("CODE FILES FOR REVIEW:\n\n");

        for (module, files) in &self.index.modules {
            let module_code: Vec<_> = files.iter().filter(|f| f.contains("03_code")).collect();
            if module_code.is_empty() {
                continue;
            }

            let _ = write!(context, "MODULE: {module}\n");
            for path in module_code.iter().take(10) {
                let entry = self.index.files.get(*path);
                let kind = entry.map(|e| e.kind.as_str()).unwrap_or("unknown");
                let size = entry.map(|e| e.size).unwrap_or(0);
                let _ = write!(context, "  - {path} ({kind}, {size} bytes)\n");

                let is_source = [".py", ".js", ".java", ".rs"]
                    .iter()
                    .any(|ext| path.ends_with(ext));
                if is_source {
                    if let Some(content) = self.contents.get(*path) {
                        let preview: String = content.chars().take(300).collect();
                        let _ = write!(context, "    Preview: {preview}...\n");
                    }
                }
            }
            context.push('\n');
        }

        context
    }

    fn deployment_context(&self) -> String {
        let mut context = String::from("COMPLETE PROJECT CONTEXT FOR DEPLOYMENT:\n\n");

        let summary = &self.index.summary;
        let _ = write!(context, "Project Summary:\n");
        let _ = write!(context, "- Total files: {}\n", summary.total_files);
        let _ = write!(context, "- File types: {:?}\n", summary.file_types);
        let _ = write!(
            context,
            "- Modules: {:?}\n\n",
            self.index.modules.keys().collect::<Vec<_>>()
        );

        for fragment in ["01_requirements", "02_architecture", "03_code", "04_tests"] {
            let stage_files = self.index.files_matching(fragment);
            if stage_files.is_empty() {
                continue;
            }

            let stage_name = fragment
                .split_once('_')
                .map(|(_, name)| name.to_uppercase())
                .unwrap_or_default();
            let _ = write!(context, "{stage_name} FILES:\n");
            for path in stage_files.iter().take(3) {
                if let Some(content) = self.contents.get(*path) {
                    let preview: String = content.chars().take(200).collect();
                    let _ = write!(context, "  {path}:\n{preview}...\n\n");
                }
            }
        }

        context
    }

    fn general_context(&self) -> String {
        format!(
            "PROJECT STRUCTURE:\n{}",
            serde_json::to_string_pretty(&self.index).unwrap_or_default()
        )
    }
}

/// Group indexed files by their top-level module directory.
///
/// Files under `03_code/<module>/…` belong to `<module>`; everything else
/// groups by its first path component.
fn group_modules(index: &mut ProjectIndex) {
    let mut modules: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for path in index.files.keys() {
        let parts: Vec<&str> = path.split('/').collect();
        if parts.len() > 1 {
            let module = if parts[0] == "03_code" {
                parts[1]
            } else {
                parts[0]
            };
            modules
                .entry(module.to_string())
                .or_default()
                .push(path.clone());
        }
    }

    index.modules = modules;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn write_file(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.unwrap();
        }
        fs::write(path, content).await.unwrap();
    }

    #[tokio::test]
    async fn test_scan_indexes_files_and_types() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "01_requirements/spec.json", "{\"a\":1}").await;
        write_file(tmp.path(), "03_code/backend/main.py", "print('hi')").await;
        write_file(tmp.path(), "03_code/backend/notes.md", "# notes").await;

        let mut manager = RagManager::new(tmp.path());
        let index = manager.scan().await.unwrap();

        assert_eq!(index.summary.total_files, 3);
        assert_eq!(index.summary.file_types.get("python"), Some(&1));
        assert_eq!(index.summary.file_types.get("json"), Some(&1));
        assert!(index.summary.last_scan.is_some());
    }

    #[tokio::test]
    async fn test_scan_groups_code_files_by_module() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "03_code/backend/main.py", "x").await;
        write_file(tmp.path(), "03_code/frontend/app.js", "y").await;
        write_file(tmp.path(), "01_requirements/spec.json", "{}").await;

        let mut manager = RagManager::new(tmp.path());
        manager.scan().await.unwrap();

        let modules = &manager.index().modules;
        assert!(modules.contains_key("backend"));
        assert!(modules.contains_key("frontend"));
        assert!(modules.contains_key("01_requirements"));
        assert_eq!(modules["backend"], vec!["03_code/backend/main.py"]);
    }

    #[tokio::test]
    async fn test_scan_missing_directory_yields_empty_index() {
        let mut manager = RagManager::new("/nonexistent/forge-test-dir");
        let index = manager.scan().await.unwrap();
        assert!(index.is_empty());
        assert_eq!(index.summary.total_files, 0);
    }

    #[tokio::test]
    async fn test_requirements_context_includes_content() {
        let tmp = TempDir::new().unwrap();
        write_file(
            tmp.path(),
            "01_requirements/requirements_1.json",
            "{\"requirements\":[\"login\"]}",
        )
        .await;

        let mut manager = RagManager::new(tmp.path());
        manager.scan().await.unwrap();

        let context = manager.context_for(Stage::Requirements);
        assert!(context.starts_with("EXISTING REQUIREMENTS FILES:"));
        assert!(context.contains("login"));
    }

    #[tokio::test]
    async fn test_review_context_groups_by_module() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "03_code/backend/main.py", "print('hello')").await;

        let mut manager = RagManager::new(tmp.path());
        manager.scan().await.unwrap();

        let context = manager.context_for(Stage::Review);
        assert!(context.contains("MODULE: backend"));
        assert!(context.contains("03_code/backend/main.py"));
        assert!(context.contains("Preview: print('hello')"));
    }

    #[tokio::test]
    async fn test_save_index_writes_json() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "01_requirements/spec.json", "{}").await;

        let mut manager = RagManager::new(tmp.path());
        manager.scan().await.unwrap();
        let path = manager.save_index().await.unwrap();

        let written = fs::read_to_string(&path).await.unwrap();
        let parsed: ProjectIndex = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed.summary.total_files, 1);
    }

    #[tokio::test]
    async fn test_large_file_content_not_cached() {
        let tmp = TempDir::new().unwrap();
        let big = "x".repeat(20_000);
        write_file(tmp.path(), "01_requirements/big.txt", &big).await;

        let mut manager = RagManager::new(tmp.path());
        manager.scan().await.unwrap();

        // Indexed with a preview, but not offered as full context.
        assert_eq!(manager.index().summary.total_files, 1);
        let context = manager.context_for(Stage::Requirements);
        assert!(!context.contains(&big));
    }
}
