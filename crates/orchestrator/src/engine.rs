//! Five-stage workflow engine over the shared project context.
//!
//! Stages run strictly in order: requirements, architecture, code, review,
//! deployment. Each stage records its entry in the persisted context before
//! the remote call, stores its result when finished, and persists again, so
//! an interrupted run resumes from the true last-completed stage. The code
//! stage is the only place with real parallelism: one generation task per
//! module, joined before the results are merged.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use forge_core::{
    ArchitectureSpec, CodebaseSpec, DeploymentSpec, ModuleSpec, ProjectContext, RequirementsSpec,
    ResultStatus, ReviewReport, Stage, GENERATION_STAGES,
};
use futures::future::join_all;
use gemini::TextProducer;
use rag::RagManager;
use serde::Serialize;
use tokio::fs;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::agent::AgentClient;
use crate::artifacts;
use crate::config::WorkflowConfig;
use crate::error::{OrchestratorError, Result};
use crate::prompts::AgentPrompts;
use crate::store::{ContextStore, FileContextStore};

/// Modules generated when the architecture result does not name any.
const DEFAULT_MODULES: [&str; 3] = ["backend", "frontend", "database"];
const LOGS_DIR: &str = "logs";

/// Completion flag for one generation stage.
#[derive(Debug, Clone, Serialize)]
pub struct StageCompletion {
    pub stage: Stage,
    pub complete: bool,
}

/// Point-in-time progress report for a project run.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowStatus {
    pub current_stage: Stage,
    pub stages: Vec<StageCompletion>,
    pub completed: usize,
    pub total: usize,
    pub percentage: f64,
    pub project_dir: PathBuf,
    pub last_updated: DateTime<Utc>,
}

impl WorkflowStatus {
    pub fn progress(&self) -> String {
        format!("{}/{}", self.completed, self.total)
    }
}

/// Drives a project through the five generation stages.
pub struct WorkflowEngine {
    project_dir: PathBuf,
    context: ProjectContext,
    agent: Arc<AgentClient>,
    store: Box<dyn ContextStore>,
    rag: RagManager,
    run_id: Uuid,
}

impl WorkflowEngine {
    /// Open a project under the configured projects directory, loading the
    /// persisted context if one exists.
    pub async fn open(
        project_name: &str,
        config: &WorkflowConfig,
        producer: Arc<dyn TextProducer>,
    ) -> Result<Self> {
        let project_dir = config.projects_dir.join(project_name.trim());
        let store = Box::new(FileContextStore::new(&project_dir));
        Self::with_store(project_name, config, producer, store, project_dir).await
    }

    /// Open a project with an explicit store and directory.
    pub async fn with_store(
        project_name: &str,
        config: &WorkflowConfig,
        producer: Arc<dyn TextProducer>,
        store: Box<dyn ContextStore>,
        project_dir: PathBuf,
    ) -> Result<Self> {
        create_project_structure(&project_dir).await?;

        let context = match store.load().await? {
            Some(existing) => {
                info!(
                    project = %existing.project_name,
                    stage = existing.current_stage.as_str(),
                    "Loaded existing context"
                );
                existing
            }
            None => ProjectContext::new(project_name)?,
        };

        let agent = Arc::new(AgentClient::new(
            producer,
            config.generation.clone(),
            config.retry.clone(),
        ));
        let rag = RagManager::new(&project_dir);

        Ok(Self {
            project_dir,
            context,
            agent,
            store,
            rag,
            run_id: Uuid::new_v4(),
        })
    }

    pub fn context(&self) -> &ProjectContext {
        &self.context
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn status(&self) -> WorkflowStatus {
        let stages: Vec<StageCompletion> = GENERATION_STAGES
            .iter()
            .map(|s| StageCompletion {
                stage: *s,
                complete: self.context.stage_complete(*s),
            })
            .collect();

        let completed = self.context.completed_stage_count();
        let total = GENERATION_STAGES.len();

        WorkflowStatus {
            current_stage: self.context.current_stage,
            stages,
            completed,
            total,
            percentage: (completed as f64 / total as f64) * 100.0,
            project_dir: self.project_dir.clone(),
            last_updated: Utc::now(),
        }
    }

    /// Entry point for a fresh project. Behaviorally an alias of
    /// [`resume`](Self::resume): a run that finds prior progress simply
    /// continues it.
    pub async fn run(&mut self, user_input: &str) -> Result<&ProjectContext> {
        info!(
            run_id = %self.run_id,
            project = %self.context.project_name,
            "Starting full workflow"
        );

        if self.context.current_stage != Stage::NotStarted {
            info!(
                stage = self.context.current_stage.as_str(),
                "Workflow already in progress, resuming"
            );
        }

        self.resume(Some(user_input)).await
    }

    /// Run every stage whose result is still absent, in order.
    ///
    /// `user_input` is required only when the requirements stage has never
    /// produced a result; all later stages run from fixed templates.
    pub async fn resume(&mut self, user_input: Option<&str>) -> Result<&ProjectContext> {
        let status = self.status();
        info!(
            run_id = %self.run_id,
            stage = self.context.current_stage.as_str(),
            progress = %status.progress(),
            "Resuming workflow"
        );

        if self.context.requirements.is_none() {
            let input = user_input.ok_or(OrchestratorError::MissingInput)?;
            self.stage_requirements(input).await?;
        }

        if self.context.architecture.is_none() {
            self.stage_architecture().await?;
        }

        if self.context.codebase.is_none() {
            self.stage_code().await?;
        }

        if self.context.test_results.is_none() {
            self.stage_review().await?;
        }

        if self.context.deployment.is_none() {
            self.stage_deployment().await?;
        }

        self.context.current_stage = Stage::Completed;
        self.store.save(&self.context).await?;

        self.rag.scan().await?;
        self.rag.save_index().await?;

        info!(
            run_id = %self.run_id,
            project_dir = %self.project_dir.display(),
            "Workflow completed"
        );
        Ok(&self.context)
    }

    /// Mark the stage as entered, persist, and gather its reference context.
    ///
    /// Persisting before the remote call means a crash mid-call leaves the
    /// stored context pointing at the stage that was being attempted.
    async fn enter_stage(&mut self, stage: Stage) -> Result<String> {
        info!(run_id = %self.run_id, stage = stage.as_str(), "Entering stage");

        self.context.current_stage = stage;
        self.store.save(&self.context).await?;

        self.rag.scan().await?;
        Ok(self.rag.context_for(stage))
    }

    fn stage_dir(&self, stage: Stage) -> PathBuf {
        self.project_dir.join(stage.output_dir().unwrap_or(LOGS_DIR))
    }

    /// Persist the raw stage result as a timestamped JSON artifact.
    async fn save_stage_output<T: Serialize>(&self, stage: Stage, result: &T) -> Result<PathBuf> {
        let dir = self.stage_dir(stage);
        fs::create_dir_all(&dir).await?;

        let filename = format!(
            "{}_{}.json",
            stage.as_str(),
            Utc::now().format("%Y%m%d_%H%M%S")
        );
        let path = dir.join(filename);
        fs::write(&path, serde_json::to_string_pretty(result)?).await?;

        info!(path = %path.display(), "Saved stage output");
        Ok(path)
    }

    async fn stage_requirements(&mut self, user_input: &str) -> Result<()> {
        let reference = self.enter_stage(Stage::Requirements).await?;
        let instruction = AgentPrompts::requirements_instruction(user_input);

        let result: RequirementsSpec = self
            .agent
            .invoke(&instruction, &self.context, &reference)
            .await;

        self.save_stage_output(Stage::Requirements, &result).await?;
        self.context.requirements = Some(result);
        self.store.save(&self.context).await?;
        Ok(())
    }

    async fn stage_architecture(&mut self) -> Result<()> {
        let reference = self.enter_stage(Stage::Architecture).await?;
        let instruction = AgentPrompts::architecture_instruction();

        let result: ArchitectureSpec = self
            .agent
            .invoke(&instruction, &self.context, &reference)
            .await;

        self.save_stage_output(Stage::Architecture, &result).await?;
        self.context.architecture = Some(result);
        self.store.save(&self.context).await?;
        Ok(())
    }

    /// Code generation: fan out one developer invocation per module and
    /// join on all of them before merging.
    async fn stage_code(&mut self) -> Result<()> {
        let reference = self.enter_stage(Stage::Code).await?;

        let modules = self
            .context
            .architecture
            .as_ref()
            .map(|a| a.modules.clone())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MODULES.iter().map(|m| m.to_string()).collect());

        info!(run_id = %self.run_id, modules = ?modules, "Fanning out module generation");

        let tasks = modules.iter().map(|module| {
            let agent = Arc::clone(&self.agent);
            let context = self.context.clone();
            let reference = reference.clone();
            let instruction = AgentPrompts::module_instruction(module);
            let name = module.clone();

            let handle = tokio::spawn(async move {
                agent
                    .invoke::<ModuleSpec>(&instruction, &context, &reference)
                    .await
            });

            async move { (name, handle.await) }
        });

        let mut results = BTreeMap::new();
        for (module, outcome) in join_all(tasks).await {
            match outcome {
                Ok(spec) => {
                    results.insert(module, spec);
                }
                Err(e) => {
                    // A panicked task fails that module only; siblings keep
                    // their real output.
                    error!(module = module.as_str(), error = %e, "Module generation task failed");
                    results.insert(module, ModuleSpec::parse_failed());
                }
            }
        }

        let combined = CodebaseSpec::merge(results);
        if combined.status == ResultStatus::PartialFailure {
            warn!(run_id = %self.run_id, "Code stage finished with partial failures");
        }

        self.save_stage_output(Stage::Code, &combined).await?;

        let code_dir = self.stage_dir(Stage::Code);
        for (module_name, module_spec) in &combined.modules {
            let module_dir = code_dir.join(artifacts::sanitize_component(module_name));
            artifacts::materialize(&module_dir, &module_spec.code_files).await;
        }

        self.context.codebase = Some(combined);

        // Re-index so later stages see the files written above.
        self.rag.scan().await?;
        self.rag.save_index().await?;

        self.store.save(&self.context).await?;
        Ok(())
    }

    async fn stage_review(&mut self) -> Result<()> {
        let reference = self.enter_stage(Stage::Review).await?;
        let instruction = AgentPrompts::review_instruction();

        let result: ReviewReport = self
            .agent
            .invoke(&instruction, &self.context, &reference)
            .await;

        self.save_stage_output(Stage::Review, &result).await?;

        if !result.test_files.is_empty() {
            artifacts::materialize(&self.stage_dir(Stage::Review), &result.test_files).await;
        }

        self.context.test_results = Some(result);
        self.store.save(&self.context).await?;
        Ok(())
    }

    async fn stage_deployment(&mut self) -> Result<()> {
        let reference = self.enter_stage(Stage::Deployment).await?;
        let instruction = AgentPrompts::deployment_instruction();

        let result: DeploymentSpec = self
            .agent
            .invoke(&instruction, &self.context, &reference)
            .await;

        self.save_stage_output(Stage::Deployment, &result).await?;

        let deploy_dir = self.stage_dir(Stage::Deployment);
        for (folder, files) in [
            ("docker", &result.docker_files),
            ("ci-cd", &result.ci_cd_config),
            ("kubernetes", &result.k8s_manifests),
        ] {
            artifacts::materialize(&deploy_dir.join(folder), files).await;
        }

        self.context.deployment = Some(result);
        self.store.save(&self.context).await?;
        Ok(())
    }
}

/// Create the numbered stage directories and the logs directory.
async fn create_project_structure(project_dir: &Path) -> Result<()> {
    for stage in GENERATION_STAGES {
        if let Some(dir) = stage.output_dir() {
            fs::create_dir_all(project_dir.join(dir)).await?;
        }
    }
    fs::create_dir_all(project_dir.join(LOGS_DIR)).await?;
    Ok(())
}
