use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use forge_core::{ProjectContext, GENERATION_STAGES};
use gemini::{GeminiClient, TextProducer};
use orchestrator::{ContextStore, FileContextStore, RetryPolicy, WorkflowConfig, WorkflowEngine};
use rag::RagManager;
use serde::Deserialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const CONFIG_FILE: &str = "forge.toml";
const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Parser)]
#[command(name = "forge")]
#[command(about = "Staged AI project generation", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the configuration file.
    #[arg(long, default_value = CONFIG_FILE)]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full workflow for a project, resuming prior progress.
    Run {
        project: String,

        /// The project request driving the requirements stage.
        #[arg(short, long)]
        request: Option<String>,

        /// Read the project request from a file instead.
        #[arg(long, conflicts_with = "request")]
        request_file: Option<PathBuf>,
    },
    /// Resume an interrupted workflow from its last completed stage.
    Resume {
        project: String,

        /// Required only if the requirements stage has never run.
        #[arg(short, long)]
        request: Option<String>,
    },
    /// Show workflow progress for a project.
    Status { project: String },
    /// Scan a project's files and show the reference index summary.
    Scan { project: String },
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ForgeSettings {
    gemini: GeminiSettings,
    workflow: WorkflowSettings,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct GeminiSettings {
    api_key: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct WorkflowSettings {
    projects_dir: PathBuf,
    max_attempts: u32,
    base_delay_ms: u64,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        let defaults = WorkflowConfig::default();
        Self {
            projects_dir: defaults.projects_dir,
            max_attempts: defaults.retry.max_attempts,
            base_delay_ms: defaults.retry.base_delay.as_millis() as u64,
        }
    }
}

impl ForgeSettings {
    async fn load(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(settings)
    }

    fn workflow_config(&self) -> WorkflowConfig {
        WorkflowConfig {
            projects_dir: self.workflow.projects_dir.clone(),
            retry: RetryPolicy {
                max_attempts: self.workflow.max_attempts,
                base_delay: Duration::from_millis(self.workflow.base_delay_ms),
            },
            ..Default::default()
        }
    }

    fn producer(&self) -> Result<Arc<dyn TextProducer>> {
        let api_key = self
            .gemini
            .api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok());

        let Some(api_key) = api_key else {
            bail!("No API key configured. Set {API_KEY_ENV} or gemini.api_key in {CONFIG_FILE}.");
        };

        let mut client = GeminiClient::new(api_key);
        if let Some(model) = &self.gemini.model {
            client = client.with_model(model);
        }
        if let Some(base_url) = &self.gemini.base_url {
            client = client.with_base_url(base_url);
        }

        Ok(Arc::new(client))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let settings = ForgeSettings::load(&cli.config).await?;
    tracing::debug!(config = %cli.config.display(), "Loaded settings");

    match cli.command {
        Commands::Run {
            project,
            request,
            request_file,
        } => {
            let request = resolve_request(request, request_file).await?;
            let mut engine = open_engine(&project, &settings).await?;
            engine
                .run(&request)
                .await
                .context("Workflow failed; progress has been saved, resume later")?;
            print_status(&project, &settings).await?;
            println!("Project files saved in: {}", engine.project_dir().display());
            Ok(())
        }
        Commands::Resume { project, request } => {
            let mut engine = open_engine(&project, &settings).await?;
            engine
                .resume(request.as_deref())
                .await
                .context("Workflow failed; progress has been saved, resume later")?;
            print_status(&project, &settings).await?;
            println!("Project files saved in: {}", engine.project_dir().display());
            Ok(())
        }
        Commands::Status { project } => print_status(&project, &settings).await,
        Commands::Scan { project } => scan(&project, &settings).await,
    }
}

async fn resolve_request(
    request: Option<String>,
    request_file: Option<PathBuf>,
) -> Result<String> {
    match (request, request_file) {
        (Some(request), _) => Ok(request),
        (None, Some(path)) => tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read request file {}", path.display())),
        (None, None) => bail!("Provide the project request via --request or --request-file"),
    }
}

async fn open_engine(project: &str, settings: &ForgeSettings) -> Result<WorkflowEngine> {
    let producer = settings.producer()?;
    let config = settings.workflow_config();
    let engine = WorkflowEngine::open(project, &config, producer)
        .await
        .with_context(|| format!("Failed to open project '{project}'"))?;
    Ok(engine)
}

async fn load_context(project: &str, settings: &ForgeSettings) -> Result<Option<ProjectContext>> {
    let project_dir = settings.workflow.projects_dir.join(project);
    let store = FileContextStore::new(&project_dir);
    Ok(store.load().await?)
}

async fn print_status(project: &str, settings: &ForgeSettings) -> Result<()> {
    let Some(context) = load_context(project, settings).await? else {
        println!("No saved context for '{project}'.");
        println!("Run 'forge run {project} --request \"...\"' to start.");
        return Ok(());
    };

    let completed = context.completed_stage_count();
    let total = GENERATION_STAGES.len();
    let percentage = (completed as f64 / total as f64) * 100.0;

    println!();
    println!("Project: {}", context.project_name);
    println!("Stage:   {}", context.current_stage.as_str());
    println!("Progress: {completed}/{total} ({percentage:.1}%)");
    println!("Created: {}", context.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!();

    for stage in GENERATION_STAGES {
        let icon = if context.stage_complete(stage) {
            "●"
        } else {
            "○"
        };
        println!("  {} {}", icon, stage.as_str());
    }
    println!();

    Ok(())
}

async fn scan(project: &str, settings: &ForgeSettings) -> Result<()> {
    let project_dir = settings.workflow.projects_dir.join(project);
    let mut manager = RagManager::new(&project_dir);
    let index = manager.scan().await?;

    println!();
    println!("Project files: {}", index.summary.total_files);
    println!("Directories:   {}", index.directories.len());
    println!();

    if !index.summary.file_types.is_empty() {
        println!("File types:");
        for (kind, count) in &index.summary.file_types {
            println!("  {kind}: {count}");
        }
        println!();
    }

    if !index.modules.is_empty() {
        println!("Modules:");
        for (module, files) in &index.modules {
            println!("  {module}: {} files", files.len());
        }
        println!();
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "forge=info,orchestrator=info,rag=info,gemini=info".into()),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = ForgeSettings::default();
        assert_eq!(settings.workflow.projects_dir, PathBuf::from("projects"));
        assert_eq!(settings.workflow.max_attempts, 3);
        assert!(settings.gemini.api_key.is_none());
    }

    #[test]
    fn test_settings_parse_from_toml() {
        let settings: ForgeSettings = toml::from_str(
            r#"
            [gemini]
            api_key = "secret"
            model = "gemini-2.5-pro"

            [workflow]
            projects_dir = "generated"
            max_attempts = 5
            "#,
        )
        .unwrap();

        assert_eq!(settings.gemini.api_key.as_deref(), Some("secret"));
        assert_eq!(settings.gemini.model.as_deref(), Some("gemini-2.5-pro"));
        assert_eq!(settings.workflow.projects_dir, PathBuf::from("generated"));
        assert_eq!(settings.workflow.max_attempts, 5);
        // Unspecified keys keep their defaults.
        assert_eq!(settings.workflow.base_delay_ms, 1000);
    }

    #[test]
    fn test_workflow_config_from_settings() {
        let settings: ForgeSettings = toml::from_str(
            r#"
            [workflow]
            max_attempts = 2
            base_delay_ms = 250
            "#,
        )
        .unwrap();

        let config = settings.workflow_config();
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.base_delay, Duration::from_millis(250));
    }
}
