use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The requirements stage was reached with no prior result and no user
    /// input. The one case where the workflow halts instead of degrading.
    #[error("User input required for the requirements stage")]
    MissingInput,

    #[error("Validation error: {0}")]
    Core(#[from] forge_core::CoreError),

    #[error("Reference context error: {0}")]
    Rag(#[from] rag::RagError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
