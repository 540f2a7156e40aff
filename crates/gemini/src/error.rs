use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Gemini API error: {message} (status {status_code:?})")]
    Api {
        message: String,
        status_code: Option<u16>,
    },

    #[error("Empty response: no candidate text returned")]
    EmptyResponse,
}

pub type Result<T> = std::result::Result<T, GeminiError>;
