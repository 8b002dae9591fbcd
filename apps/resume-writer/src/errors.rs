use thiserror::Error;

use crate::llm_client::LlmError;

/// Application-level error type.
///
/// Never reaches the process exit code: the pipeline logs it and emits the
/// empty response instead.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Logs the error at the level matching its kind.
    pub fn log(&self) {
        match self {
            AppError::Llm(e) => tracing::warn!("Generation unavailable: {e}"),
            AppError::Io(e) => tracing::error!("I/O error: {e}"),
            AppError::Internal(e) => tracing::error!("Internal error: {e:?}"),
        }
    }
}
