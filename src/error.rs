use std::path::PathBuf;
use thiserror::Error;

/// Fatal pipeline failures. Recoverable conditions (a missing dependency file,
/// an absent output directory) are logged and skipped instead of surfacing here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid scan root '{path}': {reason}")]
    InvalidSourceRoot { path: PathBuf, reason: String },

    #[error("failed to parse schema override '{path}': {reason}")]
    SchemaParse { path: PathBuf, reason: String },

    #[error("instrumentation failed for '{directory}': {reason}")]
    Instrument { directory: PathBuf, reason: String },
}

impl PipelineError {
    pub fn invalid_root(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        PipelineError::InvalidSourceRoot {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn schema_parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        PipelineError::SchemaParse {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
