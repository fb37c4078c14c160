use std::path::PathBuf;
use thiserror::Error;

/// Fatal failures only. A single tool invocation exiting non-zero is not an
/// `Error`; it is recorded as a failed build result and the batch continues.
#[derive(Debug, Error)]
pub enum Error {
    /// The external binary could not be located at all. This aborts the
    /// remaining batch, unlike one invocation failing.
    #[error("`{tool}` not found; is it installed and on PATH?")]
    ToolNotFound { tool: String },

    #[error("failed to read query template {path}: {source}")]
    TemplateRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write manifest {path}: {source}")]
    ManifestWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize manifest: {0}")]
    ManifestSerialize(#[from] serde_json::Error),

    #[error("invalid filter pattern: {0}")]
    BadFilter(#[from] glob::PatternError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
