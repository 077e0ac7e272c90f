//! Errors surfaced by the demo commands.

use std::path::PathBuf;

use dichroma_engine::ProcessorError;

#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    #[error("unknown vision mode '{0}'")]
    UnknownMode(String),

    #[error("failed to read catalog {}: {source}", path.display())]
    Catalog {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid catalog: {0}")]
    CatalogFormat(#[from] serde_json::Error),

    #[error("reference image for '{0}' does not match its dimensions")]
    InvalidImage(String),

    #[error("failed to encode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Processor(#[from] ProcessorError),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
