use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while generating, publishing or browsing images.
#[derive(Debug, Error)]
pub enum StudioError {
    #[error("Candle error: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("Hub download error: {0}")]
    Hub(#[from] hf_hub::api::sync::ApiError),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("Unknown model identifier: {0}")]
    UnknownModel(String),

    #[error("Invalid generation parameters: {0}")]
    InvalidParams(String),

    #[error("Malformed metadata record {}: {source}", .path.display())]
    MalformedRecord {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Failed to publish output file: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("Directory scan error: {0}")]
    Walk(#[from] walkdir::Error),
}

pub type Result<T> = std::result::Result<T, StudioError>;
