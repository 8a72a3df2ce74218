use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// `detect` was called before both the model and the labels finished loading.
    #[error("detector not ready (model loaded: {model_loaded}, classes loaded: {classes_loaded})")]
    NotReady {
        model_loaded: bool,
        classes_loaded: bool,
    },

    #[error("HTTP error! status: {status} ({url})")]
    HttpStatus { url: String, status: u16 },

    #[error("failed to fetch {url}: {message}")]
    Transport { url: String, message: String },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed label mapping: {0}")]
    Labels(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("failed to load model: {0}")]
    Model(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("output {index} ({role}) requested but the model produced {available} outputs")]
    MissingOutput {
        role: &'static str,
        index: usize,
        available: usize,
    },

    #[error("failed to prepare input: {0}")]
    Preprocess(String),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),
}
