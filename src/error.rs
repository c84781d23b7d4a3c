use std::path::PathBuf;

use thiserror::Error;

/// Why a single topic did not produce a persisted record.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("service returned {status}: {message}")]
    Service { status: u16, message: String },

    #[error("service returned no completion content")]
    EmptyResponse,

    #[error("completion is missing a required field: {0}")]
    MalformedResponse(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<reqwest::Error> for GenerateError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => GenerateError::Transport(format!("HTTP {}: {}", status.as_u16(), e)),
            None => GenerateError::Transport(e.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode collection")]
    Encode(#[from] serde_json::Error),

    #[error("collection file `{}` is not a valid article list", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
