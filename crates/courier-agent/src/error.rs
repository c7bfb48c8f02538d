use thiserror::Error;

/// Errors from the model backend.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("no completion choices returned")]
    NoCompletion,

    #[error("no caption returned")]
    NoCaption,

    #[error("transcription failed: {0}")]
    Transcription(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
