use thiserror::Error;

/// Errors from the WhatsApp Cloud API client (media fetch + outbound send).
#[derive(Debug, Error)]
pub enum WhatsAppError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Graph API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("no download URL for media {id}")]
    MediaNotFound { id: String },

    #[error("unsupported media: {0}")]
    UnsupportedMedia(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
