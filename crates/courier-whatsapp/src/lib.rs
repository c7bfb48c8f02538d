pub mod envelope;
pub mod error;
pub mod media;
pub mod send;

pub use envelope::{InboundMessage, MediaReference, MessageKind, WebhookEnvelope};
pub use error::WhatsAppError;
pub use media::{FetchedMedia, MediaClient, MediaKind};
pub use send::ReplySender;
