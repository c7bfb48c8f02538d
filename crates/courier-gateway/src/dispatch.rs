//! Message dispatcher — runs as a detached task after the webhook has been
//! acknowledged. Classifies the inbound message and drives the media/AI
//! pipeline for its type. Every failure here is logged and contained; nothing
//! can reach the already-completed HTTP response.

use std::sync::Arc;

use tracing::{debug, warn};

use courier_agent::BridgeError;
use courier_whatsapp::envelope::{InboundMessage, MediaReference, MessageKind};
use courier_whatsapp::{FetchedMedia, MediaKind, WhatsAppError};

use crate::app::AppState;

/// A failure at any step of the per-message pipeline. The message is dropped;
/// no partial replies are sent.
#[derive(Debug, thiserror::Error)]
enum DispatchError {
    #[error(transparent)]
    Media(#[from] WhatsAppError),
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// Process one inbound message end to end.
pub async fn process_message(state: Arc<AppState>, msg: InboundMessage) {
    // The send API addresses recipients numerically; anything else is
    // malformed input, dropped without ceremony.
    let Some(recipient) = parse_recipient(&msg.from) else {
        warn!(from = %msg.from, message_id = %msg.id, "non-numeric sender id, dropping");
        return;
    };

    let message_id = msg.id;
    let reply = match msg.kind {
        MessageKind::Text { text } => {
            debug!(from = recipient, "text message");
            state.bridge.complete(&text.body).await.map_err(Into::into)
        }
        MessageKind::Audio { audio } => process_audio(&state, &audio).await,
        MessageKind::Image { image } => process_image(&state, &image).await,
        MessageKind::Unsupported => {
            debug!(message_id = %message_id, "unsupported message type, ignoring");
            return;
        }
    };

    let reply = match reply {
        Ok(text) => text,
        Err(e) => {
            warn!(message_id = %message_id, error = %e, "message processing failed");
            return;
        }
    };

    // The webhook was acknowledged long ago — a failed send is logged, never
    // re-raised.
    if let Err(e) = state.sender.send_text(recipient, &reply).await {
        warn!(to = recipient, message_id = %message_id, error = %e, "reply send failed");
    }
}

/// audio: fetch -> transcribe -> complete.
async fn process_audio(
    state: &AppState,
    audio: &MediaReference,
) -> Result<String, DispatchError> {
    let fetched = state
        .media
        .fetch(&audio.id, &audio.mime_type, MediaKind::Audio)
        .await?;

    let FetchedMedia::Audio { path } = fetched else {
        // fetch() honours the requested kind; this arm is unreachable.
        return Err(WhatsAppError::UnsupportedMedia(audio.mime_type.clone()).into());
    };

    let transcript = state.bridge.transcribe(&path).await?;
    debug!(chars = transcript.len(), "audio transcribed");
    Ok(state.bridge.complete(&transcript).await?)
}

/// image: fetch -> caption (sender's caption steers the prompt).
async fn process_image(
    state: &AppState,
    image: &MediaReference,
) -> Result<String, DispatchError> {
    let fetched = state
        .media
        .fetch(&image.id, &image.mime_type, MediaKind::Image)
        .await?;

    let FetchedMedia::Image { base64 } = fetched else {
        return Err(WhatsAppError::UnsupportedMedia(image.mime_type.clone()).into());
    };

    Ok(state
        .bridge
        .caption(&base64, image.caption.as_deref())
        .await?)
}

/// The send API wants a bare numeric id. `u64::from_str` tolerates a leading
/// `+`, so gate on digits-only first.
fn parse_recipient(from: &str) -> Option<u64> {
    if from.is_empty() || !from.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    from.parse().ok()
}
