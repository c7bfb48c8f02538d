//! Inbound media handling: resolve an opaque media id to a download URL via
//! the Graph metadata endpoint, pull the binary, and hand it to the
//! dispatcher either base64-encoded (images) or as a transient file (audio).
//!
//! Files are UUID-named inside a single configured directory so concurrent
//! deliveries never collide on a shared path.

use std::path::PathBuf;

use base64::Engine;
use serde::Deserialize;
use tracing::{debug, warn};

use courier_core::config::WhatsAppConfig;

use crate::error::WhatsAppError;

/// Which branch of the fetch pipeline to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Audio,
}

/// Result of a media fetch — exactly one representation, owned by the
/// dispatcher for the duration of one message and dropped after.
#[derive(Debug)]
pub enum FetchedMedia {
    /// Base64-encoded image bytes, ready for a vision data URL.
    Image { base64: String },
    /// Path to the downloaded audio clip.
    Audio { path: PathBuf },
}

/// Graph API media client.
pub struct MediaClient {
    client: reqwest::Client,
    access_token: String,
    graph_base_url: String,
    media_dir: PathBuf,
}

#[derive(Deserialize)]
struct MediaMetadata {
    url: Option<String>,
}

impl MediaClient {
    pub fn new(cfg: &WhatsAppConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token: cfg.access_token.clone(),
            graph_base_url: cfg.graph_base_url.clone(),
            media_dir: PathBuf::from(&cfg.media_dir),
        }
    }

    /// Resolve a media id to its short-lived download URL.
    ///
    /// The metadata endpoint answers `{ "url": "...", ... }`; a response
    /// without a `url` field maps to [`WhatsAppError::MediaNotFound`].
    pub async fn resolve_url(&self, media_id: &str) -> Result<String, WhatsAppError> {
        let url = format!("{}/{}/", self.graph_base_url, media_id);

        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let message = resp.text().await.unwrap_or_default();
            warn!(media_id, status, body = %message, "media metadata request failed");
            return Err(WhatsAppError::Api { status, message });
        }

        let meta: MediaMetadata = resp.json().await?;
        meta.url.ok_or_else(|| WhatsAppError::MediaNotFound {
            id: media_id.to_string(),
        })
    }

    /// Resolve and download one media object.
    ///
    /// Images come back base64-encoded (and the encoded text is persisted
    /// next to the audio files for inspection tooling); audio is written to a
    /// transient file whose extension derives from the MIME type.
    pub async fn fetch(
        &self,
        media_id: &str,
        mime_type: &str,
        kind: MediaKind,
    ) -> Result<FetchedMedia, WhatsAppError> {
        let download_url = self.resolve_url(media_id).await?;
        let bytes = self.download(&download_url).await?;
        debug!(media_id, bytes = bytes.len(), ?kind, "media downloaded");

        tokio::fs::create_dir_all(&self.media_dir).await?;

        match kind {
            MediaKind::Image => {
                let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
                let path = self.media_dir.join(format!("{}.b64", uuid::Uuid::new_v4()));
                tokio::fs::write(&path, &encoded).await?;
                Ok(FetchedMedia::Image { base64: encoded })
            }
            MediaKind::Audio => {
                let ext = file_extension(mime_type)?;
                let path = self
                    .media_dir
                    .join(format!("{}.{ext}", uuid::Uuid::new_v4()));
                tokio::fs::write(&path, &bytes).await?;
                Ok(FetchedMedia::Audio { path })
            }
        }
    }

    /// Download the binary body from a resolved URL. Buffered whole — the
    /// platform caps media sizes well below anything worth streaming.
    async fn download(&self, download_url: &str) -> Result<Vec<u8>, WhatsAppError> {
        let resp = self
            .client
            .get(download_url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let message = resp.text().await.unwrap_or_default();
            warn!(status, "media download failed");
            return Err(WhatsAppError::Api { status, message });
        }

        Ok(resp.bytes().await?.to_vec())
    }
}

/// Derive a file extension from a MIME type: second segment, with any
/// parameter suffix stripped (`audio/ogg; codecs=opus` -> `ogg`).
fn file_extension(mime_type: &str) -> Result<&str, WhatsAppError> {
    mime_type
        .split('/')
        .nth(1)
        .and_then(|s| s.split(';').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| WhatsAppError::UnsupportedMedia(mime_type.to_string()))
}
