//! Outbound message delivery via the Cloud API `/messages` endpoint.

use serde_json::{json, Value};
use tracing::debug;

use courier_core::config::WhatsAppConfig;

use crate::error::WhatsAppError;

/// Sends text replies from the configured phone number.
pub struct ReplySender {
    client: reqwest::Client,
    access_token: String,
    /// Fully qualified `{graph}/{phone_number_id}/messages` URL.
    send_url: String,
}

impl ReplySender {
    pub fn new(cfg: &WhatsAppConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token: cfg.access_token.clone(),
            send_url: format!("{}/{}/messages", cfg.graph_base_url, cfg.phone_number_id),
        }
    }

    /// Deliver `body` to the recipient phone number.
    ///
    /// Callers on the webhook path log failures instead of propagating them:
    /// the HTTP acknowledgment has already gone out by the time this runs.
    pub async fn send_text(&self, to: u64, body: &str) -> Result<(), WhatsAppError> {
        let payload = text_payload(to, body);

        debug!(to, "sending WhatsApp reply");

        let resp = self
            .client
            .post(&self.send_url)
            .bearer_auth(&self.access_token)
            .json(&payload)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(WhatsAppError::Api { status, message });
        }

        debug!(to, "WhatsApp reply delivered");
        Ok(())
    }
}

/// Fixed Cloud API text envelope.
fn text_payload(to: u64, body: &str) -> Value {
    json!({
        "messaging_product": "whatsapp",
        "to": to,
        "type": "text",
        "text": {
            "preview_url": false,
            "body": body,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_matches_cloud_api_shape() {
        let payload = text_payload(15551234, "hi there");
        assert_eq!(payload["messaging_product"], "whatsapp");
        assert_eq!(payload["to"], 15551234);
        assert_eq!(payload["type"], "text");
        assert_eq!(payload["text"]["body"], "hi there");
        assert_eq!(payload["text"]["preview_url"], false);
    }

    #[test]
    fn send_url_includes_phone_number_id() {
        let cfg = WhatsAppConfig {
            phone_number_id: "777".into(),
            ..Default::default()
        };
        let sender = ReplySender::new(&cfg);
        assert_eq!(
            sender.send_url,
            "https://graph.facebook.com/v18.0/777/messages"
        );
    }
}
