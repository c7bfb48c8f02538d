//! Webhook ingress — GET /api/webhook (subscription handshake) and
//! POST /api/webhook (event delivery).
//!
//! POST bodies are authenticated with HMAC-SHA256 over the exact raw bytes
//! received, before any JSON parsing. Verifying a parsed-then-reserialized
//! body would not match what the platform signed.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;
use tracing::{info, warn};

use courier_whatsapp::WebhookEnvelope;

use crate::app::AppState;
use crate::dispatch;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Query parameters of the platform's GET handshake.
#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// GET /api/webhook
///
/// Subscription handshake: echo the challenge when the mode is "subscribe"
/// and the token matches. 400 without a challenge, 403 on mismatch, 500 when
/// no verify token is configured.
pub async fn verify_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VerifyParams>,
) -> Response {
    // Both secrets are required on both webhook routes, even though the
    // handshake only consumes the verify token.
    let (Some(expected), Some(_)) = (
        state.config.whatsapp.verify_token.as_deref(),
        state.config.whatsapp.app_secret.as_deref(),
    ) else {
        warn!("webhook handshake received but verify_token/app_secret not configured");
        return (StatusCode::INTERNAL_SERVER_ERROR, "Server configuration error").into_response();
    };

    match verify_subscription(
        params.mode.as_deref(),
        params.verify_token.as_deref(),
        params.challenge.as_deref(),
        expected,
    ) {
        Ok(challenge) => {
            info!("webhook subscription verified");
            (StatusCode::OK, challenge).into_response()
        }
        Err(status) => status.into_response(),
    }
}

/// POST /api/webhook
///
/// Validates the signature over the raw body, parses the envelope, then
/// acknowledges immediately — message processing continues in a detached
/// task with its own error boundary.
pub async fn receive_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(app_secret) = state.config.whatsapp.app_secret.as_deref() else {
        warn!("webhook received but no app_secret configured");
        return (StatusCode::INTERNAL_SERVER_ERROR, "Server configuration error").into_response();
    };

    let Some(signature) = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) else {
        warn!("webhook rejected: signature not provided");
        return (StatusCode::UNAUTHORIZED, "Signature not provided").into_response();
    };

    if !verify_signature(&body, signature, app_secret) {
        warn!("webhook rejected: invalid signature");
        return (StatusCode::UNAUTHORIZED, "Invalid signature").into_response();
    }

    let envelope: WebhookEnvelope = match serde_json::from_slice(&body) {
        Ok(env) => env,
        Err(e) => {
            warn!(error = %e, "webhook body is not valid JSON");
            return (StatusCode::BAD_REQUEST, "Invalid JSON").into_response();
        }
    };

    // Absent at any nesting level means nothing to do — still a 200.
    if let Some(message) = envelope.into_first_message() {
        info!(message_id = %message.id, "webhook message accepted");
        tokio::spawn(dispatch::process_message(state, message));
    }

    StatusCode::OK.into_response()
}

/// Check `sha256=<hex>` in X-Hub-Signature-256 against HMAC-SHA256 of the
/// raw body. `Mac::verify_slice` compares without early exit.
pub fn verify_signature(body: &[u8], signature_header: &str, app_secret: &str) -> bool {
    let Some(sig_hex) = signature_header.strip_prefix("sha256=") else {
        warn!("malformed signature header (missing sha256= prefix)");
        return false;
    };

    let Ok(expected) = hex::decode(sig_hex) else {
        warn!("signature header is not valid hex");
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(app_secret.as_bytes()) else {
        warn!("failed to create HMAC");
        return false;
    };

    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Handshake outcome: the challenge to echo, or the status to answer with.
fn verify_subscription(
    mode: Option<&str>,
    token: Option<&str>,
    challenge: Option<&str>,
    expected_token: &str,
) -> Result<String, StatusCode> {
    let challenge = challenge.ok_or(StatusCode::BAD_REQUEST)?;

    if mode == Some("subscribe") && token == Some(expected_token) {
        Ok(challenge.to_string())
    } else {
        Err(StatusCode::FORBIDDEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::config::{CourierConfig, WhatsAppConfig};

    fn signed(body: &[u8], secret: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    fn test_state(verify_token: Option<&str>, app_secret: Option<&str>) -> Arc<AppState> {
        let config = CourierConfig {
            whatsapp: WhatsAppConfig {
                verify_token: verify_token.map(String::from),
                app_secret: app_secret.map(String::from),
                ..Default::default()
            },
            ..Default::default()
        };
        Arc::new(AppState::new(config))
    }

    #[test]
    fn signature_accepts_matching_hmac() {
        let body = b"test body";
        let header = signed(body, "test_secret");
        assert!(verify_signature(body, &header, "test_secret"));
    }

    #[test]
    fn signature_rejects_wrong_secret() {
        let body = b"test body";
        let header = signed(body, "test_secret");
        assert!(!verify_signature(body, &header, "other_secret"));
    }

    #[test]
    fn signature_rejects_tampered_body() {
        let header = signed(b"original", "test_secret");
        assert!(!verify_signature(b"tampered", &header, "test_secret"));
    }

    #[test]
    fn signature_rejects_missing_prefix() {
        assert!(!verify_signature(b"body", "not-a-signature", "secret"));
    }

    #[test]
    fn signature_rejects_bad_hex() {
        assert!(!verify_signature(b"body", "sha256=zzzz", "secret"));
    }

    #[test]
    fn subscription_echoes_challenge() {
        let result =
            verify_subscription(Some("subscribe"), Some("my_token"), Some("1234567"), "my_token");
        assert_eq!(result.unwrap(), "1234567");
    }

    #[test]
    fn subscription_wrong_token_is_forbidden() {
        let result =
            verify_subscription(Some("subscribe"), Some("wrong"), Some("1234567"), "my_token");
        assert_eq!(result.unwrap_err(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn subscription_wrong_mode_is_forbidden() {
        let result =
            verify_subscription(Some("unsubscribe"), Some("my_token"), Some("c"), "my_token");
        assert_eq!(result.unwrap_err(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn subscription_missing_challenge_is_bad_request() {
        let result = verify_subscription(Some("subscribe"), Some("my_token"), None, "my_token");
        assert_eq!(result.unwrap_err(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn get_handshake_happy_path() {
        let state = test_state(Some("my_token"), Some("secret"));
        let params = VerifyParams {
            mode: Some("subscribe".into()),
            verify_token: Some("my_token".into()),
            challenge: Some("1234567".into()),
        };

        let resp = verify_handler(State(state), Query(params)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"1234567");
    }

    #[tokio::test]
    async fn get_handshake_without_config_is_500() {
        let state = test_state(None, None);
        let params = VerifyParams {
            mode: Some("subscribe".into()),
            verify_token: Some("t".into()),
            challenge: Some("c".into()),
        };

        let resp = verify_handler(State(state), Query(params)).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn get_handshake_without_app_secret_is_500() {
        // verify_token alone is not enough; both routes need both secrets.
        let state = test_state(Some("my_token"), None);
        let params = VerifyParams {
            mode: Some("subscribe".into()),
            verify_token: Some("my_token".into()),
            challenge: Some("1234567".into()),
        };

        let resp = verify_handler(State(state), Query(params)).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn post_without_signature_is_401() {
        let state = test_state(None, Some("secret"));
        let resp = receive_handler(State(state), HeaderMap::new(), Bytes::from_static(b"{}")).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn post_bad_signature_is_401() {
        let state = test_state(None, Some("secret"));
        let mut headers = HeaderMap::new();
        headers.insert(SIGNATURE_HEADER, signed(b"other", "secret").parse().unwrap());

        let resp = receive_handler(State(state), headers, Bytes::from_static(b"{}")).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn post_valid_signature_bad_json_is_400_not_401() {
        let state = test_state(None, Some("secret"));
        let body = b"not json at all";
        let mut headers = HeaderMap::new();
        headers.insert(SIGNATURE_HEADER, signed(body, "secret").parse().unwrap());

        let resp = receive_handler(State(state), headers, Bytes::copy_from_slice(body)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn post_empty_envelope_is_accepted_noop() {
        let state = test_state(None, Some("secret"));
        let body = br#"{"object":"whatsapp_business_account","entry":[]}"#;
        let mut headers = HeaderMap::new();
        headers.insert(SIGNATURE_HEADER, signed(body, "secret").parse().unwrap());

        let resp = receive_handler(State(state), headers, Bytes::from_static(body)).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn post_without_config_is_500() {
        let state = test_state(None, None);
        let resp = receive_handler(State(state), HeaderMap::new(), Bytes::from_static(b"{}")).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
