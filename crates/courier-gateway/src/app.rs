use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use courier_agent::OpenAiBridge;
use courier_core::config::CourierConfig;
use courier_whatsapp::{MediaClient, ReplySender};

/// Central shared state — passed as Arc<AppState> to all Axum handlers.
/// Everything here is read-only after startup.
pub struct AppState {
    pub config: CourierConfig,
    pub bridge: OpenAiBridge,
    pub media: MediaClient,
    pub sender: ReplySender,
}

impl AppState {
    pub fn new(config: CourierConfig) -> Self {
        let bridge = OpenAiBridge::new(&config.openai);
        let media = MediaClient::new(&config.whatsapp);
        let sender = ReplySender::new(&config.whatsapp);
        Self {
            config,
            bridge,
            media,
            sender,
        }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/api", get(crate::http::health::api_probe_handler))
        .route(
            "/api/webhook",
            get(crate::http::webhook::verify_handler).post(crate::http::webhook::receive_handler),
        )
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
