use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

mod app;
mod dispatch;
mod http;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courier_gateway=info,tower_http=debug".into()),
        )
        .init();

    // load config: COURIER_CONFIG path > ./courier.toml, with COURIER_* env overrides
    let config_path = std::env::var("COURIER_CONFIG").ok();
    let config = courier_core::config::CourierConfig::load(config_path.as_deref())
        .unwrap_or_else(|e| {
            tracing::warn!("Config load failed ({}), using defaults", e);
            courier_core::config::CourierConfig::default()
        });

    if config.whatsapp.verify_token.is_none() || config.whatsapp.app_secret.is_none() {
        tracing::warn!(
            "whatsapp.verify_token / app_secret not configured — webhook endpoints will answer 500"
        );
    }

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;

    let state = Arc::new(app::AppState::new(config));
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    info!("Courier gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
