use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND: &str = "0.0.0.0";

/// Top-level config (courier.toml + COURIER_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CourierConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

/// WhatsApp Cloud API credentials and endpoints.
///
/// `verify_token` and `app_secret` stay optional: the webhook handlers answer
/// 500 "server configuration error" when they are absent instead of refusing
/// to boot, so the health endpoint stays reachable on a misconfigured box.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    /// Token echoed back during the GET subscription handshake.
    pub verify_token: Option<String>,
    /// HMAC-SHA256 key for X-Hub-Signature-256 validation.
    pub app_secret: Option<String>,
    /// Bearer token for Graph API calls (media resolve/download, send).
    #[serde(default)]
    pub access_token: String,
    /// Sender phone number id for the outbound /messages endpoint.
    #[serde(default)]
    pub phone_number_id: String,
    #[serde(default = "default_graph_base_url")]
    pub graph_base_url: String,
    /// Directory for transient media files (one UUID-named file per fetch).
    #[serde(default = "default_media_dir")]
    pub media_dir: String,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            verify_token: None,
            app_secret: None,
            access_token: String::new(),
            phone_number_id: String::new(),
            graph_base_url: default_graph_base_url(),
            media_dir: default_media_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_transcribe_model")]
    pub transcribe_model: String,
    #[serde(default = "default_vision_model")]
    pub vision_model: String,
    #[serde(default = "default_caption_max_tokens")]
    pub caption_max_tokens: u32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_openai_base_url(),
            chat_model: default_chat_model(),
            transcribe_model: default_transcribe_model(),
            vision_model: default_vision_model(),
            caption_max_tokens: default_caption_max_tokens(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_graph_base_url() -> String {
    "https://graph.facebook.com/v18.0".to_string()
}
fn default_media_dir() -> String {
    std::env::temp_dir()
        .join("courier-media")
        .to_string_lossy()
        .into_owned()
}
fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}
fn default_chat_model() -> String {
    "gpt-3.5-turbo-1106".to_string()
}
fn default_transcribe_model() -> String {
    "whisper-1".to_string()
}
fn default_vision_model() -> String {
    "gpt-4-vision-preview".to_string()
}
fn default_caption_max_tokens() -> u32 {
    300
}

impl CourierConfig {
    /// Load config from a TOML file with COURIER_* env var overrides.
    ///
    /// Env keys use `__` as the section separator so underscored field names
    /// survive, e.g. COURIER_WHATSAPP__VERIFY_TOKEN -> whatsapp.verify_token.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path.unwrap_or("courier.toml");

        let config: CourierConfig = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("COURIER_").split("__"))
            .extract()
            .map_err(|e| crate::error::CourierError::Config(e.to_string()))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_complete() {
        let cfg = CourierConfig::default();
        assert_eq!(cfg.gateway.port, 3000);
        assert_eq!(cfg.gateway.bind, "0.0.0.0");
        assert!(cfg.whatsapp.verify_token.is_none());
        assert!(cfg.whatsapp.app_secret.is_none());
        assert_eq!(cfg.whatsapp.graph_base_url, "https://graph.facebook.com/v18.0");
        assert_eq!(cfg.openai.chat_model, "gpt-3.5-turbo-1106");
        assert_eq!(cfg.openai.transcribe_model, "whisper-1");
        assert_eq!(cfg.openai.caption_max_tokens, 300);
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let json = serde_json::json!({});
        let cfg: CourierConfig = serde_json::from_value(json).unwrap();
        assert_eq!(cfg.gateway.port, 3000);
        assert_eq!(cfg.openai.base_url, "https://api.openai.com");
    }

    #[test]
    fn load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("courier.toml");
        std::fs::write(
            &path,
            r#"
[gateway]
port = 8080

[whatsapp]
verify_token = "vt"
app_secret = "shhh"
phone_number_id = "12345"
"#,
        )
        .unwrap();

        let cfg = CourierConfig::load(path.to_str()).unwrap();
        assert_eq!(cfg.gateway.port, 8080);
        assert_eq!(cfg.whatsapp.verify_token.as_deref(), Some("vt"));
        assert_eq!(cfg.whatsapp.app_secret.as_deref(), Some("shhh"));
        assert_eq!(cfg.whatsapp.phone_number_id, "12345");
        // untouched sections fall back to defaults
        assert_eq!(cfg.openai.vision_model, "gpt-4-vision-preview");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = CourierConfig::load(Some("/nonexistent/courier.toml")).unwrap();
        assert_eq!(cfg.gateway.port, 3000);
    }
}
