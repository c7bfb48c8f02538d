//! OpenAI bridge — three single-shot capabilities behind one client:
//! chat completion, Whisper transcription, and vision captioning.
//! No retries, no streaming; each call waits for the full response.

use std::path::Path;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use courier_core::config::OpenAiConfig;

use crate::error::BridgeError;

/// Prompt used when an image arrives without a caption.
pub const DEFAULT_CAPTION_PROMPT: &str = "What's in this picture?";

pub struct OpenAiBridge {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    chat_model: String,
    transcribe_model: String,
    vision_model: String,
    caption_max_tokens: u32,
}

impl OpenAiBridge {
    pub fn new(cfg: &OpenAiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: cfg.api_key.clone(),
            base_url: cfg.base_url.clone(),
            chat_model: cfg.chat_model.clone(),
            transcribe_model: cfg.transcribe_model.clone(),
            vision_model: cfg.vision_model.clone(),
            caption_max_tokens: cfg.caption_max_tokens,
        }
    }

    /// Single-turn chat completion.
    pub async fn complete(&self, message: &str) -> Result<String, BridgeError> {
        let body = json!({
            "model": self.chat_model,
            "messages": [{ "role": "user", "content": message }],
        });

        debug!(model = %self.chat_model, "requesting completion");
        let resp = self.post_chat(&body).await?;
        first_content(resp).ok_or(BridgeError::NoCompletion)
    }

    /// Transcribe an audio file via the Whisper endpoint.
    pub async fn transcribe(&self, audio_path: &Path) -> Result<String, BridgeError> {
        let bytes = tokio::fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());

        debug!(
            model = %self.transcribe_model,
            bytes = bytes.len(),
            "requesting transcription"
        );

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name),
            )
            .text("model", self.transcribe_model.clone());

        let url = format!("{}/v1/audio/transcriptions", self.base_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "transcription API error");
            return Err(BridgeError::Transcription(format!("status {status}: {text}")));
        }

        let parsed: TranscriptionResponse = resp
            .json()
            .await
            .map_err(|e| BridgeError::Transcription(e.to_string()))?;
        Ok(parsed.text)
    }

    /// Describe a base64-encoded image, guided by `prompt` when the sender
    /// attached a caption.
    pub async fn caption(
        &self,
        base64_image: &str,
        prompt: Option<&str>,
    ) -> Result<String, BridgeError> {
        let prompt = prompt.unwrap_or(DEFAULT_CAPTION_PROMPT);
        let data_url = format!("data:image/jpeg;base64,{base64_image}");

        let body = json!({
            "model": self.vision_model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt },
                    { "type": "image_url", "image_url": { "url": data_url } },
                ],
            }],
            "max_tokens": self.caption_max_tokens,
        });

        debug!(model = %self.vision_model, prompt, "requesting caption");
        let resp = self.post_chat(&body).await?;
        first_content(resp).ok_or(BridgeError::NoCaption)
    }

    async fn post_chat(&self, body: &Value) -> Result<ChatResponse, BridgeError> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "OpenAI API error");
            return Err(BridgeError::Api {
                status,
                message: text,
            });
        }

        resp.json()
            .await
            .map_err(|e| BridgeError::Parse(e.to_string()))
    }
}

/// Content of the first choice, if the backend returned one.
fn first_content(resp: ChatResponse) -> Option<String> {
    resp.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|s| !s.is_empty())
}

// OpenAI API response types (deserialization only)

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_content_picks_first_choice() {
        let resp: ChatResponse = serde_json::from_value(serde_json::json!({
            "choices": [
                { "message": { "role": "assistant", "content": "alpha" } },
                { "message": { "role": "assistant", "content": "beta" } },
            ]
        }))
        .unwrap();
        assert_eq!(first_content(resp).as_deref(), Some("alpha"));
    }

    #[test]
    fn zero_choices_yields_none() {
        let resp: ChatResponse =
            serde_json::from_value(serde_json::json!({ "choices": [] })).unwrap();
        assert!(first_content(resp).is_none());
    }

    #[test]
    fn empty_content_yields_none() {
        let resp: ChatResponse = serde_json::from_value(serde_json::json!({
            "choices": [{ "message": { "content": "" } }]
        }))
        .unwrap();
        assert!(first_content(resp).is_none());
    }

    #[test]
    fn transcription_response_shape() {
        let parsed: TranscriptionResponse =
            serde_json::from_value(serde_json::json!({ "text": "hello world" })).unwrap();
        assert_eq!(parsed.text, "hello world");
    }

    #[tokio::test]
    async fn transcribe_missing_file_is_io_error() {
        let bridge = OpenAiBridge::new(&courier_core::config::OpenAiConfig::default());
        let err = bridge
            .transcribe(Path::new("/nonexistent/clip.ogg"))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Io(_)));
    }
}
