//! Reqwest-based LLM client implementing OpenAI-compatible Chat Completions streaming.

use std::{path::Path, pin::Pin, time::Duration};

use async_stream::try_stream;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures_core::Stream;
use futures_util::StreamExt as _;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    config::Config,
    errors::{ConfigError, ServiceError},
};

/// The only capability the pipeline needs from a model.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        image: Option<&Path>,
    ) -> Result<String, ServiceError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Inline the file as a base64 data URL.
    pub fn image_file(path: &Path) -> Result<Self, ServiceError> {
        let bytes = std::fs::read(path).map_err(|source| ServiceError::Image {
            path: path.to_path_buf(),
            source,
        })?;
        let url = format!("data:{};base64,{}", image_mime(path), STANDARD.encode(bytes));
        Ok(Self::ImageUrl { image_url: ImageUrl { url } })
    }
}

fn image_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "image/png",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: MessageContent::Text(content.into()) }
    }

    pub fn multimodal(role: Role, parts: Vec<ContentPart>) -> Self {
        Self { role, content: MessageContent::Parts(parts) }
    }
}

#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub model: String,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl ChatOptions {
    pub fn from_config(cfg: &Config) -> Result<Self, ConfigError> {
        let float = |key: &str| -> Result<Option<f32>, ConfigError> {
            Ok(cfg.get_f64(key)?.map(|v| v as f32))
        };
        Ok(Self {
            model: cfg.get("DEFAULT_MODEL").unwrap_or_else(|| "gpt-5-mini".into()),
            temperature: float("TEMPERATURE")?,
            top_p: float("TOP_P")?,
            max_tokens: cfg.get_u64("MAX_TOKENS")?.map(|v| v.min(u32::MAX as u64) as u32),
        })
    }
}

#[derive(Debug)]
pub struct LlmClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    opts: ChatOptions,
}

impl LlmClient {
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let timeout = cfg.get_u64("REQUEST_TIMEOUT")?.unwrap_or(300);
        let api_base_url = cfg.get("API_BASE_URL").unwrap_or_else(|| "default".into());
        let base_url = if api_base_url == "default" {
            "https://api.openai.com/v1".to_string()
        } else {
            api_base_url
        };
        let opts = ChatOptions::from_config(cfg)?;
        Ok(Self::new(&base_url, cfg.get("OPENAI_API_KEY"), Duration::from_secs(timeout), opts)?)
    }

    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
        opts: ChatOptions,
    ) -> Result<Self, ServiceError> {
        let trimmed = base_url.trim_end_matches('/');
        let base_url = if !trimmed.ends_with("/v1") && !trimmed.contains("/v1/") {
            format!("{}/v1", trimmed)
        } else {
            trimmed.to_string()
        };

        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self { http, base_url, api_key, opts })
    }

    pub fn chat_stream(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, ServiceError>> + Send>> {
        let http = self.http.clone();
        let base_url = self.base_url.clone();
        let api_key = self.api_key.clone();
        let opts = self.opts.clone();

        Box::pin(try_stream! {
            let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));

            let mut headers = HeaderMap::new();
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
            if let Some(key) = api_key.clone() {
                let hv = HeaderValue::from_str(&format!("Bearer {}", key))?;
                headers.insert(AUTHORIZATION, hv);
            }

            let mut body = serde_json::json!({
                "model": opts.model,
                "messages": messages,
                "stream": true,
            });
            if let Some(t) = opts.temperature {
                body["temperature"] = serde_json::json!(t);
            }
            if let Some(p) = opts.top_p {
                body["top_p"] = serde_json::json!(p);
            }
            if let Some(m) = opts.max_tokens {
                body["max_tokens"] = serde_json::json!(m);
            }

            let resp = http
                .post(url)
                .headers(headers)
                .json(&body)
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                // Only this branch consumes the response for its body.
                let body = resp.text().await.unwrap_or_default();
                Err::<(), _>(ServiceError::Status { status, body })?;
            } else {
                let mut buf = String::new();
                let mut stream = resp.bytes_stream();

                while let Some(chunk) = stream.next().await {
                    let bytes = chunk?;
                    buf.push_str(&String::from_utf8_lossy(&bytes));
                    // process complete lines
                    while let Some(pos) = buf.find('\n') {
                        let line = buf[..pos].trim().to_string();
                        buf.drain(..=pos);
                        if line.is_empty() || line.starts_with(':') { continue; }
                        if let Some(payload) = line.strip_prefix("data:") {
                            let payload = payload.trim();
                            if payload == "[DONE]" { yield StreamEvent::Done; return; }
                            match serde_json::from_str::<Chunk>(payload) {
                                Ok(chunk) => {
                                    for choice in chunk.choices {
                                        if let Some(content) = choice.delta.and_then(|d| d.content) {
                                            if !content.is_empty() {
                                                yield StreamEvent::Content(content);
                                            }
                                        }
                                    }
                                }
                                Err(e) => debug!("ignoring malformed stream line: {}", e),
                            }
                        }
                    }
                }
                yield StreamEvent::Done;
            }
        })
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        image: Option<&Path>,
    ) -> Result<String, ServiceError> {
        let user_message = match image {
            Some(path) => ChatMessage::multimodal(
                Role::User,
                vec![ContentPart::text(user_prompt), ContentPart::image_file(path)?],
            ),
            None => ChatMessage::new(Role::User, user_prompt),
        };
        let messages = vec![ChatMessage::new(Role::System, system_prompt), user_message];

        debug!(model = %self.opts.model, image = image.is_some(), "sending chat request");
        let mut stream = self.chat_stream(messages);
        let mut text = String::new();
        while let Some(ev) = stream.next().await {
            match ev? {
                StreamEvent::Content(t) => text.push_str(&t),
                StreamEvent::Done => break,
            }
        }

        if text.trim().is_empty() {
            return Err(ServiceError::EmptyResponse);
        }
        Ok(text)
    }
}

#[derive(Debug)]
pub enum StreamEvent {
    Content(String),
    Done,
}

// Minimal chunk structures for OpenAI-like streaming
#[derive(Debug, Deserialize)]
struct Chunk {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    delta: Option<Delta>,
}

#[derive(Debug, Deserialize)]
struct Delta {
    content: Option<String>,
}
