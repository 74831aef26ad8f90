//! Client side of the model-serving endpoint.
//!
//! The pipeline only needs two operations from the server: listing the
//! installed models and a single non-streaming chat exchange that may carry
//! one base64-encoded image. [`ModelEndpoint`] captures that contract;
//! [`OllamaClient`] implements it against the Ollama HTTP API.

use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};

/// Longest slice of an error body kept in messages
const ERROR_BODY_LIMIT: usize = 512;

/// Operations the rename pipeline consumes from a model server
pub trait ModelEndpoint: Send + Sync {
    /// Names of every installed model, in server order
    fn list_models(&self) -> Result<Vec<String>>;

    /// Send one user message (optionally with one base64 image) and return the reply text
    fn chat(&self, model: &str, prompt: &str, image_base64: Option<&str>) -> Result<String>;
}

/// `GET /api/tags` response
#[derive(Debug, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<ModelEntry>,
}

/// One installed model as reported by `/api/tags`
#[derive(Debug, Deserialize)]
pub struct ModelEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

impl ModelEntry {
    /// Identifier to use in chat requests
    pub fn identifier(&self) -> Option<&str> {
        self.model
            .as_deref()
            .or(self.name.as_deref())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<&'a str>,
}

/// `POST /api/chat` response (non-streaming)
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub message: ChatReply,
}

#[derive(Debug, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub role: String,
    pub content: String,
}

/// Blocking client for a local Ollama server
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: HttpClient,
    base_url: String,
}

impl OllamaClient {
    /// Build a client for the configured host and timeout
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = HttpClient::builder();
        // reqwest's blocking client defaults to 30s; an unset timeout means none
        builder = builder.timeout(config.request_timeout());
        let http = builder.build()?;
        Ok(Self {
            http,
            base_url: config.ollama_host.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl ModelEndpoint for OllamaClient {
    fn list_models(&self) -> Result<Vec<String>> {
        let response = self.http.get(self.url("api/tags")).send()?;
        let body = response_text_or_error(response)?;
        parse_tags(&body)
    }

    fn chat(&self, model: &str, prompt: &str, image_base64: Option<&str>) -> Result<String> {
        let request = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
                images: image_base64.into_iter().collect(),
            }],
            stream: false,
        };

        log::debug!(
            "POST {} model={} with_image={}",
            self.url("api/chat"),
            model,
            image_base64.is_some()
        );

        let response = self.http.post(self.url("api/chat")).json(&request).send()?;
        let body = response_text_or_error(response)?;
        parse_chat(&body)
    }
}

/// Extract model identifiers from a `/api/tags` body
pub fn parse_tags(body: &str) -> Result<Vec<String>> {
    let tags: TagsResponse = serde_json::from_str(body)?;
    Ok(tags
        .models
        .iter()
        .filter_map(ModelEntry::identifier)
        .map(str::to_string)
        .collect())
}

/// Extract the reply text from a `/api/chat` body
pub fn parse_chat(body: &str) -> Result<String> {
    let chat: ChatResponse = serde_json::from_str(body)?;
    Ok(chat.message.content)
}

fn response_text_or_error(response: HttpResponse) -> Result<String> {
    let status = response.status();
    let body = response.text()?;
    if !status.is_success() {
        return Err(Error::Endpoint {
            status: status.as_u16(),
            body: truncate_text(body.trim(), ERROR_BODY_LIMIT),
        });
    }
    Ok(body)
}

fn truncate_text(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut out: String = text.chars().take(limit).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags_prefers_model_field() {
        let body = r#"{"models":[
            {"name":"llava:7b","model":"llava:7b","size":1},
            {"name":"mistral:latest"},
            {"name":"","model":"  "},
            {}
        ]}"#;
        let models = parse_tags(body).unwrap();
        assert_eq!(models, vec!["llava:7b", "mistral:latest"]);
    }

    #[test]
    fn test_parse_tags_rejects_garbage() {
        assert!(matches!(parse_tags("not json"), Err(Error::Json(_))));
    }

    #[test]
    fn test_parse_chat() {
        let body = r#"{"model":"llava","message":{"role":"assistant","content":" cat_sleeping \n"},"done":true}"#;
        assert_eq!(parse_chat(body).unwrap(), " cat_sleeping \n");
        assert!(parse_chat(r#"{"done":true}"#).is_err());
    }

    #[test]
    fn test_chat_request_omits_empty_images() {
        let request = ChatRequest {
            model: "llava",
            messages: vec![ChatMessage {
                role: "user",
                content: "test",
                images: Vec::new(),
            }],
            stream: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json["messages"][0].get("images").is_none());
        assert_eq!(json["stream"], serde_json::json!(false));
    }

    #[test]
    fn test_unreachable_server_is_an_error() {
        let mut config = Config::default();
        // Port 9 (discard) is closed on test machines
        config.ollama_host = "http://127.0.0.1:9".to_string();
        config.request_timeout_secs = Some(2);
        let client = OllamaClient::new(&config).unwrap();

        assert!(matches!(client.list_models(), Err(Error::Http(_))));
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("abcdef", 3), "abc...");
    }
}
