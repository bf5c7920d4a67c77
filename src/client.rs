//! Typed client for the chat endpoint
//!
//! Usable on its own by other callers; the dashboard goes through the
//! dispatcher instead, which adds timing, rendering and history.

use serde::{Deserialize, Serialize};

use crate::config::Mode;
use crate::dispatch::parse_body;
use crate::error::Result;
use crate::transport::{HttpRequest, Transport};

/// Path of the chat endpoint, relative to the API base URL
pub const CHAT_PATH: &str = "/v1/chat";

/// Request body of `POST /v1/chat`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatBody {
    pub question: String,
    pub client_id: String,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub refresh: bool,
}

/// Outcome of a chat call. Non-2xx answers are data, not errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatReply {
    pub ok: bool,
    pub status: u16,
    /// Parsed body, or `{"raw": text}` when it was not JSON
    pub data: serde_json::Value,
}

/// `https://host/base/` -> `https://host/base/v1/chat`
pub fn chat_url(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), CHAT_PATH)
}

#[derive(Debug, Clone)]
pub struct ChatClient<T> {
    base_url: String,
    api_key: Option<String>,
    transport: T,
}

impl<T: Transport> ChatClient<T> {
    pub fn new(base_url: &str, api_key: Option<String>, transport: T) -> Self {
        ChatClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            transport,
        }
    }

    /// Send one chat request. Only a network failure is an `Err`.
    pub async fn chat(&self, body: &ChatBody) -> Result<ChatReply> {
        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        if let Some(key) = &self.api_key {
            headers.push(("Authorization".to_string(), format!("Bearer {}", key)));
        }
        let request = HttpRequest {
            url: chat_url(&self.base_url),
            headers,
            body: serde_json::to_string(body)?,
        };

        let response = self.transport.post(&request).await?;
        Ok(ChatReply {
            ok: response.is_success(),
            status: response.status,
            data: parse_body(&response.text),
        })
    }
}
