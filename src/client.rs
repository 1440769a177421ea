//! Local model server client
//!
//! Thin HTTP wrappers over the server's chat, completion and model-listing
//! endpoints. Streaming calls return a [`RecordStream`]; transport failures
//! are surfaced as-is and never retried here.

use async_trait::async_trait;
use reqwest::header::ACCEPT_ENCODING;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::{ChatError, Result};
use crate::streaming::{RecordStream, StreamFactory};
use crate::types::{
    ChatRecord, ChatRequest, CompletionRecord, CompletionRequest, LocalModel, ModelList,
    RunningModel,
};

const CHAT_PATH: &str = "api/chat";
const COMPLETION_PATH: &str = "api/generate";
const LOCAL_MODELS_PATH: &str = "api/tags";
const RUNNING_MODELS_PATH: &str = "api/ps";

/// The transport operations the chat session depends on.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Start a streaming chat; the request is forced to `stream: true`.
    async fn chat_stream(&self, request: ChatRequest) -> Result<RecordStream<ChatRecord>>;

    /// Start a streaming completion; the request is forced to `stream: true`.
    async fn completion_stream(
        &self,
        request: CompletionRequest,
    ) -> Result<RecordStream<CompletionRecord>>;

    /// Run a single-shot completion; the request is forced to `stream: false`.
    async fn completion(&self, request: CompletionRequest) -> Result<CompletionRecord>;
}

/// HTTP client for an Ollama-compatible server.
#[derive(Clone)]
pub struct OllamaClient {
    config: ClientConfig,
    http_client: reqwest::Client,
}

impl std::fmt::Debug for OllamaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaClient")
            .field("base_url", &self.config.base_url)
            .field("timeout", &self.config.timeout)
            .field("disable_compression", &self.config.disable_compression)
            .finish()
    }
}

impl OllamaClient {
    /// Create a client with an HTTP client built from `config`.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().connect_timeout(config.connect_timeout);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| ChatError::ConfigError(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self::with_http_client(config, http_client))
    }

    /// Create a client around an existing HTTP client.
    pub fn with_http_client(config: ClientConfig, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
        }
    }

    /// Client for `http://localhost:11434` with default settings.
    pub fn local() -> Result<Self> {
        Self::new(ClientConfig::default())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Streaming chat (`POST /api/chat`).
    pub async fn chat_stream(&self, mut request: ChatRequest) -> Result<RecordStream<ChatRecord>> {
        request.stream = true;
        let response = self.post(CHAT_PATH, &request).await?;
        Ok(StreamFactory::create_json_stream(response))
    }

    /// Non-streaming chat (`POST /api/chat`).
    pub async fn chat(&self, mut request: ChatRequest) -> Result<ChatRecord> {
        request.stream = false;
        let response = self.post(CHAT_PATH, &request).await?;
        decode_body(response).await
    }

    /// Streaming completion (`POST /api/generate`).
    pub async fn completion_stream(
        &self,
        mut request: CompletionRequest,
    ) -> Result<RecordStream<CompletionRecord>> {
        request.stream = true;
        let response = self.post(COMPLETION_PATH, &request).await?;
        Ok(StreamFactory::create_json_stream(response))
    }

    /// Non-streaming completion (`POST /api/generate`).
    pub async fn completion(&self, mut request: CompletionRequest) -> Result<CompletionRecord> {
        request.stream = false;
        let response = self.post(COMPLETION_PATH, &request).await?;
        decode_body(response).await
    }

    /// Models installed on the server (`GET /api/tags`).
    pub async fn list_local_models(&self) -> Result<Vec<LocalModel>> {
        let response = self.get(LOCAL_MODELS_PATH).await?;
        let list: ModelList<LocalModel> = decode_body(response).await?;
        Ok(list.models)
    }

    /// Models currently loaded in memory (`GET /api/ps`).
    pub async fn list_running_models(&self) -> Result<Vec<RunningModel>> {
        let response = self.get(RUNNING_MODELS_PATH).await?;
        let list: ModelList<RunningModel> = decode_body(response).await?;
        Ok(list.models)
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<reqwest::Response> {
        let url = self.config.endpoint(path);
        tracing::debug!(
            url = %url,
            method = "POST",
            body = %serde_json::to_string(body).unwrap_or_default(),
            "API request"
        );

        let mut rb = self.http_client.post(&url).json(body);
        if self.config.disable_compression {
            rb = rb.header(ACCEPT_ENCODING, "identity");
        }
        let response = rb.send().await?;
        check_response(&url, response).await
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response> {
        let url = self.config.endpoint(path);
        tracing::debug!(url = %url, method = "GET", "API request");

        let response = self.http_client.get(&url).send().await?;
        check_response(&url, response).await
    }
}

#[async_trait]
impl ChatTransport for OllamaClient {
    async fn chat_stream(&self, request: ChatRequest) -> Result<RecordStream<ChatRecord>> {
        OllamaClient::chat_stream(self, request).await
    }

    async fn completion_stream(
        &self,
        request: CompletionRequest,
    ) -> Result<RecordStream<CompletionRecord>> {
        OllamaClient::completion_stream(self, request).await
    }

    async fn completion(&self, request: CompletionRequest) -> Result<CompletionRecord> {
        OllamaClient::completion(self, request).await
    }
}

async fn check_response(url: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    tracing::debug!(url = %url, status = status.as_u16(), "API response");

    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error response".to_string());
    let error = classify_http_error(status.as_u16(), &body);
    tracing::warn!(url = %url, error = %error, "API request failed");
    Err(error)
}

/// Map a non-success response to `ApiError`, preferring the body's `error` field.
pub fn classify_http_error(status: u16, body: &str) -> ChatError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                format!("HTTP {status}")
            } else {
                trimmed.to_string()
            }
        });
    ChatError::api_error(status, message)
}

async fn decode_body<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let text = response.text().await?;
    tracing::trace!(body = %text, "API response body");
    Ok(serde_json::from_str(&text)?)
}
