//! Client configuration.
//!
//! ```rust,ignore
//! use ollachat::config::ClientConfig;
//! use std::time::Duration;
//!
//! let config = ClientConfig::builder()
//!     .base_url("http://gpu-box:11434")
//!     .timeout(Duration::from_secs(300))
//!     .build()?;
//! ```

use std::time::Duration;

use crate::error::{ChatError, Result};
use crate::reasoning::extractor::DEFAULT_MAX_BUFFER_BYTES;

/// Default address of a local model server.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Settings for [`OllamaClient`](crate::client::OllamaClient) and the chat session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server base URL, without a trailing slash
    pub base_url: String,
    /// Whole-request timeout; `None` lets long generations run unbounded
    pub timeout: Option<Duration>,
    pub connect_timeout: Duration,
    /// Cap on buffered unterminated reasoning text per stream
    pub max_reasoning_buffer: usize,
    /// Ask the server for an uncompressed body so chunks arrive as produced
    pub disable_compression: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
            connect_timeout: Duration::from_secs(10),
            max_reasoning_buffer: DEFAULT_MAX_BUFFER_BYTES,
            disable_compression: true,
        }
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Build a configuration from environment variables.
    ///
    /// Supported environment variables:
    /// - `OLLACHAT_BASE_URL`: server URL (falls back to `OLLAMA_HOST`)
    /// - `OLLACHAT_TIMEOUT_SECS`: request timeout in seconds
    pub fn from_env() -> Result<Self> {
        let mut builder = Self::builder();

        if let Ok(url) = std::env::var("OLLACHAT_BASE_URL").or_else(|_| std::env::var("OLLAMA_HOST"))
        {
            builder = builder.base_url(url);
        }

        if let Ok(secs) = std::env::var("OLLACHAT_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                ChatError::ConfigError(format!("Invalid OLLACHAT_TIMEOUT_SECS: {secs}"))
            })?;
            builder = builder.timeout(Duration::from_secs(secs));
        }

        builder.build()
    }

    /// Join an API path onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    max_reasoning_buffer: Option<usize>,
    disable_compression: Option<bool>,
}

impl ClientConfigBuilder {
    /// Set the base URL (e.g., "<http://localhost:11434>")
    pub fn base_url<S: Into<String>>(mut self, url: S) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the whole-request timeout
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the connection timeout
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the cap on buffered unterminated reasoning text, in bytes
    pub const fn max_reasoning_buffer(mut self, bytes: usize) -> Self {
        self.max_reasoning_buffer = Some(bytes);
        self
    }

    /// Disable response compression
    pub const fn disable_compression(mut self, disable: bool) -> Self {
        self.disable_compression = Some(disable);
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> Result<ClientConfig> {
        let defaults = ClientConfig::default();

        let base_url = match self.base_url {
            Some(url) => normalize_base_url(&url)?,
            None => defaults.base_url,
        };

        let max_reasoning_buffer = self
            .max_reasoning_buffer
            .unwrap_or(defaults.max_reasoning_buffer);
        if max_reasoning_buffer == 0 {
            return Err(ChatError::ConfigError(
                "max_reasoning_buffer must be greater than zero".to_string(),
            ));
        }

        Ok(ClientConfig {
            base_url,
            timeout: self.timeout.or(defaults.timeout),
            connect_timeout: self.connect_timeout.unwrap_or(defaults.connect_timeout),
            max_reasoning_buffer,
            disable_compression: self
                .disable_compression
                .unwrap_or(defaults.disable_compression),
        })
    }
}

/// Accepts `host:port` as well as full URLs, and strips trailing slashes.
fn normalize_base_url(url: &str) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ChatError::ConfigError("Base URL cannot be empty".to_string()));
    }

    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else if trimmed.contains("://") {
        return Err(ChatError::ConfigError(format!(
            "Unsupported URL scheme in base URL: {trimmed}"
        )));
    } else {
        format!("http://{trimmed}")
    };

    reqwest::Url::parse(&with_scheme)
        .map_err(|e| ChatError::ConfigError(format!("Invalid base URL '{trimmed}': {e}")))?;

    Ok(with_scheme)
}
