//! HTTP client configuration.

use std::time::Duration;

use indexmap::IndexMap;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::{HttpError, HttpResult};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration of the reqwest client behind the fetch middleware.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Total request timeout.
    pub timeout: Duration,
    /// Connection timeout.
    pub connect_timeout: Option<Duration>,
    /// User agent sent with every request.
    pub user_agent: String,
    /// Headers sent with every request; per-request headers take precedence.
    pub default_headers: IndexMap<String, String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: None,
            user_agent: format!("restmodel/{}", env!("CARGO_PKG_VERSION")),
            default_headers: IndexMap::new(),
        }
    }
}

impl HttpConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for configuration.
    pub fn builder() -> HttpConfigBuilder {
        HttpConfigBuilder::new()
    }

    /// Read overrides from the environment.
    ///
    /// - `RESTMODEL_HTTP_TIMEOUT_MS` - request timeout in milliseconds
    /// - `RESTMODEL_USER_AGENT` - user agent string
    pub fn from_env() -> HttpResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> HttpResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("RESTMODEL_HTTP_TIMEOUT_MS") {
            let ms: u64 = value.trim().parse().map_err(|_| {
                HttpError::config(format!("invalid RESTMODEL_HTTP_TIMEOUT_MS: {}", value))
            })?;
            config.timeout = Duration::from_millis(ms);
        }
        if let Some(agent) = lookup("RESTMODEL_USER_AGENT") {
            config.user_agent = agent;
        }

        Ok(config)
    }

    /// Build the reqwest client.
    pub fn build_client(&self) -> HttpResult<reqwest::Client> {
        let mut headers = HeaderMap::with_capacity(self.default_headers.len());
        for (name, value) in &self.default_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| HttpError::config(format!("invalid header name {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| {
                    HttpError::config(format!("invalid header value for {}: {}", name.as_str(), e))
                })?;
            headers.insert(name, value);
        }

        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.clone())
            .default_headers(headers);
        if let Some(connect_timeout) = self.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }

        Ok(builder.build()?)
    }
}

/// Builder for HTTP configuration.
#[derive(Debug, Default)]
pub struct HttpConfigBuilder {
    config: HttpConfig,
}

impl HttpConfigBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = Some(timeout);
        self
    }

    /// Set the user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Add a default header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(name.into(), value.into());
        self
    }

    /// Build the configuration.
    pub fn build(self) -> HttpConfig {
        self.config
    }
}
