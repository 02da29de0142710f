//! Logging middleware for request tracing.

use std::sync::atomic::{AtomicU64, Ordering};

use super::context::RequestContext;
use super::types::{BoxFuture, Flow, Middleware, MiddlewareResult, Payload, Stage};

/// Log level for request logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    /// Log nothing.
    Off,
    /// Log only errors.
    Error,
    /// Log errors and warnings (error status codes).
    Warn,
    /// Log all requests.
    #[default]
    Info,
    /// Log requests with query parameters.
    Debug,
    /// Log everything including payloads.
    Trace,
}

/// Configuration for the logging middleware.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum log level.
    pub level: LogLevel,
    /// Whether to log request payloads and parsed bodies.
    pub log_payload: bool,
    /// Maximum length of logged URLs (0 = unlimited).
    pub max_url_length: usize,
    /// Prefix for log messages.
    pub prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            log_payload: false,
            max_url_length: 500,
            prefix: "restmodel".to_string(),
        }
    }
}

/// Pass-through middleware that logs whatever flows through it.
///
/// Placed before the transport it sees requests; placed after it sees raw
/// responses or parsed bodies. The running value is never altered.
///
/// # Example
///
/// ```rust
/// use restmodel_core::middleware::{LoggingMiddleware, LogLevel};
///
/// let logging = LoggingMiddleware::new()
///     .with_level(LogLevel::Debug)
///     .with_payload(true);
/// ```
pub struct LoggingMiddleware {
    config: LoggingConfig,
    request_count: AtomicU64,
}

impl LoggingMiddleware {
    /// Create a new logging middleware with default settings.
    pub fn new() -> Self {
        Self::with_config(LoggingConfig::default())
    }

    /// Create with custom configuration.
    pub fn with_config(config: LoggingConfig) -> Self {
        Self {
            config,
            request_count: AtomicU64::new(0),
        }
    }

    /// Set the log level.
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    /// Enable payload logging.
    pub fn with_payload(mut self, enabled: bool) -> Self {
        self.config.log_payload = enabled;
        self
    }

    /// Set the log prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.prefix = prefix.into();
        self
    }

    /// Number of requests seen so far.
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    fn truncate_url(&self, url: &str) -> String {
        let max = self.config.max_url_length;
        match url.char_indices().nth(max) {
            Some((cut, _)) if max > 0 => format!("{}...", &url[..cut]),
            _ => url.to_string(),
        }
    }

    fn log(&self, value: &Payload, ctx: &RequestContext) {
        let prefix = &self.config.prefix;
        let model = ctx.metadata().model.as_deref().unwrap_or("-");
        let operation = ctx
            .metadata()
            .operation
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();

        match value {
            Payload::Request(request) => {
                let request_id = self.request_count.fetch_add(1, Ordering::SeqCst);
                if self.config.level < LogLevel::Info {
                    return;
                }
                let url = self.truncate_url(&request.url);
                if self.config.log_payload && self.config.level >= LogLevel::Trace {
                    tracing::info!(
                        target: "restmodel::request",
                        request_id,
                        method = %request.method,
                        url = %url,
                        query = ?request.query,
                        payload = ?request.payload,
                        model,
                        operation = %operation,
                        "[{}] Dispatching request",
                        prefix
                    );
                } else if self.config.level >= LogLevel::Debug {
                    tracing::info!(
                        target: "restmodel::request",
                        request_id,
                        method = %request.method,
                        url = %url,
                        query = ?request.query,
                        model,
                        operation = %operation,
                        "[{}] Dispatching request",
                        prefix
                    );
                } else {
                    tracing::info!(
                        target: "restmodel::request",
                        request_id,
                        method = %request.method,
                        url = %url,
                        model,
                        "[{}] Dispatching request",
                        prefix
                    );
                }
            }
            Payload::Response(response) => {
                if !response.is_success() && self.config.level >= LogLevel::Warn {
                    tracing::warn!(
                        target: "restmodel::request",
                        status = response.status,
                        elapsed_us = ctx.elapsed_us(),
                        model,
                        operation = %operation,
                        "[{}] Request returned error status",
                        prefix
                    );
                } else if self.config.level >= LogLevel::Info {
                    tracing::info!(
                        target: "restmodel::request",
                        status = response.status,
                        bytes = response.body.len(),
                        elapsed_us = ctx.elapsed_us(),
                        model,
                        "[{}] Response received",
                        prefix
                    );
                }
            }
            Payload::Body(body) => {
                if self.config.log_payload && self.config.level >= LogLevel::Trace {
                    tracing::info!(
                        target: "restmodel::request",
                        elapsed_us = ctx.elapsed_us(),
                        model,
                        body = %body,
                        "[{}] Body decoded",
                        prefix
                    );
                } else if self.config.level >= LogLevel::Debug {
                    tracing::debug!(
                        target: "restmodel::request",
                        elapsed_us = ctx.elapsed_us(),
                        model,
                        "[{}] Body decoded",
                        prefix
                    );
                }
            }
        }
    }
}

impl Default for LoggingMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl Middleware for LoggingMiddleware {
    fn handle<'a>(
        &'a self,
        stage: Stage,
        ctx: &'a RequestContext,
    ) -> BoxFuture<'a, MiddlewareResult<Flow>> {
        Box::pin(async move {
            self.log(&stage.value, ctx);
            Ok(Flow::proceed_with(stage.value, stage.extra))
        })
    }

    fn name(&self) -> &'static str {
        "LoggingMiddleware"
    }

    fn enabled(&self) -> bool {
        self.config.level != LogLevel::Off
    }
}
