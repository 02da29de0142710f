//! Error types for the HTTP transport.

use restmodel_core::{ErrorCode, RestError};
use thiserror::Error;

/// Result type for HTTP transport operations.
pub type HttpResult<T> = Result<T, HttpError>;

/// Errors that can occur while sending a request or decoding its response.
#[derive(Error, Debug)]
pub enum HttpError {
    /// The HTTP client failed.
    #[error("http client error: {0}")]
    Client(#[from] reqwest::Error),

    /// The request URL could not be parsed.
    #[error("invalid url \"{url}\": {message}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// Why it was rejected.
        message: String,
    },

    /// The request did not finish in time.
    #[error("request timed out after {0}ms")]
    Timeout(u64),

    /// The response body is not valid JSON.
    #[error("invalid JSON response (status {status}): {message}")]
    Decode {
        /// HTTP status of the response.
        status: u16,
        /// Parser message.
        message: String,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl HttpError {
    /// Create an invalid URL error.
    pub fn invalid_url(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Check if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Client(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Check if the request never reached the server.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Client(e) if e.is_connect())
    }
}

impl From<HttpError> for RestError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::InvalidUrl { url, message } => RestError::invalid_url(url, message),
            HttpError::Decode { status, message } => RestError::invalid_response(format!(
                "invalid JSON response (status {}): {}",
                status, message
            )),
            HttpError::Config(message) => RestError::configuration(message),
            HttpError::Timeout(ms) => RestError::new(
                ErrorCode::Transport,
                format!("request timed out after {}ms", ms),
            ),
            HttpError::Client(e) => {
                let url = e.url().map(|u| u.to_string());
                let mut rest = RestError::transport(e.to_string());
                if let Some(url) = url {
                    rest = rest.with_url(url);
                }
                rest.with_source(e)
            }
        }
    }
}
