//! # restmodel-http
//!
//! HTTP transport for restmodel, built on `reqwest`.
//!
//! This crate provides:
//! - [`FetchRequest`]: sends a request and proceeds with the raw response
//! - [`FetchResponse`]: decodes the raw response into its JSON body
//! - [`HttpConfig`]: timeouts, user agent and default headers
//!
//! Both are ordinary middlewares; put your own before, between or after them.
//!
//! ## Example
//!
//! ```rust,ignore
//! use restmodel_core::{ModelConfig, Params};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = restmodel_http::service("http://localhost:3000")?;
//!     let articles = service.register_model("Article", "/articles", ModelConfig::new())?;
//!
//!     let rows = articles.query(Params::new(), &[]).await?;
//!     println!("{} articles", rows.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod fetch;

use std::sync::Arc;

use restmodel_core::RestService;
use restmodel_core::middleware::SharedMiddleware;

pub use config::{DEFAULT_TIMEOUT, HttpConfig, HttpConfigBuilder};
pub use error::{HttpError, HttpResult};
pub use fetch::{FetchRequest, FetchResponse, build_url, decode_body, json_body};

/// The default transport pair: [`FetchRequest`] then [`FetchResponse`].
pub fn default_middlewares() -> HttpResult<Vec<SharedMiddleware>> {
    default_middlewares_with(&HttpConfig::default())
}

/// The default transport pair with a configured client.
pub fn default_middlewares_with(config: &HttpConfig) -> HttpResult<Vec<SharedMiddleware>> {
    Ok(vec![
        Arc::new(FetchRequest::with_config(config)?),
        Arc::new(FetchResponse::new()),
    ])
}

/// Create a service for `base_url` wired to the default transport.
pub fn service(base_url: impl Into<String>) -> HttpResult<RestService> {
    service_with_config(base_url, &HttpConfig::default())
}

/// Create a service for `base_url` wired to a configured transport.
pub fn service_with_config(
    base_url: impl Into<String>,
    config: &HttpConfig,
) -> HttpResult<RestService> {
    Ok(RestService::builder(base_url)
        .middlewares(default_middlewares_with(config)?)
        .build())
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::{HttpConfig, HttpConfigBuilder};
    pub use crate::error::{HttpError, HttpResult};
    pub use crate::fetch::{FetchRequest, FetchResponse};
    pub use crate::{default_middlewares, service};
}
