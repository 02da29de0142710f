//! # restmodel
//!
//! Declarative REST models with relation resolution over a composable
//! middleware pipeline.
//!
//! restmodel provides:
//! - Models bound to resource paths with `query`, `get`, `create`, `update`
//!   and `delete`
//! - `has_one` / `has_many` relations loaded on demand with `include`
//! - Combined fetching (one request per relation) or exclusive fetching
//!   (one request per row)
//! - Custom actions declared as method + path pairs
//! - A middleware pipeline every request passes through, transport included
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use restmodel::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = restmodel::service("http://localhost:3000")?;
//!
//!     service.register_model("User", "/users", ModelConfig::new())?;
//!     service.register_model("Comment", "/comments", ModelConfig::new())?;
//!     let articles = service.register_model(
//!         "Article",
//!         "/articles",
//!         ModelConfig::new()
//!             .has_one("User", "author", ("id", "authorId"))
//!             .has_many("Comment", "comments", "articleId"),
//!     )?;
//!
//!     let rows = articles.query(Params::new(), &["author", "comments"]).await?;
//!     for article in rows {
//!         println!("{} by {}", article["title"], article["author"]["name"]);
//!     }
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub use restmodel_core::*;

/// The reqwest-backed HTTP transport.
pub mod http {
    pub use restmodel_http::*;
}

/// Create a service for `base_url` wired to the HTTP transport.
pub fn service(base_url: impl Into<String>) -> http::HttpResult<RestService> {
    restmodel_http::service(base_url)
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use restmodel_core::prelude::*;
    pub use restmodel_http::{FetchRequest, FetchResponse, HttpConfig};
}
