//! # restmodel-core
//!
//! Declarative REST models with relation resolution and a middleware
//! pipeline.
//!
//! This crate provides the transport-independent engine:
//! - Models bound to resource paths (`query`, `get`, `create`, `update`, `delete`)
//! - Declared relations (`has_one`, `has_many`) resolved with combined or
//!   exclusive fetching
//! - Custom actions dispatched by name
//! - A middleware pipeline every request flows through
//! - A registry resolving models by name
//!
//! The HTTP transport lives in `restmodel-http`; anything that turns a
//! request into a body, such as an in-memory mock, can take its place.
//!
//! ## Declaring Models
//!
//! ```rust
//! use std::sync::Arc;
//! use restmodel_core::{ModelConfig, ModelRegistry, RestService};
//!
//! let service = RestService::builder("http://localhost:3000")
//!     .registry(Arc::new(ModelRegistry::new()))
//!     .build();
//!
//! service.register_model("User", "/users", ModelConfig::new()).unwrap();
//! service.register_model("Comment", "/comments", ModelConfig::new()).unwrap();
//! let articles = service
//!     .register_model(
//!         "Article",
//!         "/articles",
//!         ModelConfig::new()
//!             .has_one("User", "author", ("id", "authorId"))
//!             .has_many("Comment", "comments", "articleId"),
//!     )
//!     .unwrap();
//!
//! assert!(articles.validate_included_models(&["author", "comments"]).is_ok());
//! assert!(articles.validate_included_models(&["tags"]).is_err());
//! ```
//!
//! ## Middleware
//!
//! ```rust
//! use restmodel_core::middleware::{middleware_fn, Flow, MiddlewareBuilder};
//! use serde_json::json;
//!
//! // A transport stand-in answering every request with an empty list.
//! let chain = MiddlewareBuilder::new()
//!     .with(middleware_fn("empty", |_stage, _ctx| Ok(Flow::proceed(json!([])))))
//!     .build();
//! assert_eq!(chain.names(), vec!["empty"]);
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use restmodel_core::{ErrorCode, RestError};
//!
//! let err = RestError::undefined_relation("Article", "tags");
//! assert_eq!(err.code, ErrorCode::UndefinedRelation);
//! assert!(err.is_validation());
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod model;
pub mod registry;
pub mod relations;
pub mod request;
pub mod service;

pub use config::{CustomAction, ModelConfig};
pub use error::{ErrorCode, ErrorContext, IntoMiddlewareError, RestError, RestResult, Suggestion};
pub use model::{ActionArgs, ActionHandler, Model};
pub use registry::ModelRegistry;
pub use relations::{
    Cardinality, FetchStrategy, RelationConfig, RelationDescriptor, RelationOptions,
    UsingOperation,
};
pub use request::{HttpMethod, Params, RawResponse, RequestDescriptor};
pub use service::{RestService, RestServiceBuilder};

// Re-export middleware types
pub use middleware::{
    Context, Flow, LoggingMiddleware, Middleware, MiddlewareBuilder, MiddlewareChain, Operation,
    Payload, RequestContext, Stage, async_middleware_fn, middleware_fn,
};

// Re-export logging utilities
pub use logging::{
    get_log_format, get_log_level, init as init_logging, init_with_level, is_debug_enabled,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{CustomAction, ModelConfig};
    pub use crate::error::{RestError, RestResult};
    pub use crate::middleware::{
        Context, Flow, Middleware, MiddlewareBuilder, Payload, RequestContext, Stage,
        async_middleware_fn, middleware_fn,
    };
    pub use crate::model::{ActionArgs, Model};
    pub use crate::relations::{FetchStrategy, RelationOptions, UsingOperation};
    pub use crate::request::{HttpMethod, Params};
    pub use crate::service::RestService;
}
