//! Middleware pipeline for request handling.
//!
//! Every request a model issues runs through an ordered list of middlewares.
//! Each one receives the running value and either:
//!
//! - **proceeds** to the next middleware with a new value (and optional extra
//!   payloads for the next stage only),
//! - **resolves** the whole chain early, skipping the rest (e.g. a cache hit),
//! - or **fails** it by returning an error, which the caller receives as is.
//!
//! The transport is just another middleware, so tests and applications can
//! swap it out freely.
//!
//! # Example
//!
//! ```rust
//! use restmodel_core::middleware::{middleware_fn, Flow, MiddlewareBuilder, Payload};
//!
//! let chain = MiddlewareBuilder::new()
//!     .with(middleware_fn("cache", |stage, ctx| {
//!         let url = stage.value.as_request().map(|r| r.url.clone()).unwrap_or_default();
//!         match ctx.shared().get(&url) {
//!             Some(hit) => Ok(Flow::resolve(hit)),
//!             None => Ok(Flow::proceed(stage.value)),
//!         }
//!     }))
//!     .build();
//! assert_eq!(chain.len(), 1);
//! ```

mod chain;
mod context;
mod func;
mod logging;
mod types;

pub use chain::{MiddlewareBuilder, MiddlewareChain};
pub use context::{Context, Operation, RequestContext, RequestMetadata};
pub use func::{AsyncFnMiddleware, FnMiddleware, async_middleware_fn, middleware_fn};
pub use logging::{LogLevel, LoggingConfig, LoggingMiddleware};
pub use types::{
    BoxFuture, Flow, IntoSharedMiddleware, Middleware, MiddlewareResult, Payload,
    SharedMiddleware, Stage,
};
