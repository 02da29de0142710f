//! Middleware chain implementation.

use std::sync::Arc;

use tracing::{debug, trace};

use super::context::RequestContext;
use super::types::{Flow, Middleware, MiddlewareResult, Payload, SharedMiddleware, Stage};
use crate::request::RequestDescriptor;

/// An ordered chain of middleware that processes requests.
///
/// Each middleware either proceeds to the next one with a new running value,
/// resolves the chain early, or fails it. Reaching the end of the chain
/// resolves it with the last running value. Middlewares after a resolve or a
/// failure are never invoked.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    middlewares: Vec<SharedMiddleware>,
}

impl MiddlewareChain {
    /// Create an empty middleware chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a chain with initial middleware.
    pub fn with(middlewares: Vec<SharedMiddleware>) -> Self {
        Self { middlewares }
    }

    /// Add middleware to the end of the chain.
    pub fn push<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middlewares.push(Arc::new(middleware));
    }

    /// Add middleware to the beginning of the chain.
    pub fn prepend<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middlewares.insert(0, Arc::new(middleware));
    }

    /// Get the number of middlewares in the chain.
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Check if the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Names of the middlewares, in order.
    pub fn names(&self) -> Vec<&'static str> {
        self.middlewares.iter().map(|m| m.name()).collect()
    }

    /// Run the chain over a request.
    pub async fn execute(
        &self,
        request: RequestDescriptor,
        ctx: &RequestContext,
    ) -> MiddlewareResult<Payload> {
        self.run(Stage::new(request), ctx).await
    }

    /// Run the chain from an arbitrary initial stage.
    pub async fn run(&self, initial: Stage, ctx: &RequestContext) -> MiddlewareResult<Payload> {
        let Stage {
            mut value,
            mut extra,
        } = initial;

        for (index, middleware) in self.middlewares.iter().enumerate() {
            if !middleware.enabled() {
                continue;
            }

            trace!(
                index,
                middleware = middleware.name(),
                value = value.kind(),
                "Running middleware"
            );

            let flow = middleware
                .handle(Stage { value, extra }, ctx)
                .await
                .inspect_err(|err| {
                    debug!(index, middleware = middleware.name(), error = %err, "Middleware failed");
                })?;

            match flow {
                Flow::Proceed {
                    value: next,
                    extra: next_extra,
                } => {
                    value = next;
                    extra = next_extra;
                }
                Flow::Resolve(resolved) => {
                    trace!(index, middleware = middleware.name(), "Chain resolved early");
                    return Ok(resolved);
                }
            }
        }

        Ok(value)
    }
}

impl From<Vec<SharedMiddleware>> for MiddlewareChain {
    fn from(middlewares: Vec<SharedMiddleware>) -> Self {
        Self::with(middlewares)
    }
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("middlewares", &self.names())
            .finish()
    }
}

/// Builder for creating middleware chains.
pub struct MiddlewareBuilder {
    middlewares: Vec<SharedMiddleware>,
}

impl MiddlewareBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            middlewares: Vec::new(),
        }
    }

    /// Add middleware.
    pub fn with<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Add an already shared middleware.
    pub fn with_shared(mut self, middleware: SharedMiddleware) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Add middleware conditionally.
    pub fn with_if<M: Middleware + 'static>(self, condition: bool, middleware: M) -> Self {
        if condition {
            self.with(middleware)
        } else {
            self
        }
    }

    /// Build the middleware chain.
    pub fn build(self) -> MiddlewareChain {
        MiddlewareChain::with(self.middlewares)
    }
}

impl Default for MiddlewareBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RestError;
    use crate::middleware::{BoxFuture, async_middleware_fn, middleware_fn};
    use crate::request::HttpMethod;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn request() -> RequestDescriptor {
        RequestDescriptor::new(HttpMethod::Get, "http://localhost:1/models")
    }

    #[test]
    fn test_middleware_chain_empty() {
        let chain = MiddlewareChain::new();
        assert!(chain.is_empty());
        assert_eq!(chain.len(), 0);
    }

    #[tokio::test]
    async fn test_empty_chain_returns_request() {
        let chain = MiddlewareChain::new();
        let result = chain.execute(request(), &RequestContext::default()).await.unwrap();
        assert_eq!(result, Payload::Request(request()));
    }

    #[tokio::test]
    async fn test_sync_middlewares_pass_values_along() {
        let chain = MiddlewareBuilder::new()
            .with(middleware_fn("add_info", |stage, _| match stage.value {
                Payload::Request(r) => Ok(Flow::proceed(r.with_header("info", "Info ..."))),
                other => Ok(Flow::proceed(other)),
            }))
            .with(middleware_fn("respond", |stage, _| {
                let info = stage.value.as_request().and_then(|r| r.header("info")).map(String::from);
                Ok(Flow::proceed(json!({"ok": true, "info": info})))
            }))
            .build();

        let result = chain.execute(request(), &RequestContext::default()).await.unwrap();
        assert_eq!(result, Payload::Body(json!({"ok": true, "info": "Info ..."})));
    }

    #[tokio::test]
    async fn test_async_middlewares_pass_values_along() {
        let chain = MiddlewareBuilder::new()
            .with(async_middleware_fn("add_info", |stage: Stage, _| async move {
                tokio::task::yield_now().await;
                match stage.value {
                    Payload::Request(r) => Ok::<_, RestError>(Flow::proceed(r.with_header("info", "Info ..."))),
                    other => Ok(Flow::proceed(other)),
                }
            }))
            .with(async_middleware_fn("respond", |stage: Stage, _| async move {
                tokio::task::yield_now().await;
                let info = stage.value.as_request().and_then(|r| r.header("info")).map(String::from);
                Ok::<_, RestError>(Flow::proceed(json!({"ok": true, "info": info})))
            }))
            .build();

        let result = chain.execute(request(), &RequestContext::default()).await.unwrap();
        assert_eq!(result, Payload::Body(json!({"ok": true, "info": "Info ..."})));
    }

    #[tokio::test]
    async fn test_resolve_skips_remaining_middlewares() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let chain = MiddlewareBuilder::new()
            .with(middleware_fn("cache_hit", |_, _| Ok(Flow::resolve(json!({"cached": true})))))
            .with(middleware_fn("network", move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Flow::proceed(json!({"cached": false})))
            }))
            .build();

        let result = chain.execute(request(), &RequestContext::default()).await.unwrap();
        assert_eq!(result, Payload::Body(json!({"cached": true})));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_error_stops_chain() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let chain = MiddlewareBuilder::new()
            .with(middleware_fn("fail", |_, _| Err(RestError::middleware("Failure ..."))))
            .with(middleware_fn("after", move |stage, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Flow::proceed(stage.value))
            }))
            .build();

        let err = chain.execute(request(), &RequestContext::default()).await.unwrap_err();
        assert!(err.is_middleware());
        assert_eq!(err.message, "Failure ...");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_extra_payloads_reach_next_middleware_only() {
        let chain = MiddlewareBuilder::new()
            .with(middleware_fn("first", |stage, _| {
                Ok(Flow::proceed_with(json!({"name": "abc"}), vec![stage.value]))
            }))
            .with(middleware_fn("second", |stage, _| {
                let url = stage.extra.first().and_then(Payload::as_request).map(|r| r.url.clone());
                assert_eq!(url.as_deref(), Some("http://localhost:1/models"));
                Ok(Flow::proceed(stage.value))
            }))
            .with(middleware_fn("third", |stage, _| {
                assert!(stage.extra.is_empty());
                Ok(Flow::proceed(stage.value))
            }))
            .build();

        let result = chain.execute(request(), &RequestContext::default()).await.unwrap();
        assert_eq!(result, Payload::Body(json!({"name": "abc"})));
    }

    #[tokio::test]
    async fn test_disabled_middleware_is_skipped() {
        struct Disabled;
        impl Middleware for Disabled {
            fn handle<'a>(
                &'a self,
                _stage: Stage,
                _ctx: &'a RequestContext,
            ) -> BoxFuture<'a, MiddlewareResult<Flow>> {
                Box::pin(async { Err(RestError::middleware("should not run")) })
            }

            fn enabled(&self) -> bool {
                false
            }
        }

        let mut chain = MiddlewareChain::new();
        chain.push(Disabled);
        chain.push(middleware_fn("respond", |_, _| Ok(Flow::proceed(json!("done")))));

        let result = chain.execute(request(), &RequestContext::default()).await.unwrap();
        assert_eq!(result, Payload::Body(json!("done")));
    }

    #[test]
    fn test_middleware_builder() {
        let chain = MiddlewareBuilder::new()
            .with(middleware_fn("a", |s, _| Ok(Flow::proceed(s.value))))
            .with_if(true, middleware_fn("b", |s, _| Ok(Flow::proceed(s.value))))
            .with_if(false, middleware_fn("c", |s, _| Ok(Flow::proceed(s.value))))
            .build();

        assert_eq!(chain.len(), 2);
        assert_eq!(chain.names(), vec!["a", "b"]);
    }

    #[test]
    fn test_prepend() {
        let mut chain = MiddlewareChain::new();
        chain.push(middleware_fn("second", |s, _| Ok(Flow::proceed(s.value))));
        chain.prepend(middleware_fn("first", |s, _| Ok(Flow::proceed(s.value))));
        assert_eq!(chain.names(), vec!["first", "second"]);
    }
}
