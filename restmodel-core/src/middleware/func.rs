//! Closure adapters so plain functions can sit in a middleware chain.

use std::future::Future;

use super::context::RequestContext;
use super::types::{BoxFuture, Flow, Middleware, MiddlewareResult, Stage};

/// A middleware backed by a synchronous closure.
pub struct FnMiddleware<F> {
    name: &'static str,
    handler: F,
}

/// Wrap a synchronous closure as a middleware.
///
/// ```rust
/// use restmodel_core::middleware::{middleware_fn, Flow, Payload};
///
/// let add_header = middleware_fn("add_header", |stage, _ctx| match stage.value {
///     Payload::Request(request) => Ok(Flow::proceed(request.with_header("info", "Info ..."))),
///     other => Ok(Flow::proceed(other)),
/// });
/// ```
pub fn middleware_fn<F>(name: &'static str, handler: F) -> FnMiddleware<F>
where
    F: Fn(Stage, &RequestContext) -> MiddlewareResult<Flow> + Send + Sync,
{
    FnMiddleware { name, handler }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(Stage, &RequestContext) -> MiddlewareResult<Flow> + Send + Sync,
{
    fn handle<'a>(
        &'a self,
        stage: Stage,
        ctx: &'a RequestContext,
    ) -> BoxFuture<'a, MiddlewareResult<Flow>> {
        let outcome = (self.handler)(stage, ctx);
        Box::pin(async move { outcome })
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// A middleware backed by a closure returning a future.
pub struct AsyncFnMiddleware<F> {
    name: &'static str,
    handler: F,
}

/// Wrap an async closure as a middleware.
///
/// The closure receives an owned clone of the request context; clones share
/// the caller state.
pub fn async_middleware_fn<F, Fut>(name: &'static str, handler: F) -> AsyncFnMiddleware<F>
where
    F: Fn(Stage, RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = MiddlewareResult<Flow>> + Send + 'static,
{
    AsyncFnMiddleware { name, handler }
}

impl<F, Fut> Middleware for AsyncFnMiddleware<F>
where
    F: Fn(Stage, RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = MiddlewareResult<Flow>> + Send + 'static,
{
    fn handle<'a>(
        &'a self,
        stage: Stage,
        ctx: &'a RequestContext,
    ) -> BoxFuture<'a, MiddlewareResult<Flow>> {
        Box::pin((self.handler)(stage, ctx.clone()))
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
