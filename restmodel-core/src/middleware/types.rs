//! Core middleware types and traits.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use super::context::RequestContext;
use crate::error::RestError;
use crate::request::{RawResponse, RequestDescriptor};

/// Result type for middleware operations.
pub type MiddlewareResult<T> = Result<T, RestError>;

/// A boxed future for async middleware operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The running value handed from one middleware to the next.
///
/// A chain starts with a [`Payload::Request`]; a transport stage typically
/// turns it into a [`Payload::Response`], and a decoding stage into a
/// [`Payload::Body`], which is what model operations return.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A request that has not been sent yet.
    Request(RequestDescriptor),
    /// An undecoded transport response.
    Response(RawResponse),
    /// A parsed response body.
    Body(Value),
}

impl Payload {
    /// Get the request, if this payload still is one.
    pub fn as_request(&self) -> Option<&RequestDescriptor> {
        match self {
            Self::Request(request) => Some(request),
            _ => None,
        }
    }

    /// Get the parsed body, if any.
    pub fn as_body(&self) -> Option<&Value> {
        match self {
            Self::Body(body) => Some(body),
            _ => None,
        }
    }

    /// Consume into the parsed body, if any.
    pub fn into_body(self) -> Option<Value> {
        match self {
            Self::Body(body) => Some(body),
            _ => None,
        }
    }

    /// Short name of the variant, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Request(_) => "request",
            Self::Response(_) => "response",
            Self::Body(_) => "body",
        }
    }
}

impl From<RequestDescriptor> for Payload {
    fn from(request: RequestDescriptor) -> Self {
        Self::Request(request)
    }
}

impl From<RawResponse> for Payload {
    fn from(response: RawResponse) -> Self {
        Self::Response(response)
    }
}

impl From<Value> for Payload {
    fn from(body: Value) -> Self {
        Self::Body(body)
    }
}

/// What a middleware receives: the running value plus any extra payloads the
/// previous stage forwarded with [`Flow::proceed_with`].
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    /// The running value.
    pub value: Payload,
    /// Extra payloads forwarded by the previous stage.
    pub extra: Vec<Payload>,
}

impl Stage {
    /// Create a stage with no extra payloads.
    pub fn new(value: impl Into<Payload>) -> Self {
        Self {
            value: value.into(),
            extra: Vec::new(),
        }
    }
}

/// How a middleware hands control back to the chain.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    /// Continue with the next middleware.
    Proceed {
        /// New running value.
        value: Payload,
        /// Extra payloads for the next middleware only.
        extra: Vec<Payload>,
    },
    /// Finish the chain now; remaining middlewares are skipped.
    Resolve(Payload),
}

impl Flow {
    /// Continue with `value` as the new running value.
    pub fn proceed(value: impl Into<Payload>) -> Self {
        Self::Proceed {
            value: value.into(),
            extra: Vec::new(),
        }
    }

    /// Continue with `value`, forwarding `extra` to the next middleware.
    pub fn proceed_with(value: impl Into<Payload>, extra: Vec<Payload>) -> Self {
        Self::Proceed {
            value: value.into(),
            extra,
        }
    }

    /// Resolve the whole chain with `value`.
    pub fn resolve(value: impl Into<Payload>) -> Self {
        Self::Resolve(value.into())
    }

    /// Check if this flow short-circuits the chain.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolve(_))
    }
}

/// Middleware trait for intercepting requests.
///
/// A middleware receives the running value and either proceeds to the next
/// middleware, resolves the whole chain early, or fails it by returning an
/// error.
///
/// # Example
///
/// ```rust
/// use restmodel_core::middleware::{BoxFuture, Flow, Middleware, MiddlewareResult, Payload, RequestContext, Stage};
///
/// struct AddInfoHeader;
///
/// impl Middleware for AddInfoHeader {
///     fn handle<'a>(
///         &'a self,
///         stage: Stage,
///         _ctx: &'a RequestContext,
///     ) -> BoxFuture<'a, MiddlewareResult<Flow>> {
///         Box::pin(async move {
///             match stage.value {
///                 Payload::Request(request) => Ok(Flow::proceed(request.with_header("info", "Info ..."))),
///                 other => Ok(Flow::proceed(other)),
///             }
///         })
///     }
/// }
/// ```
pub trait Middleware: Send + Sync {
    /// Handle the running value.
    fn handle<'a>(
        &'a self,
        stage: Stage,
        ctx: &'a RequestContext,
    ) -> BoxFuture<'a, MiddlewareResult<Flow>>;

    /// Name of this middleware (for debugging/logging).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Whether this middleware is enabled.
    fn enabled(&self) -> bool {
        true
    }
}

/// A middleware that can be shared across threads.
pub type SharedMiddleware = Arc<dyn Middleware>;

/// Convenience trait for boxing middleware.
pub trait IntoSharedMiddleware {
    /// Convert into a shared middleware.
    fn into_shared(self) -> SharedMiddleware;
}

impl<T: Middleware + 'static> IntoSharedMiddleware for T {
    fn into_shared(self) -> SharedMiddleware {
        Arc::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::HttpMethod;
    use serde_json::json;

    #[test]
    fn test_payload_accessors() {
        let request = RequestDescriptor::new(HttpMethod::Get, "http://localhost/models");
        let payload = Payload::from(request.clone());
        assert_eq!(payload.as_request(), Some(&request));
        assert_eq!(payload.kind(), "request");
        assert!(payload.into_body().is_none());

        let body = Payload::from(json!({"ok": true}));
        assert_eq!(body.as_body(), Some(&json!({"ok": true})));
    }

    #[test]
    fn test_flow_constructors() {
        assert!(Flow::resolve(json!(1)).is_resolved());
        assert!(!Flow::proceed(json!(1)).is_resolved());

        match Flow::proceed_with(json!({"name": "abc"}), vec![Payload::Body(json!(2))]) {
            Flow::Proceed { value, extra } => {
                assert_eq!(value, Payload::Body(json!({"name": "abc"})));
                assert_eq!(extra.len(), 1);
            }
            Flow::Resolve(_) => panic!("expected proceed"),
        }
    }
}
