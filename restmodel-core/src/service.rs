//! The REST service: base URL, middleware chain and model registry.

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::ModelConfig;
use crate::error::{RestError, RestResult};
use crate::middleware::{MiddlewareChain, Payload, RequestContext};
use crate::model::Model;
use crate::registry::ModelRegistry;
use crate::request::{HttpMethod, Params, RequestDescriptor, resolve_path};

struct ServiceInner {
    base_url: String,
    middlewares: RwLock<Arc<MiddlewareChain>>,
    registry: Arc<ModelRegistry>,
}

/// Entry point for talking to one REST API.
///
/// Cloning is cheap; clones share the base URL, the middleware chain and the
/// registry.
///
/// # Example
///
/// ```rust
/// use restmodel_core::{ModelConfig, Params, RestService};
///
/// let service = RestService::new("http://localhost:3000");
/// let article = service
///     .register_model("Article", "/articles", ModelConfig::new())
///     .unwrap();
/// assert_eq!(article.name(), "Article");
///
/// let params = Params::new().with("id", 4);
/// assert_eq!(
///     service.endpoint("/articles/:id", &params),
///     "http://localhost:3000/articles/4"
/// );
/// ```
#[derive(Clone)]
pub struct RestService {
    inner: Arc<ServiceInner>,
}

impl RestService {
    /// Create a service on the global registry, with an empty middleware chain.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::builder(base_url).build()
    }

    /// Create a service builder.
    pub fn builder(base_url: impl Into<String>) -> RestServiceBuilder {
        RestServiceBuilder::new(base_url)
    }

    /// A fresh model configuration.
    pub fn model_config() -> ModelConfig {
        ModelConfig::new()
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Get the registry this service registers models in.
    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.inner.registry
    }

    /// Replace the middleware chain.
    ///
    /// Requests already in flight finish with the chain they started with.
    pub fn use_middlewares(&self, middlewares: impl Into<MiddlewareChain>) {
        let chain = middlewares.into();
        debug!(middlewares = ?chain.names(), "Installing middleware chain");
        *self.inner.middlewares.write() = Arc::new(chain);
    }

    /// Get the current middleware chain.
    pub fn middlewares(&self) -> Arc<MiddlewareChain> {
        self.inner.middlewares.read().clone()
    }

    /// Build the absolute URL for `path`, filling placeholders from `params`.
    ///
    /// Params that match no placeholder are ignored.
    pub fn endpoint(&self, path: &str, params: &Params) -> String {
        self.endpoint_and_query(path, params).0
    }

    /// Build the absolute URL for `path` and return the params that matched no
    /// placeholder, which belong in the query string.
    pub fn endpoint_and_query(&self, path: &str, params: &Params) -> (String, Params) {
        let (path, query) = resolve_path(path, params);
        (self.join(&path), query)
    }

    fn join(&self, path: &str) -> String {
        let base = &self.inner.base_url;
        match (base.ends_with('/'), path.starts_with('/')) {
            (true, true) => format!("{}{}", base, &path[1..]),
            _ => format!("{}{}", base, path),
        }
    }

    /// Run a request through the middleware chain and return the parsed body.
    pub async fn send(
        &self,
        request: RequestDescriptor,
        ctx: &RequestContext,
    ) -> RestResult<Value> {
        let chain = self.middlewares();
        let url = request.url.clone();
        debug!(method = %request.method, url = %url, "Sending request");

        match chain.execute(request, ctx).await? {
            Payload::Body(body) => Ok(body),
            other => {
                debug!(url = %url, value = other.kind(), "Pipeline ended without a body");
                Err(RestError::incomplete_pipeline(url))
            }
        }
    }

    /// GET `url`.
    pub async fn get(
        &self,
        url: impl Into<String>,
        query: Params,
        ctx: &RequestContext,
    ) -> RestResult<Value> {
        let request = RequestDescriptor::new(HttpMethod::Get, url).with_query(query);
        self.send(request, ctx).await
    }

    /// POST `payload` to `url`.
    pub async fn post(
        &self,
        url: impl Into<String>,
        payload: Value,
        query: Params,
        ctx: &RequestContext,
    ) -> RestResult<Value> {
        let request = RequestDescriptor::new(HttpMethod::Post, url)
            .with_query(query)
            .with_payload(payload);
        self.send(request, ctx).await
    }

    /// PUT `payload` to `url`.
    pub async fn put(
        &self,
        url: impl Into<String>,
        payload: Value,
        query: Params,
        ctx: &RequestContext,
    ) -> RestResult<Value> {
        let request = RequestDescriptor::new(HttpMethod::Put, url)
            .with_query(query)
            .with_payload(payload);
        self.send(request, ctx).await
    }

    /// DELETE `url`, optionally with a payload.
    pub async fn delete(
        &self,
        url: impl Into<String>,
        payload: Option<Value>,
        query: Params,
        ctx: &RequestContext,
    ) -> RestResult<Value> {
        let mut request = RequestDescriptor::new(HttpMethod::Delete, url).with_query(query);
        request.payload = payload;
        self.send(request, ctx).await
    }

    /// Create a model and register it under `name`, replacing any model of the
    /// same name.
    pub fn register_model(
        &self,
        name: impl Into<String>,
        path: impl Into<String>,
        config: ModelConfig,
    ) -> RestResult<Arc<Model>> {
        let name = name.into();
        let path = path.into();
        config.validate(&name)?;

        info!(
            model = %name,
            path = %path,
            relations = config.relations().len(),
            "Registering model"
        );
        let model = Arc::new(Model::new(name.clone(), path, self.clone(), config));
        Ok(self.inner.registry.register(name, model))
    }

    /// Look up a registered model.
    pub fn model(&self, name: &str) -> RestResult<Arc<Model>> {
        self.inner.registry.lookup(name)
    }

    /// Check if a model is registered.
    pub fn has_model(&self, name: &str) -> bool {
        self.inner.registry.has(name)
    }
}

impl std::fmt::Debug for RestService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestService")
            .field("base_url", &self.inner.base_url)
            .field("middlewares", &self.middlewares().names())
            .finish()
    }
}

/// Builder for [`RestService`].
pub struct RestServiceBuilder {
    base_url: String,
    middlewares: MiddlewareChain,
    registry: Option<Arc<ModelRegistry>>,
}

impl RestServiceBuilder {
    /// Create a builder for `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            middlewares: MiddlewareChain::new(),
            registry: None,
        }
    }

    /// Set the initial middleware chain.
    pub fn middlewares(mut self, middlewares: impl Into<MiddlewareChain>) -> Self {
        self.middlewares = middlewares.into();
        self
    }

    /// Use a dedicated registry instead of the global one.
    pub fn registry(mut self, registry: Arc<ModelRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Build the service.
    pub fn build(self) -> RestService {
        RestService {
            inner: Arc::new(ServiceInner {
                base_url: self.base_url,
                middlewares: RwLock::new(Arc::new(self.middlewares)),
                registry: self.registry.unwrap_or_else(ModelRegistry::global),
            }),
        }
    }
}
