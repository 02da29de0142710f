//! Models: named REST resources with relations and custom actions.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::config::{CustomAction, ModelConfig};
use crate::error::{RestError, RestResult};
use crate::middleware::{BoxFuture, Context, Operation, RequestContext, RequestMetadata};
use crate::registry::ModelRegistry;
use crate::relations::{RelationDescriptor, RelationFetcher, RelationLoader, process_params};
use crate::request::{HttpMethod, Params, RequestDescriptor};
use crate::service::RestService;

/// Arguments of a custom action call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionArgs {
    /// Params filling the action path placeholders; leftovers join the query.
    pub params: Params,
    /// Extra query parameters.
    pub query: Params,
    /// Request payload.
    pub payload: Option<Value>,
}

impl ActionArgs {
    /// Create args from path params.
    pub fn new(params: impl Into<Params>) -> Self {
        Self {
            params: params.into(),
            ..Default::default()
        }
    }

    /// Add extra query parameters.
    pub fn with_query(mut self, query: impl Into<Params>) -> Self {
        self.query = query.into();
        self
    }

    /// Set the payload.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

impl From<Params> for ActionArgs {
    fn from(params: Params) -> Self {
        Self::new(params)
    }
}

impl From<Value> for ActionArgs {
    fn from(params: Value) -> Self {
        Self::new(params)
    }
}

/// Builds the request for a custom action.
pub type ActionHandler =
    Arc<dyn Fn(&Model, ActionArgs) -> RestResult<RequestDescriptor> + Send + Sync>;

fn action_handler(action: CustomAction) -> ActionHandler {
    Arc::new(move |model: &Model, args: ActionArgs| {
        let path = format!("{}{}", model.path, action.path);
        let (endpoint, mut query) = model.service.endpoint_and_query(&path, &args.params);
        query.merge(args.query);

        let mut request = RequestDescriptor::new(action.method, endpoint).with_query(query);
        request.payload = args.payload;
        Ok(request)
    })
}

/// A REST resource.
///
/// Every operation builds a request, runs it through the service middleware
/// chain and returns the parsed body. `query` and `get` can also include
/// declared relations, which are fetched after the primary request and merged
/// into each returned entity under the relation alias.
///
/// Each operation has a `*_with_context` variant taking a caller [`Context`]
/// that every middleware of every request of the call can read and write.
pub struct Model {
    name: String,
    path: String,
    id_field: String,
    relations: IndexMap<String, RelationDescriptor>,
    actions: IndexMap<String, ActionHandler>,
    service: RestService,
}

impl Model {
    pub(crate) fn new(
        name: String,
        path: String,
        service: RestService,
        config: ModelConfig,
    ) -> Self {
        let (relations, actions, id_field) = config.into_parts();
        let actions = actions
            .into_iter()
            .map(|(name, action)| (name, action_handler(action)))
            .collect();

        Self {
            name,
            path,
            id_field,
            relations,
            actions,
            service,
        }
    }

    /// Get the model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the resource path, relative to the service base URL.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get the id field.
    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    /// Get the service this model belongs to.
    pub fn service(&self) -> &RestService {
        &self.service
    }

    /// Declared relations, by alias.
    pub fn relations(&self) -> &IndexMap<String, RelationDescriptor> {
        &self.relations
    }

    /// Check if a relation is declared under `alias`.
    pub fn has_relation(&self, alias: &str) -> bool {
        self.relations.contains_key(alias)
    }

    /// Get a relation by alias.
    pub fn relation(&self, alias: &str) -> RestResult<&RelationDescriptor> {
        self.relations
            .get(alias)
            .ok_or_else(|| RestError::undefined_relation(&self.name, alias))
    }

    /// Names of the declared custom actions.
    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    /// Check if a custom action is declared.
    pub fn has_action(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Check that every alias names a declared relation with a registered
    /// target model.
    pub fn validate_included_models(&self, include: &[&str]) -> RestResult<()> {
        self.loader(&Context::new()).validate(include)
    }

    /// Fill `"@field"` values of `template` from `row`.
    pub fn process_params(template: &Params, row: &Value) -> Params {
        process_params(template, row)
    }

    /// Fetch the collection.
    ///
    /// Params fill placeholders of the model path; the rest form the query
    /// string.
    pub async fn query(
        &self,
        params: impl Into<Params>,
        include: &[&str],
    ) -> RestResult<Vec<Value>> {
        self.query_with_context(params, include, &Context::new()).await
    }

    /// Fetch the collection with a caller context.
    pub async fn query_with_context(
        &self,
        params: impl Into<Params>,
        include: &[&str],
        ctx: &Context,
    ) -> RestResult<Vec<Value>> {
        self.run_query(params.into(), include, ctx, None).await
    }

    /// Fetch one entity from `<path>/:id`.
    pub async fn get(&self, params: impl Into<Params>, include: &[&str]) -> RestResult<Value> {
        self.get_with_context(params, include, &Context::new()).await
    }

    /// Fetch one entity with a caller context.
    pub async fn get_with_context(
        &self,
        params: impl Into<Params>,
        include: &[&str],
        ctx: &Context,
    ) -> RestResult<Value> {
        self.run_get(params.into(), include, ctx, None).await
    }

    /// POST `payload` to the collection.
    ///
    /// Placeholders of the model path are filled from the payload itself.
    pub async fn create(&self, payload: Value, query: impl Into<Params>) -> RestResult<Value> {
        self.create_with_context(payload, query, &Context::new()).await
    }

    /// POST with a caller context.
    pub async fn create_with_context(
        &self,
        payload: Value,
        query: impl Into<Params>,
        ctx: &Context,
    ) -> RestResult<Value> {
        let endpoint = self
            .service
            .endpoint(&self.path, &Params::from(payload.clone()));
        let request = RequestDescriptor::new(HttpMethod::Post, endpoint)
            .with_query(query.into())
            .with_payload(payload);
        self.service
            .send(request, &self.request_context(Operation::Create, ctx, None))
            .await
    }

    /// PUT `payload` to `<path>/:id`.
    pub async fn update(&self, params: impl Into<Params>, payload: Value) -> RestResult<Value> {
        self.update_with_context(params, payload, &Context::new()).await
    }

    /// PUT with a caller context.
    pub async fn update_with_context(
        &self,
        params: impl Into<Params>,
        payload: Value,
        ctx: &Context,
    ) -> RestResult<Value> {
        let (endpoint, query) = self
            .service
            .endpoint_and_query(&self.entity_path(), &params.into());
        let request = RequestDescriptor::new(HttpMethod::Put, endpoint)
            .with_query(query)
            .with_payload(payload);
        self.service
            .send(request, &self.request_context(Operation::Update, ctx, None))
            .await
    }

    /// DELETE `<path>/:id`.
    pub async fn delete(
        &self,
        params: impl Into<Params>,
        payload: Option<Value>,
    ) -> RestResult<Value> {
        self.delete_with_context(params, payload, &Context::new()).await
    }

    /// DELETE with a caller context.
    pub async fn delete_with_context(
        &self,
        params: impl Into<Params>,
        payload: Option<Value>,
        ctx: &Context,
    ) -> RestResult<Value> {
        let (endpoint, query) = self
            .service
            .endpoint_and_query(&self.entity_path(), &params.into());
        let mut request = RequestDescriptor::new(HttpMethod::Delete, endpoint).with_query(query);
        request.payload = payload;
        self.service
            .send(request, &self.request_context(Operation::Delete, ctx, None))
            .await
    }

    /// Invoke a declared custom action.
    pub async fn call(&self, action: &str, args: impl Into<ActionArgs>) -> RestResult<Value> {
        self.call_with_context(action, args, &Context::new()).await
    }

    /// Invoke a custom action with a caller context.
    pub async fn call_with_context(
        &self,
        action: &str,
        args: impl Into<ActionArgs>,
        ctx: &Context,
    ) -> RestResult<Value> {
        let handler = self
            .actions
            .get(action)
            .ok_or_else(|| RestError::undefined_action(&self.name, action))?;
        let request = handler(self, args.into())?;
        let ctx = self.request_context(Operation::Action(action.to_string()), ctx, None);
        self.service.send(request, &ctx).await
    }

    /// Load `include` relations into `rows`.
    pub async fn include_entities(
        &self,
        rows: &mut [Value],
        include: &[&str],
        ctx: &Context,
    ) -> RestResult<()> {
        self.loader(ctx).load(rows, include).await
    }

    fn entity_path(&self) -> String {
        format!("{}/:id", self.path)
    }

    fn loader<'a>(&'a self, ctx: &'a Context) -> RelationLoader<'a, RegistryFetcher<'a>> {
        RelationLoader::new(
            &self.name,
            &self.id_field,
            &self.relations,
            RegistryFetcher {
                registry: self.service.registry(),
                ctx,
            },
        )
    }

    fn request_context(
        &self,
        operation: Operation,
        ctx: &Context,
        relation: Option<&str>,
    ) -> RequestContext {
        let mut metadata = RequestMetadata::new()
            .with_model(&self.name)
            .with_operation(operation);
        if let Some(relation) = relation {
            metadata = metadata.with_relation(relation);
        }
        RequestContext::new(ctx.clone()).with_metadata(metadata)
    }

    fn run_query<'a>(
        &'a self,
        params: Params,
        include: &'a [&'a str],
        ctx: &'a Context,
        relation: Option<&'a str>,
    ) -> BoxFuture<'a, RestResult<Vec<Value>>> {
        Box::pin(async move {
            let loader = self.loader(ctx);
            loader.validate(include)?;

            let (endpoint, query) = self.service.endpoint_and_query(&self.path, &params);
            let request = RequestDescriptor::new(HttpMethod::Get, endpoint).with_query(query);
            let body = self
                .service
                .send(request, &self.request_context(Operation::Query, ctx, relation))
                .await?;

            let mut rows = match body {
                Value::Array(rows) => rows,
                other => {
                    return Err(RestError::invalid_response(format!(
                        "expected an array from query of \"{}\", got {}",
                        self.name,
                        json_kind(&other)
                    ))
                    .with_model(&self.name));
                }
            };
            debug!(model = %self.name, rows = rows.len(), "Query returned");

            loader.load(&mut rows, include).await?;
            Ok(rows)
        })
    }

    fn run_get<'a>(
        &'a self,
        params: Params,
        include: &'a [&'a str],
        ctx: &'a Context,
        relation: Option<&'a str>,
    ) -> BoxFuture<'a, RestResult<Value>> {
        Box::pin(async move {
            let loader = self.loader(ctx);
            loader.validate(include)?;

            let (endpoint, query) = self.service.endpoint_and_query(&self.entity_path(), &params);
            let request = RequestDescriptor::new(HttpMethod::Get, endpoint).with_query(query);
            let body = self
                .service
                .send(request, &self.request_context(Operation::Get, ctx, relation))
                .await?;

            let mut rows = [body];
            loader.load(&mut rows, include).await?;
            let [body] = rows;
            Ok(body)
        })
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("id_field", &self.id_field)
            .field("relations", &self.relations)
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Resolves relation targets by name in the service registry.
struct RegistryFetcher<'a> {
    registry: &'a ModelRegistry,
    ctx: &'a Context,
}

impl RelationFetcher for RegistryFetcher<'_> {
    fn has_model(&self, name: &str) -> bool {
        self.registry.has(name)
    }

    fn query<'a>(
        &'a self,
        target: &'a str,
        params: Params,
        relation: &'a str,
    ) -> BoxFuture<'a, RestResult<Vec<Value>>> {
        Box::pin(async move {
            let model = self.registry.lookup(target)?;
            model.run_query(params, &[], self.ctx, Some(relation)).await
        })
    }

    fn get<'a>(
        &'a self,
        target: &'a str,
        params: Params,
        relation: &'a str,
    ) -> BoxFuture<'a, RestResult<Value>> {
        Box::pin(async move {
            let model = self.registry.lookup(target)?;
            model.run_get(params, &[], self.ctx, Some(relation)).await
        })
    }
}
