//! Request context for middleware.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use serde_json::Value;

/// The model operation that issued a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Collection fetch.
    Query,
    /// Single-entity fetch.
    Get,
    /// POST to the collection.
    Create,
    /// PUT to an entity.
    Update,
    /// DELETE of an entity.
    Delete,
    /// A declared custom action.
    Action(String),
}

impl Operation {
    /// Check if this is a read operation.
    pub fn is_read(&self) -> bool {
        matches!(self, Self::Query | Self::Get)
    }

    /// Check if this is a write operation.
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Create | Self::Update | Self::Delete)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query => f.write_str("query"),
            Self::Get => f.write_str("get"),
            Self::Create => f.write_str("create"),
            Self::Update => f.write_str("update"),
            Self::Delete => f.write_str("delete"),
            Self::Action(name) => write!(f, "action:{}", name),
        }
    }
}

/// Metadata about the call a request belongs to.
#[derive(Debug, Clone, Default)]
pub struct RequestMetadata {
    /// The model issuing the request.
    pub model: Option<String>,
    /// The operation being performed.
    pub operation: Option<Operation>,
    /// Relation alias, when the request fetches included entities.
    pub relation: Option<String>,
    /// Custom tags.
    pub tags: HashMap<String, String>,
}

impl RequestMetadata {
    /// Create new empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the operation.
    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operation = Some(operation);
        self
    }

    /// Set the relation alias.
    pub fn with_relation(mut self, relation: impl Into<String>) -> Self {
        self.relation = Some(relation.into());
        self
    }

    /// Add a tag.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

/// Caller-owned state shared by every middleware of a request.
///
/// Cloning a `Context` yields a handle to the same state, so passing one
/// context to several calls lets middlewares keep request-scoped data (a
/// response cache, say) without globals.
#[derive(Debug, Clone, Default)]
pub struct Context {
    state: Arc<RwLock<HashMap<String, Value>>>,
}

impl Context {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a copy of a stored value.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.state.read().get(key).cloned()
    }

    /// Store a value, returning the previous one.
    pub fn insert(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.state.write().insert(key.into(), value)
    }

    /// Remove a value.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.state.write().remove(key)
    }

    /// Check if a key is stored.
    pub fn contains_key(&self, key: &str) -> bool {
        self.state.read().contains_key(key)
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.state.read().len()
    }

    /// Check if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.state.read().is_empty()
    }

    /// Check if two handles share the same state.
    pub fn ptr_eq(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

/// Context passed unchanged to every middleware of one request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    metadata: RequestMetadata,
    shared: Context,
    started_at: Instant,
}

impl RequestContext {
    /// Create a request context around caller state.
    pub fn new(shared: Context) -> Self {
        Self {
            metadata: RequestMetadata::new(),
            shared,
            started_at: Instant::now(),
        }
    }

    /// Set metadata (builder pattern).
    pub fn with_metadata(mut self, metadata: RequestMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Get the metadata.
    pub fn metadata(&self) -> &RequestMetadata {
        &self.metadata
    }

    /// Get the caller state.
    pub fn shared(&self) -> &Context {
        &self.shared
    }

    /// Get elapsed time since the request started.
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    /// Get elapsed time in microseconds.
    pub fn elapsed_us(&self) -> u64 {
        self.started_at.elapsed().as_micros() as u64
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new(Context::new())
    }
}
