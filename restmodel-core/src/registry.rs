//! Name-to-model registry.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use tracing::debug;

use crate::error::{RestError, RestResult};
use crate::model::Model;

static GLOBAL_REGISTRY: LazyLock<Arc<ModelRegistry>> =
    LazyLock::new(|| Arc::new(ModelRegistry::new()));

/// Thread-safe mapping from model name to model.
///
/// Relations name their target model; the registry resolves that name each
/// time a relation is loaded, so targets may be registered after the models
/// that refer to them.
///
/// Services use the process-wide [`ModelRegistry::global`] instance unless
/// they are given their own, which keeps tests and separate API clients
/// isolated from one another.
///
/// Models hold their service and the service holds the registry, so a
/// registry and its models keep each other alive for as long as either is
/// reachable.
#[derive(Default)]
pub struct ModelRegistry {
    models: RwLock<HashMap<String, Arc<Model>>>,
}

impl ModelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the process-wide registry.
    pub fn global() -> Arc<ModelRegistry> {
        Arc::clone(&GLOBAL_REGISTRY)
    }

    /// Register `model` under `name`, replacing any previous entry.
    pub fn register(&self, name: impl Into<String>, model: Arc<Model>) -> Arc<Model> {
        let name = name.into();
        let replaced = self
            .models
            .write()
            .insert(name.clone(), Arc::clone(&model))
            .is_some();
        debug!(model = %name, replaced, "Registered model");
        model
    }

    /// Look up a model by name.
    pub fn lookup(&self, name: &str) -> RestResult<Arc<Model>> {
        self.models
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| RestError::undefined_model(name))
    }

    /// Check if a model is registered.
    pub fn has(&self, name: &str) -> bool {
        self.models.read().contains_key(name)
    }

    /// Number of registered models.
    pub fn len(&self) -> usize {
        self.models.read().len()
    }

    /// Check if no model is registered.
    pub fn is_empty(&self) -> bool {
        self.models.read().is_empty()
    }

    /// Registered model names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.models.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("models", &self.names())
            .finish()
    }
}
