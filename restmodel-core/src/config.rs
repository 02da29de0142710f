//! Model configuration.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{RestError, RestResult};
use crate::relations::{
    Cardinality, FetchStrategy, RelationConfig, RelationDescriptor, UsingOperation,
};
use crate::request::HttpMethod;

/// A declared custom action: an HTTP method and a path suffix appended to the
/// model path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomAction {
    /// HTTP method.
    pub method: HttpMethod,
    /// Path suffix, which may contain `:name` placeholders.
    pub path: String,
}

impl CustomAction {
    /// Create a custom action.
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }
}

/// Configuration of a model: relations, custom actions and id field.
///
/// # Example
///
/// ```rust
/// use restmodel_core::{HttpMethod, ModelConfig};
///
/// let config = ModelConfig::new()
///     .has_one("User", "author", ("id", "authorId"))
///     .has_many("Comment", "comments", "articleId")
///     .custom_action("publish", HttpMethod::Post, "/:id/publish");
///
/// assert_eq!(config.relations().len(), 2);
/// assert_eq!(config.id_field(), "id");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    relations: IndexMap<String, RelationDescriptor>,
    actions: IndexMap<String, CustomAction>,
    id_field: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            relations: IndexMap::new(),
            actions: IndexMap::new(),
            id_field: "id".to_string(),
        }
    }
}

impl ModelConfig {
    /// Create an empty configuration with id field `id`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a to-one relation to `target` under `alias`.
    pub fn has_one(
        self,
        target: impl Into<String>,
        alias: impl Into<String>,
        relation: impl Into<RelationConfig>,
    ) -> Self {
        self.relation(Cardinality::One, target, alias, relation)
    }

    /// Declare a to-many relation to `target` under `alias`.
    pub fn has_many(
        self,
        target: impl Into<String>,
        alias: impl Into<String>,
        relation: impl Into<RelationConfig>,
    ) -> Self {
        self.relation(Cardinality::Many, target, alias, relation)
    }

    fn relation(
        mut self,
        cardinality: Cardinality,
        target: impl Into<String>,
        alias: impl Into<String>,
        relation: impl Into<RelationConfig>,
    ) -> Self {
        let descriptor = relation.into().into_descriptor(cardinality, target);
        self.relations.insert(alias.into(), descriptor);
        self
    }

    /// Replace all custom actions.
    pub fn custom_actions<K, I>(mut self, actions: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, CustomAction)>,
    {
        self.actions = actions.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self
    }

    /// Declare one custom action.
    pub fn custom_action(
        mut self,
        name: impl Into<String>,
        method: HttpMethod,
        path: impl Into<String>,
    ) -> Self {
        self.actions
            .insert(name.into(), CustomAction::new(method, path));
        self
    }

    /// Set the field that identifies entities of this model.
    pub fn set_id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    /// Declared relations, by alias.
    pub fn relations(&self) -> &IndexMap<String, RelationDescriptor> {
        &self.relations
    }

    /// Declared custom actions, by name.
    pub fn actions(&self) -> &IndexMap<String, CustomAction> {
        &self.actions
    }

    /// The id field.
    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    /// Reject relation combinations that cannot be fetched.
    pub fn validate(&self, model: &str) -> RestResult<()> {
        for (alias, relation) in &self.relations {
            if relation.fetch_strategy == FetchStrategy::Combined
                && relation.using == UsingOperation::Get
            {
                return Err(RestError::invalid_relation(
                    model,
                    alias,
                    "combined fetching requires using \"query\"",
                )
                .with_suggestion("Use fetchMode \"exclusive\" with using \"get\""));
            }
        }
        if self.id_field.is_empty() {
            return Err(RestError::configuration(format!(
                "model \"{}\" has an empty id field",
                model
            )));
        }
        Ok(())
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        IndexMap<String, RelationDescriptor>,
        IndexMap<String, CustomAction>,
        String,
    ) {
        (self.relations, self.actions, self.id_field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relations::RelationOptions;

    #[test]
    fn test_relations_keep_declaration_order() {
        let config = ModelConfig::new()
            .has_many("Comment", "comments", "articleId")
            .has_one("User", "author", ("id", "authorId"));

        let aliases: Vec<_> = config.relations().keys().cloned().collect();
        assert_eq!(aliases, vec!["comments", "author"]);
        assert_eq!(config.relations()["comments"].target_model, "Comment");
        assert!(config.relations()["comments"].is_many());
    }

    #[test]
    fn test_redeclared_alias_overwrites() {
        let config = ModelConfig::new()
            .has_one("User", "author", ("id", "authorId"))
            .has_one("Member", "author", ("id", "memberId"));

        assert_eq!(config.relations().len(), 1);
        assert_eq!(config.relations()["author"].target_model, "Member");
    }

    #[test]
    fn test_custom_actions_replace() {
        let config = ModelConfig::new()
            .custom_action("publish", HttpMethod::Post, "/:id/publish")
            .custom_actions([("getRepos", CustomAction::new(HttpMethod::Get, "/:id/repos"))]);

        assert_eq!(config.actions().len(), 1);
        assert_eq!(config.actions()["getRepos"].path, "/:id/repos");
    }

    #[test]
    fn test_set_id_field() {
        let config = ModelConfig::new().set_id_field("login");
        assert_eq!(config.id_field(), "login");
    }

    #[test]
    fn test_validate_rejects_combined_get() {
        let config = ModelConfig::new().has_one(
            "Photo",
            "photo",
            RelationOptions::new().using(UsingOperation::Get),
        );
        let err = config.validate("Article").unwrap_err();
        assert!(err.is_validation());

        let config = ModelConfig::new().has_one(
            "Photo",
            "photo",
            RelationOptions::new()
                .using(UsingOperation::Get)
                .fetch_mode(FetchStrategy::Exclusive),
        );
        assert!(config.validate("Article").is_ok());
    }

    #[test]
    fn test_custom_action_deserialize() {
        let action: CustomAction =
            serde_json::from_value(serde_json::json!({"method": "GET", "path": "/:id/repos"}))
                .unwrap();
        assert_eq!(action, CustomAction::new(HttpMethod::Get, "/:id/repos"));
    }
}
