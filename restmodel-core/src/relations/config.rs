//! Relation declarations as written by callers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::spec::{Cardinality, FetchStrategy, RelationDescriptor, UsingOperation};
use crate::request::Params;

/// Full relation options.
///
/// Deserializes from the camelCase object form, with every key optional:
///
/// ```rust
/// use restmodel_core::relations::{FetchStrategy, RelationOptions, UsingOperation};
///
/// let options: RelationOptions = serde_json::from_value(serde_json::json!({
///     "using": "get",
///     "fetchMode": "exclusive",
///     "params": { "id": "@photoId" }
/// }))
/// .unwrap();
///
/// assert_eq!(options.foreign_field, "id");
/// assert_eq!(options.using, UsingOperation::Get);
/// assert_eq!(options.fetch_mode, FetchStrategy::Exclusive);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelationOptions {
    /// Field on related entities matched against the local value.
    pub foreign_field: String,
    /// Field on primary rows holding the local value.
    pub local_field: String,
    /// Target operation used to fetch.
    pub using: UsingOperation,
    /// Combined or exclusive fetching.
    pub fetch_mode: FetchStrategy,
    /// Fixed params, with `"@field"` row references.
    pub params: Params,
}

impl Default for RelationOptions {
    fn default() -> Self {
        Self {
            foreign_field: "id".to_string(),
            local_field: "id".to_string(),
            using: UsingOperation::Query,
            fetch_mode: FetchStrategy::Combined,
            params: Params::new(),
        }
    }
}

impl RelationOptions {
    /// Create options with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the foreign field.
    pub fn foreign_field(mut self, field: impl Into<String>) -> Self {
        self.foreign_field = field.into();
        self
    }

    /// Set the local field.
    pub fn local_field(mut self, field: impl Into<String>) -> Self {
        self.local_field = field.into();
        self
    }

    /// Set the target operation.
    pub fn using(mut self, using: UsingOperation) -> Self {
        self.using = using;
        self
    }

    /// Set the fetch strategy.
    pub fn fetch_mode(mut self, mode: FetchStrategy) -> Self {
        self.fetch_mode = mode;
        self
    }

    /// Add a fixed param.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key, value);
        self
    }

    /// Replace all fixed params.
    pub fn params(mut self, params: impl Into<Params>) -> Self {
        self.params = params.into();
        self
    }
}

/// The two accepted ways of declaring a relation.
#[derive(Debug, Clone, PartialEq)]
pub enum RelationConfig {
    /// Foreign and local field only; combined query fetching.
    Shorthand {
        /// Field on related entities.
        foreign_field: String,
        /// Field on primary rows.
        local_field: String,
    },
    /// Every option spelled out.
    Full(RelationOptions),
}

impl RelationConfig {
    /// Shorthand declaration joining `foreign_field` to `local_field`.
    pub fn shorthand(foreign_field: impl Into<String>, local_field: impl Into<String>) -> Self {
        Self::Shorthand {
            foreign_field: foreign_field.into(),
            local_field: local_field.into(),
        }
    }

    /// Normalize into a descriptor.
    pub fn into_descriptor(
        self,
        cardinality: Cardinality,
        target_model: impl Into<String>,
    ) -> RelationDescriptor {
        match self {
            Self::Shorthand {
                foreign_field,
                local_field,
            } => RelationDescriptor::new(cardinality, target_model, foreign_field, local_field),
            Self::Full(options) => RelationDescriptor {
                cardinality,
                target_model: target_model.into(),
                foreign_field: options.foreign_field,
                local_field: options.local_field,
                fetch_strategy: options.fetch_mode,
                using: options.using,
                fixed_params: options.params,
            },
        }
    }
}

impl Default for RelationConfig {
    fn default() -> Self {
        Self::shorthand("id", "id")
    }
}

/// A bare field name is the foreign field; the local field is `id`.
impl From<&str> for RelationConfig {
    fn from(foreign_field: &str) -> Self {
        Self::shorthand(foreign_field, "id")
    }
}

impl From<String> for RelationConfig {
    fn from(foreign_field: String) -> Self {
        Self::shorthand(foreign_field, "id")
    }
}

/// `(foreign_field, local_field)`.
impl From<(&str, &str)> for RelationConfig {
    fn from((foreign_field, local_field): (&str, &str)) -> Self {
        Self::shorthand(foreign_field, local_field)
    }
}

impl From<RelationOptions> for RelationConfig {
    fn from(options: RelationOptions) -> Self {
        Self::Full(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_shorthand_forms() {
        let relation = RelationConfig::from("articleId").into_descriptor(Cardinality::Many, "Comment");
        assert_eq!(relation.foreign_field, "articleId");
        assert_eq!(relation.local_field, "id");
        assert_eq!(relation.fetch_strategy, FetchStrategy::Combined);

        let relation =
            RelationConfig::from(("id", "authorId")).into_descriptor(Cardinality::One, "User");
        assert_eq!(relation.foreign_field, "id");
        assert_eq!(relation.local_field, "authorId");
        assert!(!relation.is_many());
    }

    #[test]
    fn test_default_joins_id_to_id() {
        let relation = RelationConfig::default().into_descriptor(Cardinality::One, "Profile");
        assert_eq!(relation.foreign_field, "id");
        assert_eq!(relation.local_field, "id");
    }

    #[test]
    fn test_full_options_normalize() {
        let options = RelationOptions::new()
            .using(UsingOperation::Get)
            .fetch_mode(FetchStrategy::Exclusive)
            .param("id", "@photoId");
        let relation = RelationConfig::from(options).into_descriptor(Cardinality::One, "Photo");

        assert_eq!(relation.using, UsingOperation::Get);
        assert_eq!(relation.fetch_strategy, FetchStrategy::Exclusive);
        assert_eq!(relation.fixed_params.get("id"), Some(&json!("@photoId")));
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: RelationOptions = serde_json::from_value(json!({
            "foreignField": "articleId",
            "params": {"size": "thumb"}
        }))
        .unwrap();

        assert_eq!(options.foreign_field, "articleId");
        assert_eq!(options.local_field, "id");
        assert_eq!(options.using, UsingOperation::Query);
        assert_eq!(options.fetch_mode, FetchStrategy::Combined);
        assert_eq!(options.params.len(), 1);
    }
}
