//! Relation descriptor types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::request::Params;

/// How many related entities a relation yields per row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    /// A single related entity or `null` (`has_one`).
    One,
    /// An ordered sequence of related entities (`has_many`).
    Many,
}

impl Cardinality {
    /// Check if this relation returns multiple entities.
    pub fn is_many(&self) -> bool {
        matches!(self, Self::Many)
    }

    /// Shape matched entities into the merged field value.
    ///
    /// `Many` keeps the sequence; `One` takes the first match or `null`.
    pub fn shape(&self, matches: Vec<Value>) -> Value {
        match self {
            Self::Many => Value::Array(matches),
            Self::One => matches.into_iter().next().unwrap_or(Value::Null),
        }
    }
}

/// How related entities are fetched for a row set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStrategy {
    /// One request for all rows, filtered by `<foreignField>[]`.
    #[default]
    Combined,
    /// One request per row.
    Exclusive,
}

/// Which target model operation fetches related entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsingOperation {
    /// Collection fetch.
    #[default]
    Query,
    /// Single-entity fetch; only valid with [`FetchStrategy::Exclusive`].
    Get,
}

/// Normalized, immutable description of one relation.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationDescriptor {
    /// One or many.
    pub cardinality: Cardinality,
    /// Name of the target model, resolved in the registry on every use.
    pub target_model: String,
    /// Field on related entities that is matched against the local value.
    pub foreign_field: String,
    /// Field on primary rows that holds the local value.
    pub local_field: String,
    /// Combined or exclusive fetching.
    pub fetch_strategy: FetchStrategy,
    /// Query or get.
    pub using: UsingOperation,
    /// Fixed params; values of the form `"@field"` are taken from the row.
    pub fixed_params: Params,
}

impl RelationDescriptor {
    /// Create a combined/query relation joining `foreign_field` to `local_field`.
    pub fn new(
        cardinality: Cardinality,
        target_model: impl Into<String>,
        foreign_field: impl Into<String>,
        local_field: impl Into<String>,
    ) -> Self {
        Self {
            cardinality,
            target_model: target_model.into(),
            foreign_field: foreign_field.into(),
            local_field: local_field.into(),
            fetch_strategy: FetchStrategy::Combined,
            using: UsingOperation::Query,
            fixed_params: Params::new(),
        }
    }

    /// Check if this relation returns multiple entities.
    pub fn is_many(&self) -> bool {
        self.cardinality.is_many()
    }

    /// Name of the filter parameter sent by combined fetches.
    pub fn filter_param(&self) -> String {
        format!("{}[]", self.foreign_field)
    }

    /// Fixed params that do not reference row fields.
    pub fn literal_params(&self) -> Params {
        self.fixed_params
            .iter()
            .filter(|(_, value)| row_reference(value).is_none())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

/// Field name referenced by an `"@field"` template value.
pub(crate) fn row_reference(value: &Value) -> Option<&str> {
    value.as_str().and_then(|s| s.strip_prefix('@'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cardinality_shape() {
        let matches = vec![json!({"id": 10}), json!({"id": 11})];
        assert_eq!(Cardinality::Many.shape(matches.clone()), json!([{"id": 10}, {"id": 11}]));
        assert_eq!(Cardinality::One.shape(matches), json!({"id": 10}));
        assert_eq!(Cardinality::One.shape(Vec::new()), Value::Null);
        assert_eq!(Cardinality::Many.shape(Vec::new()), json!([]));
    }

    #[test]
    fn test_descriptor_defaults() {
        let relation = RelationDescriptor::new(Cardinality::Many, "Comment", "articleId", "id");
        assert!(relation.is_many());
        assert_eq!(relation.fetch_strategy, FetchStrategy::Combined);
        assert_eq!(relation.using, UsingOperation::Query);
        assert_eq!(relation.filter_param(), "articleId[]");
    }

    #[test]
    fn test_literal_params_skip_row_references() {
        let mut relation = RelationDescriptor::new(Cardinality::Many, "Media", "id", "id");
        relation.fixed_params = Params::new()
            .with("content_type", "articles")
            .with("content_id", "@id")
            .with("size", "thumb");

        let literal = relation.literal_params();
        assert_eq!(literal.len(), 2);
        assert!(!literal.contains_key("content_id"));
    }

    #[test]
    fn test_strategy_serde_names() {
        assert_eq!(serde_json::to_value(FetchStrategy::Exclusive).unwrap(), json!("exclusive"));
        assert_eq!(
            serde_json::from_value::<UsingOperation>(json!("get")).unwrap(),
            UsingOperation::Get
        );
    }
}
