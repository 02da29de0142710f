//! Relation loading: fetch related entities for a row set and merge them in.

use std::collections::HashMap;

use futures::future::{self, try_join_all};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, trace};

use super::spec::{FetchStrategy, RelationDescriptor, UsingOperation, row_reference};
use crate::error::{RestError, RestResult};
use crate::middleware::BoxFuture;
use crate::request::Params;

/// Source of related entities.
///
/// The loader never talks to models directly; it resolves target models by
/// name through this trait on every load.
pub trait RelationFetcher: Send + Sync {
    /// Check if a target model is known.
    fn has_model(&self, name: &str) -> bool;

    /// Fetch a collection of `target` entities.
    fn query<'a>(
        &'a self,
        target: &'a str,
        params: Params,
        relation: &'a str,
    ) -> BoxFuture<'a, RestResult<Vec<Value>>>;

    /// Fetch a single `target` entity; `null` when there is none.
    fn get<'a>(
        &'a self,
        target: &'a str,
        params: Params,
        relation: &'a str,
    ) -> BoxFuture<'a, RestResult<Value>>;
}

/// What one relation fetched for the whole row set.
enum Fetched {
    /// Combined fetch, grouped by foreign field value.
    Grouped(HashMap<String, Vec<Value>>),
    /// Exclusive fetch, one slot per row; `None` for rows that were skipped.
    PerRow(Vec<Option<Value>>),
}

/// Loads the relations of one model.
pub struct RelationLoader<'a, F: RelationFetcher> {
    model: &'a str,
    id_field: &'a str,
    relations: &'a IndexMap<String, RelationDescriptor>,
    fetcher: F,
}

impl<'a, F: RelationFetcher> RelationLoader<'a, F> {
    /// Create a loader for `model`'s relations.
    pub fn new(
        model: &'a str,
        id_field: &'a str,
        relations: &'a IndexMap<String, RelationDescriptor>,
        fetcher: F,
    ) -> Self {
        Self {
            model,
            id_field,
            relations,
            fetcher,
        }
    }

    /// Get the fetcher.
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    fn relation(&self, alias: &str) -> RestResult<&'a RelationDescriptor> {
        self.relations
            .get(alias)
            .ok_or_else(|| RestError::undefined_relation(self.model, alias))
    }

    /// Check that every alias names a relation whose target model exists.
    ///
    /// Runs before any request is issued.
    pub fn validate<S: AsRef<str>>(&self, include: &[S]) -> RestResult<()> {
        for alias in include {
            let alias = alias.as_ref();
            let relation = self.relation(alias)?;
            if relation.fetch_strategy == FetchStrategy::Combined
                && relation.using == UsingOperation::Get
            {
                return Err(RestError::invalid_relation(
                    self.model,
                    alias,
                    "combined fetching requires using \"query\"",
                ));
            }
            if !self.fetcher.has_model(&relation.target_model) {
                return Err(
                    RestError::undefined_model(&relation.target_model).with_relation(alias)
                );
            }
        }
        Ok(())
    }

    /// Fetch every included relation for `rows` and store the result in each
    /// row under the relation alias.
    ///
    /// All fetches run concurrently; the first failure aborts the load and
    /// leaves `rows` untouched.
    pub async fn load<S: AsRef<str>>(&self, rows: &mut [Value], include: &[S]) -> RestResult<()> {
        let mut aliases: Vec<&str> = Vec::with_capacity(include.len());
        for alias in include {
            if !aliases.contains(&alias.as_ref()) {
                aliases.push(alias.as_ref());
            }
        }
        if aliases.is_empty() {
            return Ok(());
        }
        self.validate(&aliases)?;
        if rows.is_empty() {
            return Ok(());
        }

        let mut local_values: HashMap<&str, Vec<Value>> = HashMap::new();
        let mut fetches = Vec::with_capacity(aliases.len());
        for &alias in &aliases {
            let relation = self.relation(alias)?;
            let fetch: BoxFuture<'_, RestResult<Fetched>> = match relation.fetch_strategy {
                FetchStrategy::Combined => {
                    let values = local_values
                        .entry(relation.local_field.as_str())
                        .or_insert_with(|| collect_field(rows, &relation.local_field))
                        .clone();
                    if values.is_empty() {
                        // An empty filter would fetch the whole collection.
                        trace!(model = self.model, relation = alias, "No local values, skipping fetch");
                        Box::pin(future::ready(Ok(Fetched::Grouped(HashMap::new()))))
                    } else {
                        self.fetch_combined(alias, relation, values)
                    }
                }
                FetchStrategy::Exclusive => self.fetch_exclusive(alias, relation, rows),
            };
            fetches.push(fetch);
        }

        debug!(
            model = self.model,
            relations = aliases.len(),
            rows = rows.len(),
            "Loading relations"
        );
        let fetched = try_join_all(fetches).await?;

        for (index, row) in rows.iter_mut().enumerate() {
            let Some(object) = row.as_object_mut() else {
                continue;
            };
            for (&alias, fetched) in aliases.iter().zip(&fetched) {
                let relation = self.relation(alias)?;
                let merged = match fetched {
                    Fetched::Grouped(groups) => {
                        let matches = object
                            .get(&relation.local_field)
                            .and_then(match_key)
                            .and_then(|key| groups.get(&key))
                            .cloned()
                            .unwrap_or_default();
                        relation.cardinality.shape(matches)
                    }
                    Fetched::PerRow(results) => {
                        shape_exclusive(relation, results.get(index).cloned().flatten())
                    }
                };
                object.insert(alias.to_string(), merged);
            }
        }

        Ok(())
    }

    fn fetch_combined<'s>(
        &'s self,
        alias: &'s str,
        relation: &'s RelationDescriptor,
        values: Vec<Value>,
    ) -> BoxFuture<'s, RestResult<Fetched>> {
        let mut params = relation.literal_params();
        params.insert(relation.filter_param(), Value::Array(values));
        trace!(
            model = self.model,
            relation = alias,
            target_model = %relation.target_model,
            "Combined relation fetch"
        );

        let request = self.fetcher.query(&relation.target_model, params, alias);
        Box::pin(async move {
            let related = request.await?;
            Ok(Fetched::Grouped(group_by(related, &relation.foreign_field)))
        })
    }

    fn fetch_exclusive<'s>(
        &'s self,
        alias: &'s str,
        relation: &'s RelationDescriptor,
        rows: &[Value],
    ) -> BoxFuture<'s, RestResult<Fetched>> {
        let per_row: Vec<BoxFuture<'s, RestResult<Option<Value>>>> = rows
            .iter()
            .map(move |row| -> BoxFuture<'s, RestResult<Option<Value>>> {
                if row.get(self.id_field).and_then(match_key).is_none() {
                    return Box::pin(future::ready(Ok(None)));
                }
                let params = process_params(&relation.fixed_params, row);
                match relation.using {
                    UsingOperation::Query => {
                        let request = self.fetcher.query(&relation.target_model, params, alias);
                        Box::pin(async move { Ok(Some(Value::Array(request.await?))) })
                    }
                    UsingOperation::Get => {
                        let request = self.fetcher.get(&relation.target_model, params, alias);
                        Box::pin(async move { Ok(Some(request.await?)) })
                    }
                }
            })
            .collect();
        trace!(
            model = self.model,
            relation = alias,
            target_model = %relation.target_model,
            requests = per_row.len(),
            "Exclusive relation fetch"
        );

        Box::pin(async move { Ok(Fetched::PerRow(try_join_all(per_row).await?)) })
    }
}

fn shape_exclusive(relation: &RelationDescriptor, result: Option<Value>) -> Value {
    let matches = match (relation.using, result) {
        (_, None) | (UsingOperation::Get, Some(Value::Null)) => Vec::new(),
        (UsingOperation::Query, Some(Value::Array(items))) => items,
        (_, Some(entity)) => vec![entity],
    };
    relation.cardinality.shape(matches)
}

/// Substitute `"@field"` template values with the row's value of `field`.
///
/// References to fields the row lacks are kept literally; other values are
/// copied unchanged.
pub fn process_params(template: &Params, row: &Value) -> Params {
    template
        .iter()
        .map(|(key, value)| {
            let resolved = row_reference(value)
                .and_then(|field| row.get(field))
                .unwrap_or(value);
            (key.clone(), resolved.clone())
        })
        .collect()
}

/// Canonical key used to match local and foreign field values.
///
/// Strings match as-is and numbers by their integer form when they have one,
/// so `"3"`, `3` and `3.0` all meet. `null`, arrays and objects never match.
pub fn match_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else {
                n.as_f64().map(|f| {
                    if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 {
                        (f as i64).to_string()
                    } else {
                        f.to_string()
                    }
                })
            }
        }
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Values of `field` across `rows`, in row order, duplicates kept.
fn collect_field(rows: &[Value], field: &str) -> Vec<Value> {
    rows.iter()
        .filter_map(|row| row.get(field))
        .filter(|value| !value.is_null())
        .cloned()
        .collect()
}

/// Group entities by their `field` value, preserving response order.
pub fn group_by(entities: Vec<Value>, field: &str) -> HashMap<String, Vec<Value>> {
    let mut groups: HashMap<String, Vec<Value>> = HashMap::new();
    for entity in entities {
        if let Some(key) = entity.get(field).and_then(match_key) {
            groups.entry(key).or_default().push(entity);
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relations::{Cardinality, RelationConfig, RelationOptions};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq)]
    struct Call {
        op: &'static str,
        target: String,
        params: Params,
    }

    #[derive(Default)]
    struct MockFetcher {
        models: Vec<&'static str>,
        collections: HashMap<&'static str, Vec<Value>>,
        entities: HashMap<String, Value>,
        calls: Mutex<Vec<Call>>,
        fail: bool,
    }

    impl MockFetcher {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().clone()
        }
    }

    impl RelationFetcher for MockFetcher {
        fn has_model(&self, name: &str) -> bool {
            self.models.contains(&name)
        }

        fn query<'a>(
            &'a self,
            target: &'a str,
            params: Params,
            _relation: &'a str,
        ) -> BoxFuture<'a, RestResult<Vec<Value>>> {
            self.calls.lock().push(Call {
                op: "query",
                target: target.to_string(),
                params,
            });
            let result = if self.fail {
                Err(RestError::transport("connection refused"))
            } else {
                Ok(self.collections.get(target).cloned().unwrap_or_default())
            };
            Box::pin(async move { result })
        }

        fn get<'a>(
            &'a self,
            target: &'a str,
            params: Params,
            _relation: &'a str,
        ) -> BoxFuture<'a, RestResult<Value>> {
            let id = params.get("id").and_then(match_key).unwrap_or_default();
            self.calls.lock().push(Call {
                op: "get",
                target: target.to_string(),
                params,
            });
            let entity = self.entities.get(&id).cloned().unwrap_or(Value::Null);
            Box::pin(async move { Ok(entity) })
        }
    }

    fn relations() -> IndexMap<String, RelationDescriptor> {
        let mut relations = IndexMap::new();
        relations.insert(
            "author".to_string(),
            RelationConfig::from(("id", "authorId")).into_descriptor(Cardinality::One, "User"),
        );
        relations.insert(
            "comments".to_string(),
            RelationConfig::from("articleId").into_descriptor(Cardinality::Many, "Comment"),
        );
        relations.insert(
            "photo".to_string(),
            RelationConfig::from(
                RelationOptions::new()
                    .using(UsingOperation::Get)
                    .fetch_mode(FetchStrategy::Exclusive)
                    .param("id", "@photoId"),
            )
            .into_descriptor(Cardinality::One, "Photo"),
        );
        relations
    }

    fn articles() -> Vec<Value> {
        vec![
            json!({"id": 1, "authorId": 10, "photoId": 100}),
            json!({"id": 2, "authorId": 11, "photoId": 101}),
            json!({"id": 3, "authorId": 10}),
        ]
    }

    fn fetcher() -> MockFetcher {
        let mut fetcher = MockFetcher {
            models: vec!["User", "Comment", "Photo"],
            ..Default::default()
        };
        fetcher
            .collections
            .insert("User", vec![json!({"id": 10, "name": "Ann"})]);
        fetcher.collections.insert(
            "Comment",
            vec![
                json!({"id": 7, "articleId": 1}),
                json!({"id": 8, "articleId": 3}),
                json!({"id": 9, "articleId": 1}),
            ],
        );
        fetcher
            .entities
            .insert("100".to_string(), json!({"id": 100, "url": "a.png"}));
        fetcher
    }

    #[test]
    fn test_match_key() {
        assert_eq!(match_key(&json!("a")), Some("a".to_string()));
        assert_eq!(match_key(&json!(0)), Some("0".to_string()));
        assert_eq!(match_key(&json!(3.0)), Some("3".to_string()));
        assert_eq!(match_key(&json!(true)), Some("true".to_string()));
        assert_eq!(match_key(&Value::Null), None);
        assert_eq!(match_key(&json!({"id": 1})), None);
    }

    #[test]
    fn test_process_params() {
        let template = Params::new()
            .with("content_type", "articles")
            .with("content_id", "@id")
            .with("media", "@missing");
        let processed = process_params(&template, &json!({"id": 2}));

        assert_eq!(processed.get("content_type"), Some(&json!("articles")));
        assert_eq!(processed.get("content_id"), Some(&json!(2)));
        assert_eq!(processed.get("media"), Some(&json!("@missing")));
    }

    #[test]
    fn test_group_by_preserves_order() {
        let groups = group_by(
            vec![
                json!({"id": 7, "articleId": 1}),
                json!({"id": 8}),
                json!({"id": 9, "articleId": "1"}),
            ],
            "articleId",
        );
        assert_eq!(groups.len(), 1);
        assert_eq!(groups["1"], vec![json!({"id": 7, "articleId": 1}), json!({"id": 9, "articleId": "1"})]);
    }

    #[test]
    fn test_validate_unknown_alias() {
        let relations = relations();
        let loader = RelationLoader::new("Article", "id", &relations, fetcher());
        let err = loader.validate(&["tags"]).unwrap_err();
        assert!(err.is_undefined_relation());
    }

    #[test]
    fn test_validate_unknown_target() {
        let relations = relations();
        let fetcher = MockFetcher {
            models: vec!["Comment"],
            ..Default::default()
        };
        let loader = RelationLoader::new("Article", "id", &relations, fetcher);
        let err = loader.validate(&["author"]).unwrap_err();
        assert!(err.is_undefined_model());
    }

    #[tokio::test]
    async fn test_combined_has_one() {
        let relations = relations();
        let loader = RelationLoader::new("Article", "id", &relations, fetcher());
        let mut rows = articles();

        loader.load(&mut rows, &["author"]).await.unwrap();

        assert_eq!(rows[0]["author"], json!({"id": 10, "name": "Ann"}));
        assert_eq!(rows[1]["author"], Value::Null);
        assert_eq!(rows[2]["author"], json!({"id": 10, "name": "Ann"}));

        let calls = loader.fetcher().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].params.get("id[]"), Some(&json!([10, 11, 10])));
    }

    #[tokio::test]
    async fn test_combined_has_many() {
        let relations = relations();
        let loader = RelationLoader::new("Article", "id", &relations, fetcher());
        let mut rows = articles();

        loader.load(&mut rows, &["comments"]).await.unwrap();

        assert_eq!(
            rows[0]["comments"],
            json!([{"id": 7, "articleId": 1}, {"id": 9, "articleId": 1}])
        );
        assert_eq!(rows[1]["comments"], json!([]));
        assert_eq!(rows[2]["comments"], json!([{"id": 8, "articleId": 3}]));
    }

    #[tokio::test]
    async fn test_exclusive_get_once_per_row() {
        let relations = relations();
        let loader = RelationLoader::new("Article", "id", &relations, fetcher());
        let mut rows = articles();

        loader.load(&mut rows, &["photo"]).await.unwrap();

        assert_eq!(rows[0]["photo"], json!({"id": 100, "url": "a.png"}));
        assert_eq!(rows[1]["photo"], Value::Null);
        assert_eq!(rows[2]["photo"], Value::Null);

        let calls = loader.fetcher().calls();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|c| c.op == "get" && c.target == "Photo"));
        assert_eq!(calls[2].params.get("id"), Some(&json!("@photoId")));
    }

    #[tokio::test]
    async fn test_rows_without_id_skip_exclusive_fetch() {
        let relations = relations();
        let loader = RelationLoader::new("Article", "id", &relations, fetcher());
        let mut rows = vec![json!({"photoId": 100}), json!({"id": 0, "photoId": 100})];

        loader.load(&mut rows, &["photo"]).await.unwrap();

        assert_eq!(rows[0]["photo"], Value::Null);
        assert_eq!(rows[1]["photo"], json!({"id": 100, "url": "a.png"}));
        assert_eq!(loader.fetcher().calls().len(), 1);
    }

    #[tokio::test]
    async fn test_local_values_collected_once_per_field() {
        let mut relations = relations();
        relations.insert(
            "reviews".to_string(),
            RelationConfig::from(
                RelationOptions::new()
                    .foreign_field("articleId")
                    .param("kind", "review"),
            )
            .into_descriptor(Cardinality::Many, "Comment"),
        );
        let loader = RelationLoader::new("Article", "id", &relations, fetcher());
        let mut rows = articles();

        loader.load(&mut rows, &["comments", "reviews", "comments"]).await.unwrap();

        let calls = loader.fetcher().calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].params.get("articleId[]"), Some(&json!([1, 2, 3])));
        assert_eq!(calls[1].params.get("kind"), Some(&json!("review")));
        assert_eq!(calls[1].params.get("articleId[]"), Some(&json!([1, 2, 3])));
    }

    #[tokio::test]
    async fn test_failure_leaves_rows_untouched() {
        let relations = relations();
        let fetcher = MockFetcher {
            fail: true,
            ..fetcher()
        };
        let loader = RelationLoader::new("Article", "id", &relations, fetcher);
        let mut rows = articles();

        let err = loader.load(&mut rows, &["author", "comments"]).await.unwrap_err();

        assert!(err.is_transport());
        assert_eq!(rows, articles());
    }

    #[tokio::test]
    async fn test_rows_without_local_values_skip_combined_fetch() {
        let relations = relations();
        let loader = RelationLoader::new("Article", "id", &relations, fetcher());
        let mut rows = vec![json!({"id": 1}), json!({"id": 2, "authorId": null})];

        loader.load(&mut rows, &["author", "comments"]).await.unwrap();

        let calls = loader.fetcher().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].target, "Comment");
        assert_eq!(rows[0]["author"], Value::Null);
        assert_eq!(rows[1]["author"], Value::Null);
        assert_eq!(rows[0]["comments"], json!([{"id": 7, "articleId": 1}, {"id": 9, "articleId": 1}]));
        assert_eq!(rows[1]["comments"], json!([]));
    }

    #[tokio::test]
    async fn test_empty_rows_issue_no_requests() {
        let relations = relations();
        let loader = RelationLoader::new("Article", "id", &relations, fetcher());
        let mut rows: Vec<Value> = Vec::new();

        loader.load(&mut rows, &["author"]).await.unwrap();
        assert!(loader.fetcher().calls().is_empty());
    }
}
