//! Request descriptors and the parameter/URL helpers used to build them.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RestError;

/// HTTP method of a request or custom action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET.
    #[default]
    Get,
    /// POST.
    Post,
    /// PUT.
    Put,
    /// PATCH.
    Patch,
    /// DELETE.
    Delete,
}

impl HttpMethod {
    /// Get the method as an uppercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = RestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            other => Err(RestError::configuration(format!(
                "unsupported HTTP method: {}",
                other
            ))),
        }
    }
}

/// Ordered parameter map used for route placeholders and query strings.
///
/// Values are plain JSON so arrays can be sent as repeated query keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(IndexMap<String, Value>);

impl Params {
    /// Create an empty parameter map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a parameter, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Insert a parameter (builder pattern).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Get a parameter value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Check if a parameter is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over parameters in insertion order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.0.iter()
    }

    /// Add all parameters of `other`, overwriting existing keys.
    pub fn merge(&mut self, other: Params) {
        self.0.extend(other.0);
    }
}

/// Only JSON objects carry parameters; any other value yields an empty map.
impl From<Value> for Params {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => map.into_iter().collect(),
            _ => Self::new(),
        }
    }
}

impl From<serde_json::Map<String, Value>> for Params {
    fn from(map: serde_json::Map<String, Value>) -> Self {
        map.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Params {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl IntoIterator for Params {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A request flowing into the middleware pipeline.
///
/// Ownership moves from stage to stage; a middleware that wants to change the
/// request builds or mutates its own copy and proceeds with it.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    /// HTTP method.
    pub method: HttpMethod,
    /// Absolute URL without the query string.
    pub url: String,
    /// Query string parameters.
    pub query: Params,
    /// JSON payload (for POST/PUT/DELETE).
    pub payload: Option<Value>,
    /// Request headers.
    pub headers: IndexMap<String, String>,
}

impl RequestDescriptor {
    /// Create a request with no query, payload, or headers.
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Params::new(),
            payload: None,
            headers: IndexMap::new(),
        }
    }

    /// Set the query parameters.
    pub fn with_query(mut self, query: Params) -> Self {
        self.query = query;
        self
    }

    /// Set the payload.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Get a header value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// An undecoded HTTP response produced by a transport stage.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: IndexMap<String, String>,
    /// Raw body bytes.
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Create a response with a status and body.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: IndexMap::new(),
            body: body.into(),
        }
    }

    /// Create a JSON response.
    pub fn json(status: u16, value: &Value) -> Self {
        Self::new(status, value.to_string()).with_header("content-type", "application/json")
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Check for a 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Render a parameter value as a URL path segment.
pub fn segment_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Array(items) => items.iter().map(segment_value).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

/// Find the byte offset of the `:key` placeholder in `path`.
///
/// The placeholder must end at a non-identifier character, so `:id` does not
/// match inside `:idx`.
fn placeholder_position(path: &str, key: &str) -> Option<usize> {
    let token = format!(":{}", key);
    let mut offset = 0;
    while let Some(found) = path[offset..].find(&token) {
        let start = offset + found;
        let end = start + token.len();
        let at_boundary = path[end..]
            .chars()
            .next()
            .is_none_or(|c| !(c.is_ascii_alphanumeric() || c == '_'));
        if at_boundary {
            return Some(start);
        }
        offset = start + 1;
    }
    None
}

/// Split `params` between route placeholders and the query string.
///
/// Every param whose name matches a `:name` placeholder in `path` replaces the
/// first occurrence of it; all remaining params are returned as the query.
pub fn resolve_path(path: &str, params: &Params) -> (String, Params) {
    let mut endpoint = path.to_string();
    let mut query = Params::new();
    for (key, value) in params {
        match placeholder_position(&endpoint, key) {
            Some(start) => {
                let end = start + key.len() + 1;
                endpoint.replace_range(start..end, &segment_value(value));
            }
            None => {
                query.insert(key.clone(), value.clone());
            }
        }
    }
    (endpoint, query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_parsing() {
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert_eq!("DELETE".parse::<HttpMethod>().unwrap(), HttpMethod::Delete);
        assert!("TRACE".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn test_resolve_path_moves_unused_params_to_query() {
        let params = Params::from(json!({"id": 1, "size": "thumb"}));
        let (endpoint, query) = resolve_path("/articles/:id", &params);

        assert_eq!(endpoint, "/articles/1");
        assert_eq!(query.len(), 1);
        assert_eq!(query.get("size"), Some(&json!("thumb")));
    }

    #[test]
    fn test_resolve_path_multiple_placeholders() {
        let params = Params::new()
            .with("content_type", "articles")
            .with("content_id", 3)
            .with("media_type", "images");
        let (endpoint, query) = resolve_path("/:content_type/:content_id/media/:media_type", &params);

        assert_eq!(endpoint, "/articles/3/media/images");
        assert!(query.is_empty());
    }

    #[test]
    fn test_placeholder_requires_boundary() {
        let params = Params::new().with("id", 7);
        let (endpoint, query) = resolve_path("/things/:idx", &params);

        assert_eq!(endpoint, "/things/:idx");
        assert_eq!(query.get("id"), Some(&json!(7)));
    }

    #[test]
    fn test_unfilled_placeholder_is_kept() {
        let (endpoint, query) = resolve_path("/models/:id", &Params::new());
        assert_eq!(endpoint, "/models/:id");
        assert!(query.is_empty());
    }

    #[test]
    fn test_params_from_non_object_is_empty() {
        assert!(Params::from(json!([1, 2])).is_empty());
        assert!(Params::from(Value::Null).is_empty());
    }

    #[test]
    fn test_request_descriptor_builder() {
        let request = RequestDescriptor::new(HttpMethod::Post, "http://localhost/articles")
            .with_payload(json!({"title": "x"}))
            .with_header("x-info", "Info ...");

        assert_eq!(request.header("x-info"), Some("Info ..."));
        assert_eq!(request.payload, Some(json!({"title": "x"})));
        assert!(request.query.is_empty());
    }

    #[test]
    fn test_raw_response_json() {
        let response = RawResponse::json(201, &json!({"id": 4}));
        assert!(response.is_success());
        assert_eq!(response.body, br#"{"id":4}"#.to_vec());
    }
}
