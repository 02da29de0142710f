//! Fetch middlewares: send requests with reqwest and decode JSON bodies.

use indexmap::IndexMap;
use reqwest::Method;
use restmodel_core::middleware::{
    BoxFuture, Flow, Middleware, MiddlewareResult, Payload, RequestContext, Stage,
};
use restmodel_core::{HttpMethod, Params, RawResponse, RequestDescriptor, RestError};
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::config::HttpConfig;
use crate::error::{HttpError, HttpResult};

/// Build the full request URL, query string included.
///
/// Array values repeat their key as given (`ids[]=1&ids[]=2`); `null`,
/// objects and nested arrays are sent as empty values.
pub fn build_url(url: &str, query: &Params) -> HttpResult<Url> {
    let mut parsed = Url::parse(url).map_err(|e| HttpError::invalid_url(url, e.to_string()))?;
    if query.is_empty() {
        return Ok(parsed);
    }

    {
        let mut pairs = parsed.query_pairs_mut();
        for (key, value) in query {
            match value {
                Value::Array(items) => {
                    for item in items {
                        pairs.append_pair(key, &query_value(item));
                    }
                }
                other => {
                    pairs.append_pair(key, &query_value(other));
                }
            }
        }
    }
    Ok(parsed)
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}

/// The payload to send as a JSON body, if any.
///
/// Empty objects, arrays and strings, as well as `null`, numbers and
/// booleans, send no body.
pub fn json_body(payload: Option<&Value>) -> Option<&Value> {
    payload.filter(|value| match value {
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::String(s) => !s.is_empty(),
        Value::Null | Value::Bool(_) | Value::Number(_) => false,
    })
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

/// Transport middleware: turns a request into a raw response.
///
/// Values other than requests pass through untouched, so a cache placed
/// earlier in the chain can proceed with a body.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    client: reqwest::Client,
    timeout_ms: u64,
}

impl FetchRequest {
    /// Create with a default client.
    pub fn new() -> HttpResult<Self> {
        Self::with_config(&HttpConfig::default())
    }

    /// Create with a client built from `config`.
    pub fn with_config(config: &HttpConfig) -> HttpResult<Self> {
        Ok(Self {
            client: config.build_client()?,
            timeout_ms: u64::try_from(config.timeout.as_millis()).unwrap_or(u64::MAX),
        })
    }

    /// Create around an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            timeout_ms: 0,
        }
    }

    /// Send `request` and collect the response.
    pub async fn send(&self, request: &RequestDescriptor) -> HttpResult<RawResponse> {
        let url = build_url(&request.url, &request.query)?;
        debug!(method = %request.method, url = %url, "HTTP request");

        let mut builder = self.client.request(method(request.method), url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = json_body(request.payload.as_ref()) {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() && self.timeout_ms > 0 {
                HttpError::Timeout(self.timeout_ms)
            } else {
                HttpError::Client(e)
            }
        })?;

        let status = response.status().as_u16();
        let headers: IndexMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();
        trace!(status, bytes = body.len(), "HTTP response");

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

impl Middleware for FetchRequest {
    fn handle<'a>(
        &'a self,
        stage: Stage,
        _ctx: &'a RequestContext,
    ) -> BoxFuture<'a, MiddlewareResult<Flow>> {
        Box::pin(async move {
            let request = match stage.value {
                Payload::Request(request) => request,
                other => return Ok(Flow::proceed_with(other, stage.extra)),
            };
            let response = self.send(&request).await.map_err(RestError::from)?;
            Ok(Flow::proceed(response))
        })
    }

    fn name(&self) -> &'static str {
        "FetchRequest"
    }
}

/// Decode a raw response into its JSON body, whatever the status.
///
/// An empty body decodes to `null`.
pub fn decode_body(response: &RawResponse) -> HttpResult<Value> {
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&response.body).map_err(|e| HttpError::Decode {
        status: response.status,
        message: e.to_string(),
    })
}

/// Decoding middleware: turns a raw response into its parsed JSON body.
///
/// Values other than raw responses pass through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchResponse;

impl FetchResponse {
    /// Create the decoding middleware.
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for FetchResponse {
    fn handle<'a>(
        &'a self,
        stage: Stage,
        _ctx: &'a RequestContext,
    ) -> BoxFuture<'a, MiddlewareResult<Flow>> {
        Box::pin(async move {
            match stage.value {
                Payload::Response(response) => {
                    let body = decode_body(&response).map_err(RestError::from)?;
                    if !response.is_success() {
                        debug!(status = response.status, "Decoded error response body");
                    }
                    Ok(Flow::proceed(body))
                }
                other => Ok(Flow::proceed_with(other, stage.extra)),
            }
        })
    }

    fn name(&self) -> &'static str {
        "FetchResponse"
    }
}
