//! Operation descriptor: one server call, not yet executed

use std::collections::BTreeMap;
use std::fmt;

use rango_domain::{RangoError, Result};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

/// Payload of a request.
///
/// Most endpoints take JSON; the bulk-import endpoint takes a pre-rendered
/// raw string (JSON lines), so both forms are first-class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// A JSON document, serialized when the request is sent.
    Json(Value),
    /// An already-rendered payload, sent verbatim.
    Raw(String),
}

impl Body {
    /// Render the payload to the string that goes on the wire.
    pub fn render(&self) -> String {
        match self {
            Self::Json(value) => value.to_string(),
            Self::Raw(raw) => raw.clone(),
        }
    }
}

/// Immutable description of one server call.
///
/// Built by API-surface methods and owned by the caller until handed to an
/// execution context; never mutated after construction (the async context
/// adds its queuing header while it still has exclusive ownership).
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Endpoint path below the database URL prefix, e.g. `/_api/version`.
    pub endpoint: String,
    /// Query parameters, in insertion order.
    pub params: Vec<(String, String)>,
    /// Extra headers, ordered for deterministic rendering.
    pub headers: BTreeMap<String, String>,
    /// Optional payload.
    pub body: Option<Body>,
}

impl Request {
    /// A request with no parameters, headers or payload.
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            params: Vec::new(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// Append one query parameter.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Set one header.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Attach a JSON payload.
    pub fn json<T: Serialize>(mut self, payload: &T) -> Result<Self> {
        let value = serde_json::to_value(payload)
            .map_err(|err| RangoError::Request(format!("payload did not serialize: {err}")))?;
        self.body = Some(Body::Json(value));
        Ok(self)
    }

    /// Attach a pre-rendered payload.
    #[must_use]
    pub fn raw(mut self, body: impl Into<String>) -> Self {
        self.body = Some(Body::Raw(body.into()));
        self
    }

    /// The endpoint path with the query string appended.
    pub fn path_with_query(&self) -> String {
        if self.params.is_empty() {
            return self.endpoint.clone();
        }
        let query: Vec<String> = self
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();
        format!("{}?{}", self.endpoint, query.join("&"))
    }

    /// Render the descriptor as an embedded HTTP/1.1 request string.
    ///
    /// This is the body of one multipart batch part: request line, then
    /// headers, then a blank line and the payload when one is present.
    pub fn to_raw_http(&self) -> String {
        let mut rendered = format!("{} {} HTTP/1.1", self.method, self.path_with_query());
        for (key, value) in &self.headers {
            rendered.push_str("\r\n");
            rendered.push_str(key);
            rendered.push_str(": ");
            rendered.push_str(value);
        }
        if let Some(body) = &self.body {
            rendered.push_str("\r\n\r\n");
            rendered.push_str(&body.render());
        }
        rendered
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path_with_query())
    }
}
