//! Raw response: what came back over the wire, untouched

use std::collections::BTreeMap;

use rango_domain::{RangoError, Result, ServerFault};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A raw HTTP response, produced only by the transport and the batch
/// demultiplexer, never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP method of the originating request.
    pub method: String,
    /// Full URL of the originating request.
    pub url: String,
    /// HTTP status code.
    pub status_code: u16,
    /// HTTP status text, empty when the server sent none.
    pub status_text: String,
    /// Response headers, lower-cased keys.
    pub headers: BTreeMap<String, String>,
    /// The body exactly as received.
    pub raw_body: String,
    /// The body parsed as JSON, `None` when it is not valid JSON.
    pub body: Option<Value>,
}

impl Response {
    /// Build a response, parsing the body as JSON opportunistically.
    pub fn new(
        method: impl Into<String>,
        url: impl Into<String>,
        status_code: u16,
        status_text: impl Into<String>,
        headers: BTreeMap<String, String>,
        raw_body: String,
    ) -> Self {
        let body = serde_json::from_str(&raw_body).ok();
        Self {
            method: method.into(),
            url: url.into(),
            status_code,
            status_text: status_text.into(),
            headers,
            raw_body,
            body,
        }
    }

    /// Whether the status code is in the 2xx success range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// A header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// The server-reported failure for this response.
    pub fn fault(&self) -> ServerFault {
        ServerFault::from_parts(
            &self.method,
            &self.url,
            self.status_code,
            &self.status_text,
            self.body.as_ref(),
        )
    }

    /// Decode the whole body into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.raw_body)
            .map_err(|err| RangoError::Decode(format!("{} {}: {err}", self.method, self.url)))
    }

    /// Decode one top-level field of the body into `T`.
    pub fn decode_field<T: DeserializeOwned>(&self, field: &str) -> Result<T> {
        let value = self
            .body
            .as_ref()
            .and_then(|body| body.get(field))
            .ok_or_else(|| {
                RangoError::Decode(format!(
                    "{} {}: field `{field}` missing from response body",
                    self.method, self.url
                ))
            })?;
        serde_json::from_value(value.clone())
            .map_err(|err| RangoError::Decode(format!("{} {}: field `{field}`: {err}", self.method, self.url)))
    }
}
