//! Connection: credentials, target database and the single I/O funnel

use std::collections::BTreeMap;
use std::sync::Arc;

use rango_domain::{ConnectionConfig, RangoError, Result};
use reqwest::Method;
use tracing::debug;

use crate::http::HttpClient;
use crate::request::{Body, Request};
use crate::response::Response;

struct ConnectionInner {
    config: ConnectionConfig,
    url_prefix: String,
    http: HttpClient,
}

/// A handle to one server + database, shared by every execution context.
///
/// Cheap to clone (`Arc` inside) and immutable after construction: the
/// credentials, base URL and target database are fixed, which is what makes
/// sharing a connection across contexts and threads sound.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl Connection {
    /// Build a connection from its configuration. Performs no I/O.
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(config.timeout)
            .max_attempts(config.max_attempts)
            .base_backoff(config.base_backoff)
            .user_agent(concat!("rango/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let url_prefix = config.url_prefix();
        Ok(Self { inner: Arc::new(ConnectionInner { config, url_prefix, http }) })
    }

    /// The same credentials and transport pointed at another database.
    pub fn with_database(&self, database: &str) -> Result<Self> {
        Self::new(self.inner.config.with_database(database))
    }

    /// Name of the database this connection targets.
    pub fn database(&self) -> &str {
        &self.inner.config.database
    }

    /// The URL prefix endpoint paths are appended to.
    pub fn url_prefix(&self) -> &str {
        &self.inner.url_prefix
    }

    /// Execute one operation descriptor against the server.
    ///
    /// The only place in the crate where network I/O happens.
    pub async fn send(&self, request: &Request) -> Result<Response> {
        let url = format!("{}{}", self.inner.url_prefix, request.endpoint);
        let mut builder = self.inner.http.request(request.method.clone(), &url);

        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        builder = builder.basic_auth(
            &self.inner.config.username,
            Some(&self.inner.config.password),
        );
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        match &request.body {
            Some(Body::Json(value)) => {
                if !has_content_type(request) {
                    builder = builder.header("content-type", "application/json");
                }
                builder = builder.body(value.to_string());
            }
            Some(Body::Raw(raw)) => {
                builder = builder.body(raw.clone());
            }
            None => {}
        }

        let response = self.inner.http.send(builder).await?;

        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or_default().to_string();
        let final_url = response.url().to_string();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value.to_str().ok().map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let raw_body = response
            .text()
            .await
            .map_err(|err| RangoError::Network(format!("reading response body: {err}")))?;

        debug!(method = %request.method, url = %final_url, status = status.as_u16(), "round trip");

        Ok(Response::new(
            request.method.as_str(),
            final_url,
            status.as_u16(),
            status_text,
            headers,
            raw_body,
        ))
    }

    /// `GET` an endpoint with no payload.
    pub(crate) async fn get(&self, endpoint: &str) -> Result<Response> {
        self.send(&Request::new(Method::GET, endpoint)).await
    }

    /// `PUT` an endpoint with no payload.
    pub(crate) async fn put(&self, endpoint: &str) -> Result<Response> {
        self.send(&Request::new(Method::PUT, endpoint)).await
    }

    /// `DELETE` an endpoint with no payload.
    pub(crate) async fn delete(&self, endpoint: &str) -> Result<Response> {
        self.send(&Request::new(Method::DELETE, endpoint)).await
    }
}

fn has_content_type(request: &Request) -> bool {
    request.headers.keys().any(|key| key.eq_ignore_ascii_case("content-type"))
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("url_prefix", &self.inner.url_prefix)
            .field("username", &self.inner.config.username)
            .finish_non_exhaustive()
    }
}
