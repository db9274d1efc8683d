//! AQL queries: execute into a cursor, explain, validate

use rango_domain::{CursorPage, QueryInfo, QueryPlan, RangoError, Result};
use reqwest::Method;
use serde_json::{Map, Value};

use crate::cursor::Cursor;
use crate::exec::{handler, ExecutionContext};
use crate::request::Request;

/// One AQL query with its bind parameters and cursor options.
#[derive(Debug, Clone)]
pub struct AqlQuery {
    query: String,
    count: bool,
    batch_size: Option<u64>,
    ttl: Option<u64>,
    bind_vars: Map<String, Value>,
    full_count: Option<bool>,
}

impl AqlQuery {
    /// A query with default options: no count, server-chosen batch size.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            count: false,
            batch_size: None,
            ttl: None,
            bind_vars: Map::new(),
            full_count: None,
        }
    }

    /// Bind one parameter.
    #[must_use]
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bind_vars.insert(name.into(), value.into());
        self
    }

    /// Ask the server to report the total row count.
    #[must_use]
    pub fn count(mut self, count: bool) -> Self {
        self.count = count;
        self
    }

    /// Maximum number of rows per round trip.
    #[must_use]
    pub fn batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Server-side cursor time-to-live in seconds.
    #[must_use]
    pub fn ttl(mut self, ttl: u64) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Include the count before the last LIMIT in the statistics.
    #[must_use]
    pub fn full_count(mut self, full_count: bool) -> Self {
        self.full_count = Some(full_count);
        self
    }

    fn body(&self) -> Value {
        let mut body = Map::new();
        body.insert("query".into(), Value::String(self.query.clone()));
        body.insert("count".into(), Value::Bool(self.count));
        if let Some(batch_size) = self.batch_size {
            body.insert("batchSize".into(), batch_size.into());
        }
        if let Some(ttl) = self.ttl {
            body.insert("ttl".into(), ttl.into());
        }
        if !self.bind_vars.is_empty() {
            body.insert("bindVars".into(), Value::Object(self.bind_vars.clone()));
        }
        if let Some(full_count) = self.full_count {
            body.insert("options".into(), serde_json::json!({ "fullCount": full_count }));
        }
        Value::Object(body)
    }
}

/// Entry point for AQL operations, generic over the execution mode.
#[derive(Debug, Clone)]
pub struct Query<C> {
    ctx: C,
}

impl<C: ExecutionContext> Query<C> {
    pub(crate) fn new(ctx: C) -> Self {
        Self { ctx }
    }

    /// Execute the query; the result is consumed through a [`Cursor`].
    pub async fn execute(&self, query: AqlQuery) -> Result<C::Handle<Cursor>> {
        let request = Request::new(Method::POST, "/_api/cursor").json(&query.body())?;
        let conn = self.ctx.connection().clone();
        self.ctx
            .handle_request(
                request,
                handler(move |res| {
                    if !res.is_success() {
                        return Err(RangoError::Api(res.fault()));
                    }
                    let page: CursorPage = res.decode()?;
                    Ok(Cursor::new(conn.clone(), page))
                }),
            )
            .await
    }

    /// Inspect the query and return the optimal execution plan without
    /// running it.
    pub async fn explain(&self, query: &str) -> Result<C::Handle<QueryPlan>> {
        let request = Request::new(Method::POST, "/_api/explain")
            .json(&serde_json::json!({ "query": query, "options": { "allPlans": false } }))?;
        self.ctx
            .handle_request(
                request,
                handler(|res| {
                    if !res.is_success() {
                        return Err(RangoError::Api(res.fault()));
                    }
                    res.decode_field::<QueryPlan>("plan")
                }),
            )
            .await
    }

    /// Parse the query without executing it.
    pub async fn validate(&self, query: &str) -> Result<C::Handle<QueryInfo>> {
        let request = Request::new(Method::POST, "/_api/query")
            .json(&serde_json::json!({ "query": query }))?;
        self.ctx
            .handle_request(
                request,
                handler(|res| {
                    if !res.is_success() {
                        return Err(RangoError::Api(res.fault()));
                    }
                    res.decode::<QueryInfo>()
                }),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn body_includes_only_requested_options() {
        let query = AqlQuery::new("FOR u IN users RETURN u");
        let body = query.body();
        assert_eq!(body["query"], "FOR u IN users RETURN u");
        assert_eq!(body["count"], false);
        assert!(body.get("batchSize").is_none());
        assert!(body.get("bindVars").is_none());
        assert!(body.get("options").is_none());
    }

    #[test]
    fn body_carries_bind_vars_and_cursor_options() {
        let query = AqlQuery::new("FOR u IN @@col FILTER u.age > @age RETURN u")
            .bind("@col", "users")
            .bind("age", 42)
            .count(true)
            .batch_size(100)
            .ttl(60)
            .full_count(true);
        let body = query.body();
        assert_eq!(body["count"], true);
        assert_eq!(body["batchSize"], 100);
        assert_eq!(body["ttl"], 60);
        assert_eq!(body["bindVars"], json!({"@col": "users", "age": 42}));
        assert_eq!(body["options"], json!({"fullCount": true}));
    }
}
