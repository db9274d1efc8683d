//! Graph handle: named-graph structure and vertex/edge operations

use rango_domain::{DocumentMeta, GraphInfo, RangoError, Result};
use reqwest::Method;
use serde_json::{json, Value};

use crate::exec::{handler, ExecutionContext};
use crate::request::Request;

/// Handle to one named graph, generic over the execution mode.
#[derive(Debug, Clone)]
pub struct Graph<C> {
    ctx: C,
    name: String,
}

impl<C: ExecutionContext> Graph<C> {
    pub(crate) fn new(ctx: C, name: impl Into<String>) -> Self {
        Self { ctx, name: name.into() }
    }

    /// Name of this graph.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Structure of the graph: edge definitions and orphan collections.
    pub async fn properties(&self) -> Result<C::Handle<GraphInfo>> {
        let request = Request::new(Method::GET, format!("/_api/gharial/{}", self.name));
        self.ctx
            .handle_request(
                request,
                handler(|res| {
                    if !res.is_success() {
                        return Err(RangoError::Api(res.fault()));
                    }
                    res.decode_field::<GraphInfo>("graph")
                }),
            )
            .await
    }

    /// Names of the vertex collections used by the graph.
    pub async fn vertex_collections(&self) -> Result<C::Handle<Vec<String>>> {
        let request = Request::new(Method::GET, format!("/_api/gharial/{}/vertex", self.name));
        self.ctx
            .handle_request(
                request,
                handler(|res| {
                    if !res.is_success() {
                        return Err(RangoError::Api(res.fault()));
                    }
                    res.decode_field::<Vec<String>>("collections")
                }),
            )
            .await
    }

    /// Register an additional vertex collection with the graph.
    pub async fn create_vertex_collection(&self, name: &str) -> Result<C::Handle<GraphInfo>> {
        let request = Request::new(Method::POST, format!("/_api/gharial/{}/vertex", self.name))
            .json(&json!({ "collection": name }))?;
        self.ctx
            .handle_request(
                request,
                handler(|res| {
                    if !res.is_success() {
                        return Err(RangoError::Api(res.fault()));
                    }
                    res.decode_field::<GraphInfo>("graph")
                }),
            )
            .await
    }

    /// Insert a vertex into one of the graph's vertex collections.
    pub async fn insert_vertex(
        &self,
        collection: &str,
        document: &Value,
    ) -> Result<C::Handle<DocumentMeta>> {
        let request = Request::new(
            Method::POST,
            format!("/_api/gharial/{}/vertex/{collection}", self.name),
        )
        .json(document)?;
        self.ctx
            .handle_request(
                request,
                handler(|res| {
                    if !res.is_success() {
                        return Err(RangoError::Api(res.fault()));
                    }
                    res.decode_field::<DocumentMeta>("vertex")
                }),
            )
            .await
    }

    /// Fetch a vertex by key; `None` when it does not exist.
    pub async fn vertex(
        &self,
        collection: &str,
        key: &str,
    ) -> Result<C::Handle<Option<Value>>> {
        let request = Request::new(
            Method::GET,
            format!("/_api/gharial/{}/vertex/{collection}/{key}", self.name),
        );
        self.ctx
            .handle_request(
                request,
                handler(|res| match res.status_code {
                    404 => Ok(None),
                    _ if res.is_success() => res.decode_field::<Value>("vertex").map(Some),
                    _ => Err(RangoError::Api(res.fault())),
                }),
            )
            .await
    }

    /// Remove a vertex by key, tolerating a missing one when asked to.
    pub async fn remove_vertex(
        &self,
        collection: &str,
        key: &str,
        ignore_missing: bool,
    ) -> Result<C::Handle<bool>> {
        let request = Request::new(
            Method::DELETE,
            format!("/_api/gharial/{}/vertex/{collection}/{key}", self.name),
        );
        self.ctx
            .handle_request(
                request,
                handler(move |res| match res.status_code {
                    404 if ignore_missing => Ok(false),
                    _ if res.is_success() => Ok(true),
                    _ => Err(RangoError::Api(res.fault())),
                }),
            )
            .await
    }

    /// Insert an edge from `from` to `to` into one of the graph's edge
    /// collections. Extra attributes ride along in `document`.
    pub async fn insert_edge(
        &self,
        collection: &str,
        from: &str,
        to: &str,
        document: &Value,
    ) -> Result<C::Handle<DocumentMeta>> {
        let mut body = document.clone();
        if !body.is_object() {
            return Err(RangoError::Request("edge document must be a JSON object".into()));
        }
        body["_from"] = Value::String(from.to_string());
        body["_to"] = Value::String(to.to_string());
        let request = Request::new(
            Method::POST,
            format!("/_api/gharial/{}/edge/{collection}", self.name),
        )
        .json(&body)?;
        self.ctx
            .handle_request(
                request,
                handler(|res| {
                    if !res.is_success() {
                        return Err(RangoError::Api(res.fault()));
                    }
                    res.decode_field::<DocumentMeta>("edge")
                }),
            )
            .await
    }

    /// Fetch an edge by key; `None` when it does not exist.
    pub async fn edge(&self, collection: &str, key: &str) -> Result<C::Handle<Option<Value>>> {
        let request = Request::new(
            Method::GET,
            format!("/_api/gharial/{}/edge/{collection}/{key}", self.name),
        );
        self.ctx
            .handle_request(
                request,
                handler(|res| match res.status_code {
                    404 => Ok(None),
                    _ if res.is_success() => res.decode_field::<Value>("edge").map(Some),
                    _ => Err(RangoError::Api(res.fault())),
                }),
            )
            .await
    }

    /// Remove an edge by key, tolerating a missing one when asked to.
    pub async fn remove_edge(
        &self,
        collection: &str,
        key: &str,
        ignore_missing: bool,
    ) -> Result<C::Handle<bool>> {
        let request = Request::new(
            Method::DELETE,
            format!("/_api/gharial/{}/edge/{collection}/{key}", self.name),
        );
        self.ctx
            .handle_request(
                request,
                handler(move |res| match res.status_code {
                    404 if ignore_missing => Ok(false),
                    _ if res.is_success() => Ok(true),
                    _ => Err(RangoError::Api(res.fault())),
                }),
            )
            .await
    }
}
