//! Database handle: collection/graph management and mode switching

use rango_domain::{CollectionInfo, DatabaseProperties, EdgeDefinition, GraphInfo, RangoError, Result};
use reqwest::Method;
use serde_json::json;

use crate::collection::Collection;
use crate::connection::Connection;
use crate::exec::{handler, AsyncExecution, BatchExecution, ExecutionContext, StandardExecution};
use crate::graph::Graph;
use crate::query::Query;
use crate::request::Request;

/// Options for creating a collection.
#[derive(Debug, Clone, Default)]
pub struct CollectionOptions {
    /// Create an edge collection instead of a document collection.
    pub edge: bool,
    /// Wait for writes to sync to disk before returning.
    pub wait_for_sync: bool,
    /// Create a system collection.
    pub is_system: bool,
    /// Maximal journal size in bytes.
    pub journal_size: Option<u64>,
}

/// Handle to one database, generic over the execution mode.
///
/// The execution context is an explicit constructor parameter: which of the
/// three modes a handle runs in is visible at the call site that created
/// it, and every object derived from the handle (collections, graphs,
/// queries) inherits the same context.
#[derive(Debug, Clone)]
pub struct Database<C> {
    ctx: C,
    name: String,
}

impl Database<StandardExecution> {
    /// A database handle in the default, immediate execution mode.
    pub fn new(conn: Connection) -> Self {
        let name = conn.database().to_string();
        Self { ctx: StandardExecution::new(conn), name }
    }

    /// The same database with server-side queued execution.
    ///
    /// With `return_result` set, every call returns an
    /// [`AsyncJob`](crate::exec::AsyncJob) to poll; without it, calls are
    /// fire-and-forget.
    pub fn begin_async(&self, return_result: bool) -> Database<AsyncExecution> {
        Database {
            ctx: AsyncExecution::new(self.ctx.connection().clone(), return_result),
            name: self.name.clone(),
        }
    }

    /// The same database with client-side batched execution.
    ///
    /// Calls are queued locally and flushed by
    /// [`commit`](Database::commit); with `return_result` set each call
    /// returns a [`BatchJob`](crate::exec::BatchJob) resolved during the
    /// commit.
    pub fn begin_batch(&self, return_result: bool) -> Database<BatchExecution> {
        Database {
            ctx: BatchExecution::new(self.ctx.connection().clone(), return_result),
            name: self.name.clone(),
        }
    }
}

impl Database<BatchExecution> {
    /// Flush every queued operation as one multipart call.
    pub async fn commit(&self) -> Result<()> {
        self.ctx.commit().await
    }

    /// Number of operations currently queued.
    pub fn queued(&self) -> usize {
        self.ctx.queued()
    }
}

impl<C: ExecutionContext> Database<C> {
    /// Name of this database.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The execution context behind this handle.
    pub fn context(&self) -> &C {
        &self.ctx
    }

    /// A collection handle sharing this database's execution context.
    pub fn collection(&self, name: impl Into<String>) -> Collection<C> {
        Collection::new(self.ctx.clone(), name)
    }

    /// A graph handle sharing this database's execution context.
    pub fn graph(&self, name: impl Into<String>) -> Graph<C> {
        Graph::new(self.ctx.clone(), name)
    }

    /// The AQL entry point sharing this database's execution context.
    pub fn query(&self) -> Query<C> {
        Query::new(self.ctx.clone())
    }

    /// Properties of this database.
    pub async fn properties(&self) -> Result<C::Handle<DatabaseProperties>> {
        let request = Request::new(Method::GET, "/_api/database/current");
        self.ctx
            .handle_request(
                request,
                handler(|res| {
                    if !res.is_success() {
                        return Err(RangoError::Api(res.fault()));
                    }
                    res.decode_field::<DatabaseProperties>("result")
                }),
            )
            .await
    }

    /// List the collections of this database.
    pub async fn collections(&self) -> Result<C::Handle<Vec<CollectionInfo>>> {
        let request = Request::new(Method::GET, "/_api/collection");
        self.ctx
            .handle_request(
                request,
                handler(|res| {
                    if !res.is_success() {
                        return Err(RangoError::Api(res.fault()));
                    }
                    res.decode_field::<Vec<CollectionInfo>>("result")
                }),
            )
            .await
    }

    /// Create a collection.
    pub async fn create_collection(
        &self,
        name: &str,
        options: CollectionOptions,
    ) -> Result<C::Handle<CollectionInfo>> {
        let mut body = json!({
            "name": name,
            "waitForSync": options.wait_for_sync,
            "isSystem": options.is_system,
            "type": if options.edge { 3 } else { 2 },
        });
        if let Some(journal_size) = options.journal_size {
            body["journalSize"] = journal_size.into();
        }
        let request = Request::new(Method::POST, "/_api/collection").json(&body)?;
        self.ctx
            .handle_request(
                request,
                handler(|res| {
                    if !res.is_success() {
                        return Err(RangoError::Api(res.fault()));
                    }
                    res.decode::<CollectionInfo>()
                }),
            )
            .await
    }

    /// Drop a collection. Returns whether anything was dropped; a missing
    /// collection is tolerated when `ignore_missing` is set.
    pub async fn delete_collection(
        &self,
        name: &str,
        ignore_missing: bool,
    ) -> Result<C::Handle<bool>> {
        let request = Request::new(Method::DELETE, format!("/_api/collection/{name}"));
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

    /// List the named graphs of this database.
    pub async fn graphs(&self) -> Result<C::Handle<Vec<GraphInfo>>> {
        let request = Request::new(Method::GET, "/_api/gharial");
        self.ctx
            .handle_request(
                request,
                handler(|res| {
                    if !res.is_success() {
                        return Err(RangoError::Api(res.fault()));
                    }
                    res.decode_field::<Vec<GraphInfo>>("graphs")
                }),
            )
            .await
    }

    /// Create a named graph.
    pub async fn create_graph(
        &self,
        name: &str,
        edge_definitions: Vec<EdgeDefinition>,
        orphan_collections: Vec<String>,
    ) -> Result<C::Handle<GraphInfo>> {
        let request = Request::new(Method::POST, "/_api/gharial").json(&json!({
            "name": name,
            "edgeDefinitions": edge_definitions,
            "orphanCollections": orphan_collections,
        }))?;
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

    /// Drop a named graph; same missing-target contract as
    /// [`delete_collection`](Self::delete_collection).
    pub async fn delete_graph(&self, name: &str, ignore_missing: bool) -> Result<C::Handle<bool>> {
        let request = Request::new(Method::DELETE, format!("/_api/gharial/{name}"));
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
