//! Wire-level response shapes returned by the server
//!
//! Every endpoint's body is decoded into its own struct, field by field,
//! rather than passed around as untyped JSON.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identity of the server, from `GET /_api/version`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerVersion {
    /// Product name, e.g. `"arango"`.
    pub server: String,
    /// Semantic version string.
    pub version: String,
    /// License edition, when reported.
    #[serde(default)]
    pub license: Option<String>,
    /// Component details, present when requested with `details=true`.
    #[serde(default)]
    pub details: Option<Value>,
}

/// Properties of the current database, from `GET /_api/database/current`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseProperties {
    /// Database name.
    pub name: String,
    /// Server-assigned id.
    pub id: String,
    /// Filesystem path of the database directory.
    #[serde(default)]
    pub path: Option<String>,
    /// Whether this is the `_system` database.
    pub is_system: bool,
}

/// Lifecycle status of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum CollectionStatus {
    /// Just created, not yet materialized.
    New,
    /// Unloaded from memory.
    Unloaded,
    /// Loaded in memory.
    Loaded,
    /// In the process of being unloaded.
    Unloading,
    /// Deleted.
    Deleted,
    /// In the process of being loaded.
    Loading,
}

impl TryFrom<u8> for CollectionStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::New),
            2 => Ok(Self::Unloaded),
            3 => Ok(Self::Loaded),
            4 => Ok(Self::Unloading),
            5 => Ok(Self::Deleted),
            6 => Ok(Self::Loading),
            other => Err(format!("unknown collection status {other}")),
        }
    }
}

impl From<CollectionStatus> for u8 {
    fn from(status: CollectionStatus) -> Self {
        match status {
            CollectionStatus::New => 1,
            CollectionStatus::Unloaded => 2,
            CollectionStatus::Loaded => 3,
            CollectionStatus::Unloading => 4,
            CollectionStatus::Deleted => 5,
            CollectionStatus::Loading => 6,
        }
    }
}

/// Kind of a collection: plain documents or edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum CollectionType {
    /// Document collection.
    Document,
    /// Edge collection.
    Edge,
}

impl TryFrom<u8> for CollectionType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(Self::Document),
            3 => Ok(Self::Edge),
            other => Err(format!("unknown collection type {other}")),
        }
    }
}

impl From<CollectionType> for u8 {
    fn from(kind: CollectionType) -> Self {
        match kind {
            CollectionType::Document => 2,
            CollectionType::Edge => 3,
        }
    }
}

/// One entry of the collection listing, from `GET /_api/collection`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionInfo {
    /// Server-assigned id.
    pub id: String,
    /// Collection name.
    pub name: String,
    /// Whether this is a system collection.
    pub is_system: bool,
    /// Lifecycle status.
    pub status: CollectionStatus,
    /// Document or edge collection.
    #[serde(rename = "type")]
    pub collection_type: CollectionType,
}

/// Properties of a single collection, from
/// `GET /_api/collection/{name}/properties`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionProperties {
    /// Collection name.
    pub name: String,
    /// Whether writes wait for disk sync before returning.
    pub wait_for_sync: bool,
    /// Whether this is a system collection.
    #[serde(default)]
    pub is_system: bool,
    /// Whether the collection is kept in memory only.
    #[serde(default)]
    pub is_volatile: bool,
    /// Maximal journal size in bytes, when reported.
    #[serde(default)]
    pub journal_size: Option<u64>,
    /// Key generation options, as reported by the server.
    #[serde(default)]
    pub key_options: Option<Value>,
}

/// The `_id` / `_key` / `_rev` triple identifying one stored document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    /// Fully qualified handle, `collection/key`.
    #[serde(rename = "_id")]
    pub id: String,
    /// Document key, unique within its collection.
    #[serde(rename = "_key")]
    pub key: String,
    /// Revision token.
    #[serde(rename = "_rev")]
    pub rev: String,
}

/// One page of a server-side cursor, as returned by the initial query call
/// and by every subsequent `PUT /_api/cursor/{id}` fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorPage {
    /// Server-side cursor id; absent when the first page was the whole
    /// result set.
    #[serde(default)]
    pub id: Option<String>,
    /// Rows of this page, consumed from the front.
    pub result: VecDeque<Value>,
    /// Whether the server holds further pages.
    pub has_more: bool,
    /// Total row count, present only when requested.
    #[serde(default)]
    pub count: Option<u64>,
    /// Whether the result was served from the query cache.
    #[serde(default)]
    pub cached: Option<bool>,
    /// Optional statistics and warnings.
    #[serde(default)]
    pub extra: Option<Value>,
}

/// Outcome of a bulk import, from `POST /_api/import`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportResult {
    /// Number of documents created.
    pub created: u64,
    /// Number of documents that failed.
    #[serde(default)]
    pub errors: u64,
    /// Number of empty lines in the input.
    #[serde(default)]
    pub empty: u64,
    /// Per-failure detail messages, when requested.
    #[serde(default)]
    pub details: Option<Vec<String>>,
}

/// Outcome of `PUT /_api/simple/remove-by-keys`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveByKeysResult {
    /// Number of documents removed.
    pub removed: u64,
    /// Number of keys that matched nothing.
    pub ignored: u64,
}

/// One edge definition of a named graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeDefinition {
    /// The edge collection.
    pub collection: String,
    /// Vertex collections edges may start from.
    pub from: Vec<String>,
    /// Vertex collections edges may point to.
    pub to: Vec<String>,
}

/// Description of a named graph, from the `/_api/gharial` endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphInfo {
    /// Graph name. The server reports it under `_key`.
    #[serde(rename = "_key")]
    pub name: String,
    /// Revision token.
    #[serde(rename = "_rev", default)]
    pub revision: Option<String>,
    /// Edge definitions of the graph.
    #[serde(default)]
    pub edge_definitions: Vec<EdgeDefinition>,
    /// Vertex collections not used in any edge definition.
    #[serde(default)]
    pub orphan_collections: Vec<String>,
}

/// An execution plan produced by `POST /_api/explain`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPlan {
    /// Plan nodes, in execution order.
    #[serde(default)]
    pub nodes: Vec<Value>,
    /// Optimizer rules applied.
    #[serde(default)]
    pub rules: Vec<String>,
    /// Collections involved in the plan.
    #[serde(default)]
    pub collections: Vec<Value>,
    /// Cost estimate of the plan.
    #[serde(default)]
    pub estimated_cost: f64,
    /// Estimated number of items produced.
    #[serde(default)]
    pub estimated_nr_items: u64,
}

/// Result of parsing a query with `POST /_api/query`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryInfo {
    /// Whether the query parsed successfully.
    #[serde(default)]
    pub parsed: bool,
    /// Collections referenced by the query.
    #[serde(default)]
    pub collections: Vec<String>,
    /// Bind parameter names referenced by the query.
    #[serde(default)]
    pub bind_vars: Vec<String>,
    /// Abstract syntax tree, when the server includes one.
    #[serde(default)]
    pub ast: Option<Value>,
}

/// Lifecycle state of a deferred job, async or batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Queued (server-side) or not yet committed (batch).
    Pending,
    /// Finished successfully.
    Done,
    /// Finished with a captured failure.
    Error,
}
