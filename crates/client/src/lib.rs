//! # Rango Client
//!
//! Client driver for ArangoDB: speaks the server's HTTP API and exposes
//! database, collection, graph and query operations as typed method calls.
//!
//! The heart of the crate is the [`exec::ExecutionContext`] seam: every
//! API-surface method builds an immutable [`request::Request`] plus a pure
//! response interpreter and hands both to whichever context the surface
//! object was constructed with. The same `insert`/`update`/`remove` calls
//! therefore run in one of three modes:
//!
//! - [`exec::StandardExecution`] — one synchronous round trip per call;
//! - [`exec::AsyncExecution`] — server-side queuing with
//!   [`exec::AsyncJob`] handles polled over `/_api/job`;
//! - [`exec::BatchExecution`] — client-side queuing, flushed as a single
//!   multipart call by [`exec::BatchExecution::commit`], with
//!   [`exec::BatchJob`] handles resolved in submission order.
//!
//! Large result sets stream through [`cursor::Cursor`], which fetches
//! pages from the server lazily.
//!
//! ## Architecture
//! - Pure data shapes and errors live in `rango-domain`
//! - All network I/O funnels through [`connection::Connection`]
//! - API-surface objects never perform I/O themselves

pub mod client;
pub mod collection;
pub mod connection;
pub mod cursor;
pub mod database;
pub mod exec;
pub mod graph;
pub mod http;
pub mod query;
pub mod request;
pub mod response;

// Re-export commonly used items
pub use client::Client;
pub use collection::{Collection, RemoveOptions, UpdateOptions};
pub use connection::Connection;
pub use cursor::Cursor;
pub use database::{CollectionOptions, Database};
pub use exec::{
    handler, AsyncExecution, AsyncJob, BatchExecution, BatchJob, ExecutionContext, Handler,
    StandardExecution,
};
pub use graph::Graph;
pub use http::HttpClient;
pub use query::{AqlQuery, Query};
pub use rango_domain::{ConnectionConfig, JobStatus, RangoError, Result, ServerFault};
pub use request::Request;
pub use response::Response;
