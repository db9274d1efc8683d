//! Execution contexts: when and how operation descriptors reach the wire
//!
//! Every API-surface method ends the same way: it builds a [`Request`] and a
//! pure response interpreter, then calls
//! [`ExecutionContext::handle_request`]. Which context the surface object
//! was constructed with decides what happens next — a synchronous round
//! trip, a server-side queued job, or a client-side batch entry. Swapping
//! the context swaps the execution strategy without touching a single
//! surface method.

mod asynchronous;
mod batch;
mod standard;

pub use asynchronous::{AsyncExecution, AsyncJob};
pub use batch::{BatchExecution, BatchJob};
pub use standard::StandardExecution;

use async_trait::async_trait;
use rango_domain::Result;

use crate::connection::Connection;
use crate::request::Request;
use crate::response::Response;

/// A pure interpreter from a raw response to a typed result or failure.
///
/// Paired one-to-one with the [`Request`] it interprets; the pair is the
/// unit of deferred work. Interpreters must be side-effect free: deferred
/// contexts may apply them long after the producing method returned.
pub type Handler<T> = Box<dyn Fn(Response) -> Result<T> + Send + Sync>;

/// Box a closure as a [`Handler`].
pub fn handler<T, F>(interpret: F) -> Handler<T>
where
    F: Fn(Response) -> Result<T> + Send + Sync + 'static,
{
    Box::new(interpret)
}

/// The polymorphic dispatch point between the API surface and the wire.
///
/// The associated [`Handle`](Self::Handle) type is what makes one method
/// surface serve three execution modes: a submitted operation resolves to
/// `T` immediately, to an [`AsyncJob<T>`] handle, or to a [`BatchJob<T>`]
/// handle, depending on the implementation.
#[async_trait]
pub trait ExecutionContext: Clone + Send + Sync + 'static {
    /// The shape a submitted operation's outcome takes in this mode.
    type Handle<T: Send + 'static>: Send + 'static;

    /// The connection this context executes against.
    fn connection(&self) -> &Connection;

    /// Submit one descriptor/interpreter pair for execution.
    async fn handle_request<T>(
        &self,
        request: Request,
        handler: Handler<T>,
    ) -> Result<Self::Handle<T>>
    where
        T: Send + 'static;
}
