//! Immediate execution: one synchronous round trip per call

use async_trait::async_trait;
use rango_domain::Result;

use crate::connection::Connection;
use crate::exec::{ExecutionContext, Handler};
use crate::request::Request;

/// The default execution mode: send, interpret, return.
///
/// Failures surface at the call site; no job object is involved.
#[derive(Clone, Debug)]
pub struct StandardExecution {
    conn: Connection,
}

impl StandardExecution {
    /// Wrap a connection in the immediate execution mode.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl ExecutionContext for StandardExecution {
    type Handle<T: Send + 'static> = T;

    fn connection(&self) -> &Connection {
        &self.conn
    }

    async fn handle_request<T>(&self, request: Request, handler: Handler<T>) -> Result<T>
    where
        T: Send + 'static,
    {
        let response = self.conn.send(&request).await?;
        handler(response)
    }
}
