//! Server-queued execution: fire the request, poll the job
//!
//! Requests submitted through [`AsyncExecution`] are placed in the
//! server's in-memory task queue and executed out-of-band. The submit call
//! itself only performs the hand-off; the outcome is tracked through an
//! [`AsyncJob`] polled over the `/_api/job` endpoints.

use async_trait::async_trait;
use rango_domain::constants::{
    ASYNC_FIRE_AND_FORGET, ASYNC_HEADER, ASYNC_ID_HEADER, ASYNC_STORE,
};
use rango_domain::{JobStatus, RangoError, Result};
use tracing::debug;

use crate::connection::Connection;
use crate::exec::{ExecutionContext, Handler};
use crate::request::Request;
use crate::response::Response;

/// Execution context that queues every request on the server.
#[derive(Clone, Debug)]
pub struct AsyncExecution {
    conn: Connection,
    return_result: bool,
}

impl AsyncExecution {
    /// Create an async context.
    ///
    /// With `return_result` set, the server retains each result and every
    /// submit returns an [`AsyncJob`]; without it, requests are
    /// fire-and-forget and submits return `None`.
    pub fn new(conn: Connection, return_result: bool) -> Self {
        Self { conn, return_result }
    }
}

#[async_trait]
impl ExecutionContext for AsyncExecution {
    type Handle<T: Send + 'static> = Option<AsyncJob<T>>;

    fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Hand the request off to the server queue.
    ///
    /// Fails fast when the acknowledgment itself is not a success; never
    /// waits for the queued work to finish.
    async fn handle_request<T>(
        &self,
        request: Request,
        handler: Handler<T>,
    ) -> Result<Option<AsyncJob<T>>>
    where
        T: Send + 'static,
    {
        let request = request.header(
            ASYNC_HEADER,
            if self.return_result { ASYNC_STORE } else { ASYNC_FIRE_AND_FORGET },
        );
        let response = self.conn.send(&request).await?;
        if !response.is_success() {
            return Err(RangoError::AsyncExecute(response.fault()));
        }
        if !self.return_result {
            return Ok(None);
        }
        let id = response
            .header(ASYNC_ID_HEADER)
            .ok_or_else(|| {
                RangoError::Decode(format!("{ASYNC_ID_HEADER} header missing from acknowledgment"))
            })?
            .to_string();
        debug!(job = %id, "async hand-off accepted");
        Ok(Some(AsyncJob { conn: self.conn.clone(), id, handler }))
    }
}

/// Handle to one server-side job.
///
/// Nothing is cached on the client: every status or result query
/// re-contacts the server, so what you read is always authoritative.
pub struct AsyncJob<T> {
    conn: Connection,
    id: String,
    handler: Handler<T>,
}

impl<T> AsyncJob<T> {
    /// The server-assigned job id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Probe the job status.
    pub async fn status(&self) -> Result<JobStatus> {
        let response = self.conn.get(&format!("/_api/job/{}", self.id)).await?;
        match response.status_code {
            204 => Ok(JobStatus::Pending),
            _ if response.is_success() => Ok(JobStatus::Done),
            400 => Err(RangoError::JobInvalid(response.fault())),
            404 => Err(RangoError::JobNotFound(response.fault())),
            _ => Err(RangoError::Job(response.fault())),
        }
    }

    /// Retrieve and consume the job result.
    ///
    /// A 404 here is ambiguous: it may mean the job is unknown, or it may
    /// be a legitimate domain result (say, a document lookup that found
    /// nothing) relayed from the finished job. The server distinguishes the
    /// two only through the error body, so the body is sniffed for
    /// `errorNum == 404` with message `"not found"` — a known weak point of
    /// the wire contract, preserved for compatibility.
    pub async fn result(&self) -> Result<T> {
        let response = self.conn.put(&format!("/_api/job/{}", self.id)).await?;
        match response.status_code {
            204 => Err(RangoError::JobNotDone(format!("job {} is still pending", self.id))),
            _ if response.is_success() => (self.handler)(response),
            400 => Err(RangoError::JobInvalid(response.fault())),
            404 => {
                if job_gone(&response) {
                    Err(RangoError::JobNotFound(response.fault()))
                } else {
                    (self.handler)(response)
                }
            }
            _ => Err(RangoError::Job(response.fault())),
        }
    }

    /// Cancel the job; only meaningful while it is still pending.
    ///
    /// Returns `false` instead of failing when the job is already gone and
    /// `ignore_missing` is set.
    pub async fn cancel(&self, ignore_missing: bool) -> Result<bool> {
        let response = self.conn.put(&format!("/_api/job/{}/cancel", self.id)).await?;
        match response.status_code {
            200 => Ok(true),
            400 => Err(RangoError::JobInvalid(response.fault())),
            404 if ignore_missing => Ok(false),
            404 => Err(RangoError::JobNotFound(response.fault())),
            _ => Err(RangoError::Job(response.fault())),
        }
    }

    /// Drop the job's result from server-side storage.
    ///
    /// Same missing-job contract as [`cancel`](Self::cancel).
    pub async fn delete(&self, ignore_missing: bool) -> Result<bool> {
        let response = self.conn.delete(&format!("/_api/job/{}", self.id)).await?;
        match response.status_code {
            _ if response.is_success() => Ok(true),
            400 => Err(RangoError::JobInvalid(response.fault())),
            404 if ignore_missing => Ok(false),
            404 => Err(RangoError::JobNotFound(response.fault())),
            _ => Err(RangoError::Job(response.fault())),
        }
    }
}

fn job_gone(response: &Response) -> bool {
    response.body.as_ref().is_some_and(|body| {
        body.get("errorNum").and_then(serde_json::Value::as_i64) == Some(404)
            && body.get("errorMessage").and_then(serde_json::Value::as_str) == Some("not found")
    })
}

impl<T> std::fmt::Debug for AsyncJob<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncJob").field("id", &self.id).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use rango_domain::ConnectionConfig;
    use reqwest::Method;
    use serde_json::Value;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::exec::handler;

    async fn context_for(server: &MockServer, return_result: bool) -> AsyncExecution {
        let url = url::Url::parse(&server.uri()).expect("mock uri");
        let config = ConnectionConfig {
            host: url.host_str().expect("host").to_string(),
            port: url.port().expect("port"),
            database: "testdb".into(),
            ..Default::default()
        };
        AsyncExecution::new(Connection::new(config).expect("connection"), return_result)
    }

    fn body_handler() -> Handler<Value> {
        handler(|res| {
            if res.is_success() {
                res.decode()
            } else {
                Err(RangoError::Api(res.fault()))
            }
        })
    }

    #[tokio::test]
    async fn submit_sets_store_header_and_returns_job() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_db/testdb/_api/document"))
            .and(header(ASYNC_HEADER, "store"))
            .respond_with(
                ResponseTemplate::new(202).insert_header(ASYNC_ID_HEADER, "12345"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let ctx = context_for(&server, true).await;
        let job = ctx
            .handle_request(Request::new(Method::POST, "/_api/document"), body_handler())
            .await
            .expect("hand-off")
            .expect("job");
        assert_eq!(job.id(), "12345");
    }

    #[tokio::test]
    async fn fire_and_forget_returns_no_job() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header(ASYNC_HEADER, "true"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let ctx = context_for(&server, false).await;
        let job = ctx
            .handle_request(Request::new(Method::POST, "/_api/document"), body_handler())
            .await
            .expect("hand-off");
        assert!(job.is_none());
    }

    #[tokio::test]
    async fn rejected_hand_off_fails_fast_without_a_job() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string(
                r#"{"error":true,"errorNum":11,"errorMessage":"not authorized"}"#,
            ))
            .mount(&server)
            .await;

        let ctx = context_for(&server, true).await;
        let result = ctx
            .handle_request(Request::new(Method::POST, "/_api/document"), body_handler())
            .await;
        assert!(matches!(result, Err(RangoError::AsyncExecute(_))));
    }

    async fn job_on(server: &MockServer) -> AsyncJob<Value> {
        Mock::given(method("POST"))
            .and(path("/_db/testdb/_api/document"))
            .respond_with(ResponseTemplate::new(202).insert_header(ASYNC_ID_HEADER, "77"))
            .mount(server)
            .await;
        let ctx = context_for(server, true).await;
        ctx.handle_request(Request::new(Method::POST, "/_api/document"), body_handler())
            .await
            .expect("hand-off")
            .expect("job")
    }

    #[tokio::test]
    async fn status_maps_204_to_pending_and_200_to_done() {
        let server = MockServer::start().await;
        let job = job_on(&server).await;

        Mock::given(method("GET"))
            .and(path("/_db/testdb/_api/job/77"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        assert_eq!(job.status().await.expect("status"), JobStatus::Pending);

        server.reset().await;
        Mock::given(method("GET"))
            .and(path("/_db/testdb/_api/job/77"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        assert_eq!(job.status().await.expect("status"), JobStatus::Done);
    }

    #[tokio::test]
    async fn result_applies_the_stored_interpreter() {
        let server = MockServer::start().await;
        let job = job_on(&server).await;

        Mock::given(method("PUT"))
            .and(path("/_db/testdb/_api/job/77"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"_id":"users/1","_key":"1","_rev":"a"}"#,
            ))
            .mount(&server)
            .await;
        let value = job.result().await.expect("result");
        assert_eq!(value["_key"], "1");
    }

    #[tokio::test]
    async fn result_reports_still_pending_on_204() {
        let server = MockServer::start().await;
        let job = job_on(&server).await;

        Mock::given(method("PUT"))
            .and(path("/_db/testdb/_api/job/77"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        assert!(matches!(job.result().await, Err(RangoError::JobNotDone(_))));
    }

    #[tokio::test]
    async fn result_distinguishes_job_not_found_from_domain_404() {
        let server = MockServer::start().await;
        let job = job_on(&server).await;

        // The job endpoint's own 404: job id unknown.
        Mock::given(method("PUT"))
            .and(path("/_db/testdb/_api/job/77"))
            .respond_with(ResponseTemplate::new(404).set_body_string(
                r#"{"error":true,"errorNum":404,"errorMessage":"not found"}"#,
            ))
            .mount(&server)
            .await;
        assert!(matches!(job.result().await, Err(RangoError::JobNotFound(_))));

        server.reset().await;
        // A domain 404 relayed from the finished operation: falls through to
        // the interpreter, which here converts it into an Api failure.
        Mock::given(method("PUT"))
            .and(path("/_db/testdb/_api/job/77"))
            .respond_with(ResponseTemplate::new(404).set_body_string(
                r#"{"error":true,"errorNum":1202,"errorMessage":"document not found"}"#,
            ))
            .mount(&server)
            .await;
        match job.result().await {
            Err(RangoError::Api(fault)) => assert_eq!(fault.error_code, Some(1202)),
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancel_honors_ignore_missing() {
        let server = MockServer::start().await;
        let job = job_on(&server).await;

        Mock::given(method("PUT"))
            .and(path("/_db/testdb/_api/job/77/cancel"))
            .respond_with(ResponseTemplate::new(404).set_body_string(
                r#"{"error":true,"errorNum":404,"errorMessage":"not found"}"#,
            ))
            .mount(&server)
            .await;
        assert!(!job.cancel(true).await.expect("ignored"));
        assert!(matches!(job.cancel(false).await, Err(RangoError::JobNotFound(_))));
    }

    #[tokio::test]
    async fn delete_succeeds_on_200() {
        let server = MockServer::start().await;
        let job = job_on(&server).await;

        Mock::given(method("DELETE"))
            .and(path("/_db/testdb/_api/job/77"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"result":true}"#))
            .mount(&server)
            .await;
        assert!(job.delete(false).await.expect("deleted"));
    }
}
