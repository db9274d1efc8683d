//! Client-queued execution: collect calls, flush them as one multipart call
//!
//! Requests submitted through [`BatchExecution`] never touch the wire on
//! their own. They accumulate in an in-memory queue together with their
//! interpreters and a [`BatchJob`] handle each, and go out as a single
//! `POST /_api/batch` when [`commit`](BatchExecution::commit) runs. The
//! multipart response is demultiplexed back onto the jobs in submission
//! order.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rango_domain::constants::{BATCH_BOUNDARY, BATCH_PART_CONTENT_TYPE};
use rango_domain::{JobStatus, RangoError, Result};
use reqwest::Method;
use tracing::{instrument, warn};

use crate::connection::Connection;
use crate::exec::{ExecutionContext, Handler};
use crate::request::Request;
use crate::response::Response;

type Resolver = Box<dyn FnOnce(Result<Response>) + Send>;

#[derive(Default)]
struct BatchQueue {
    requests: Vec<Request>,
    resolvers: Vec<Resolver>,
}

struct BatchInner {
    conn: Connection,
    return_result: bool,
    queue: Mutex<BatchQueue>,
}

/// Execution context that queues requests client-side until committed.
///
/// Clones share one queue, so a database handle and the collection handles
/// derived from it all feed the same batch. The queue is consumed — and
/// therefore emptied — by every commit attempt, successful or not; a batch
/// context is reusable afterwards.
///
/// Submissions are mutex-guarded for memory safety, but the intended use is
/// sequential: no ordering guarantee is offered to concurrent submitters.
#[derive(Clone)]
pub struct BatchExecution {
    inner: Arc<BatchInner>,
}

impl BatchExecution {
    /// Create a batch context.
    ///
    /// With `return_result` set, every submit returns a [`BatchJob`] that
    /// the commit resolves; without it, submits return `None` and the
    /// response is not demultiplexed at all.
    pub fn new(conn: Connection, return_result: bool) -> Self {
        Self {
            inner: Arc::new(BatchInner {
                conn,
                return_result,
                queue: Mutex::new(BatchQueue::default()),
            }),
        }
    }

    /// Number of operations currently queued.
    pub fn queued(&self) -> usize {
        self.inner.queue.lock().requests.len()
    }

    /// Flush the queue as one multipart call.
    ///
    /// An empty queue is a no-op. The queue is drained up front, so it ends
    /// up empty no matter how the commit fares; a failed batch is not
    /// retried and its jobs stay pending. A rejection of the batch call
    /// itself is returned as an error; per-item failures are captured in
    /// the individual jobs instead, so one failing item never aborts its
    /// siblings.
    #[instrument(skip(self), fields(queued = self.queued()))]
    pub async fn commit(&self) -> Result<()> {
        let (requests, resolvers) = {
            let mut queue = self.inner.queue.lock();
            (std::mem::take(&mut queue.requests), std::mem::take(&mut queue.resolvers))
        };
        if requests.is_empty() {
            return Ok(());
        }

        let request = Request::new(Method::POST, "/_api/batch")
            .header("content-type", format!("multipart/form-data; boundary={BATCH_BOUNDARY}"))
            .raw(encode_multipart(&requests));
        let response = self.inner.conn.send(&request).await?;
        if !response.is_success() {
            return Err(RangoError::BatchExecute(response.fault()));
        }
        if !self.inner.return_result {
            return Ok(());
        }

        let parts = split_multipart(&response.raw_body)?;
        if parts.len() > requests.len() {
            warn!(
                expected = requests.len(),
                received = parts.len(),
                "batch response has surplus parts; extras ignored"
            );
        }

        let mut parts = parts.into_iter();
        for (request, resolver) in requests.iter().zip(resolvers) {
            let outcome = match parts.next() {
                Some(part) => parse_part(part).map(|(status_code, status_text, body)| {
                    Response::new(
                        request.method.as_str(),
                        format!("{}{}", self.inner.conn.url_prefix(), request.endpoint),
                        status_code,
                        status_text,
                        Default::default(),
                        body,
                    )
                }),
                None => Err(RangoError::BatchResponse(format!(
                    "sub-response for `{request}` missing from batch reply"
                ))),
            };
            resolver(outcome);
        }
        Ok(())
    }
}

#[async_trait]
impl ExecutionContext for BatchExecution {
    type Handle<T: Send + 'static> = Option<BatchJob<T>>;

    fn connection(&self) -> &Connection {
        &self.inner.conn
    }

    /// Queue the descriptor/interpreter pair; no I/O happens here.
    ///
    /// The order of submissions defines the wire order at commit time and
    /// therefore which sub-response resolves which job.
    async fn handle_request<T>(
        &self,
        request: Request,
        handler: Handler<T>,
    ) -> Result<Option<BatchJob<T>>>
    where
        T: Send + 'static,
    {
        let mut queue = self.inner.queue.lock();
        queue.requests.push(request);

        if !self.inner.return_result {
            queue.resolvers.push(Box::new(|_| {}));
            return Ok(None);
        }

        let job = BatchJob::new();
        let slot = Arc::clone(&job.slot);
        queue.resolvers.push(Box::new(move |outcome| {
            let state = match outcome.and_then(|response| handler(response)) {
                Ok(value) => JobSlot::Done(value),
                Err(err) => JobSlot::Error(err),
            };
            *slot.lock() = state;
        }));
        Ok(Some(job))
    }
}

enum JobSlot<T> {
    Pending,
    Done(T),
    Error(RangoError),
}

/// Handle to one queued batch operation.
///
/// Starts out pending and is written exactly once, by the commit that
/// includes it: either the interpreted result or the captured failure.
/// Failures are only visible through [`status`](Self::status) and
/// [`error`](Self::error); callers needing strict guarantees must check
/// every job after the commit.
pub struct BatchJob<T> {
    slot: Arc<Mutex<JobSlot<T>>>,
}

impl<T> BatchJob<T> {
    fn new() -> Self {
        Self { slot: Arc::new(Mutex::new(JobSlot::Pending)) }
    }

    /// Current lifecycle state.
    pub fn status(&self) -> JobStatus {
        match &*self.slot.lock() {
            JobSlot::Pending => JobStatus::Pending,
            JobSlot::Done(_) => JobStatus::Done,
            JobSlot::Error(_) => JobStatus::Error,
        }
    }

    /// The captured failure, if the operation failed.
    pub fn error(&self) -> Option<RangoError> {
        match &*self.slot.lock() {
            JobSlot::Error(err) => Some(err.clone()),
            _ => None,
        }
    }
}

impl<T: Clone> BatchJob<T> {
    /// The interpreted result.
    ///
    /// Fails with [`RangoError::JobNotDone`] before the commit, and with
    /// the captured failure when the operation errored.
    pub fn result(&self) -> Result<T> {
        match &*self.slot.lock() {
            JobSlot::Pending => Err(RangoError::JobNotDone("batch not committed yet".into())),
            JobSlot::Done(value) => Ok(value.clone()),
            JobSlot::Error(err) => Err(err.clone()),
        }
    }
}

impl<T> Clone for BatchJob<T> {
    fn clone(&self) -> Self {
        Self { slot: Arc::clone(&self.slot) }
    }
}

impl<T> std::fmt::Debug for BatchJob<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchJob").field("status", &self.status()).finish_non_exhaustive()
    }
}

/// Render the queued requests as one multipart body.
///
/// Each part carries the fixed part content type and a 1-based
/// `Content-Id` matching its queue position; its body is the embedded
/// HTTP request rendered by [`Request::to_raw_http`].
fn encode_multipart(requests: &[Request]) -> String {
    let mut raw = String::new();
    for (index, request) in requests.iter().enumerate() {
        raw.push_str("--");
        raw.push_str(BATCH_BOUNDARY);
        raw.push_str("\r\n");
        raw.push_str("Content-Type: ");
        raw.push_str(BATCH_PART_CONTENT_TYPE);
        raw.push_str("\r\n");
        raw.push_str(&format!("Content-Id: {}\r\n\r\n", index + 1));
        raw.push_str(&request.to_raw_http());
        raw.push_str("\r\n");
    }
    raw.push_str("--");
    raw.push_str(BATCH_BOUNDARY);
    raw.push_str("--\r\n\r\n");
    raw
}

/// Split a multipart response body into its parts, preserving order.
///
/// The server is trusted to answer in submission order; nothing here
/// re-verifies the pairing beyond position.
fn split_multipart(raw: &str) -> Result<Vec<&str>> {
    let delimiter = format!("--{BATCH_BOUNDARY}");
    let mut segments = raw.split(delimiter.as_str());
    let _preamble = segments.next();

    let mut parts = Vec::new();
    for segment in segments {
        if segment.starts_with("--") {
            break; // closing delimiter
        }
        parts.push(segment);
    }
    if parts.is_empty() {
        return Err(RangoError::BatchResponse(
            "no boundary-delimited parts in batch reply".into(),
        ));
    }
    Ok(parts)
}

/// Parse one part into `(status_code, status_text, body)`.
///
/// A part is its envelope headers, a blank line, then an embedded HTTP
/// response (status line, optional headers, blank line, body).
fn parse_part(part: &str) -> Result<(u16, String, String)> {
    let part = part.trim_start_matches("\r\n");
    let (_envelope, embedded) = part
        .split_once("\r\n\r\n")
        .ok_or_else(|| RangoError::BatchResponse("part lacks an envelope/body separator".into()))?;

    let (head, body) = match embedded.split_once("\r\n\r\n") {
        Some((head, body)) => (head, body),
        None => (embedded, ""),
    };
    let status_line = head.lines().next().unwrap_or_default();
    let mut pieces = status_line.splitn(3, ' ');
    let _version = pieces.next();
    let status_code = pieces
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| {
            RangoError::BatchResponse(format!("unparsable embedded status line `{status_line}`"))
        })?;
    let status_text = pieces.next().unwrap_or_default().to_string();
    let body = body.trim_end_matches(['\r', '\n']).to_string();
    Ok((status_code, status_text, body))
}

#[cfg(test)]
mod tests {
    use rango_domain::ConnectionConfig;
    use serde_json::{json, Value};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::exec::handler;

    fn insert_request(key: &str) -> Request {
        Request::new(Method::POST, "/_api/document")
            .param("collection", "users")
            .json(&json!({"_key": key}))
            .expect("payload")
    }

    fn meta_handler() -> Handler<Value> {
        handler(|res| {
            if res.is_success() {
                res.decode()
            } else {
                Err(RangoError::Api(res.fault()))
            }
        })
    }

    async fn context_for(server: &MockServer, return_result: bool) -> BatchExecution {
        let url = url::Url::parse(&server.uri()).expect("mock uri");
        let config = ConnectionConfig {
            host: url.host_str().expect("host").to_string(),
            port: url.port().expect("port"),
            database: "testdb".into(),
            ..Default::default()
        };
        BatchExecution::new(Connection::new(config).expect("connection"), return_result)
    }

    fn part(content_id: usize, status: &str, body: &str) -> String {
        format!(
            "--{BATCH_BOUNDARY}\r\nContent-Type: {BATCH_PART_CONTENT_TYPE}\r\nContent-Id: {content_id}\r\n\r\nHTTP/1.1 {status}\r\nContent-Type: application/json; charset=utf-8\r\n\r\n{body}\r\n"
        )
    }

    fn multipart_reply(parts: &[String]) -> String {
        format!("{}--{BATCH_BOUNDARY}--\r\n\r\n", parts.concat())
    }

    #[test]
    fn encode_numbers_parts_from_one() {
        let body = encode_multipart(&[insert_request("1"), insert_request("2")]);
        assert!(body.contains("Content-Id: 1\r\n"));
        assert!(body.contains("Content-Id: 2\r\n"));
        assert!(body.contains("Content-Type: application/x-arango-batchpart"));
        assert!(body.starts_with("--XXXsubpartXXX\r\n"));
        assert!(body.ends_with("--XXXsubpartXXX--\r\n\r\n"));
        assert_eq!(body.matches("POST /_api/document?collection=users HTTP/1.1").count(), 2);
    }

    #[test]
    fn split_rejects_bodies_without_boundaries() {
        assert!(matches!(
            split_multipart("not a multipart body"),
            Err(RangoError::BatchResponse(_))
        ));
    }

    #[test]
    fn parse_part_reads_status_and_body() {
        let reply = multipart_reply(&[part(1, "202 Accepted", r#"{"_key":"1"}"#)]);
        let segment = split_multipart(&reply).expect("parts")[0];
        let (code, text, body) = parse_part(segment).expect("parsed");
        assert_eq!(code, 202);
        assert_eq!(text, "Accepted");
        assert_eq!(body, r#"{"_key":"1"}"#);
    }

    #[test]
    fn parse_part_tolerates_headerless_responses() {
        let raw = format!(
            "--{BATCH_BOUNDARY}\r\nContent-Type: {BATCH_PART_CONTENT_TYPE}\r\nContent-Id: 1\r\n\r\nHTTP/1.1 204 No Content\r\n"
        );
        let reply = multipart_reply(&[raw]);
        let segment = split_multipart(&reply).expect("parts")[0];
        let (code, _, body) = parse_part(segment).expect("parsed");
        assert_eq!(code, 204);
        assert_eq!(body, "");
    }

    #[tokio::test]
    async fn empty_commit_is_a_no_op() {
        let server = MockServer::start().await;
        // No mock mounted: any request would fail the test.
        let batch = context_for(&server, true).await;
        batch.commit().await.expect("no-op");
        assert_eq!(server.received_requests().await.expect("requests").len(), 0);
    }

    #[tokio::test]
    async fn commit_resolves_jobs_in_submission_order() {
        let server = MockServer::start().await;
        let reply = multipart_reply(&[
            part(1, "202 Accepted", r#"{"_id":"users/1","_key":"1","_rev":"a"}"#),
            part(2, "202 Accepted", r#"{"_id":"users/2","_key":"2","_rev":"b"}"#),
            part(3, "202 Accepted", r#"{"_id":"users/3","_key":"3","_rev":"c"}"#),
        ]);
        Mock::given(method("POST"))
            .and(path("/_db/testdb/_api/batch"))
            .and(header(
                "content-type",
                format!("multipart/form-data; boundary={BATCH_BOUNDARY}").as_str(),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_string(reply))
            .expect(1)
            .mount(&server)
            .await;

        let batch = context_for(&server, true).await;
        let mut jobs = Vec::new();
        for key in ["1", "2", "3"] {
            let job = batch
                .handle_request(insert_request(key), meta_handler())
                .await
                .expect("queued")
                .expect("job");
            assert_eq!(job.status(), JobStatus::Pending);
            jobs.push(job);
        }
        assert_eq!(batch.queued(), 3);

        batch.commit().await.expect("commit");

        for (index, job) in jobs.iter().enumerate() {
            assert_eq!(job.status(), JobStatus::Done);
            let meta = job.result().expect("result");
            assert_eq!(meta["_key"], (index + 1).to_string());
        }
        assert_eq!(batch.queued(), 0);
    }

    #[tokio::test]
    async fn one_failing_item_does_not_abort_its_siblings() {
        let server = MockServer::start().await;
        let reply = multipart_reply(&[
            part(1, "202 Accepted", r#"{"_id":"users/1","_key":"1","_rev":"a"}"#),
            part(2, "202 Accepted", r#"{"_id":"users/2","_key":"2","_rev":"b"}"#),
            part(
                3,
                "409 Conflict",
                r#"{"error":true,"errorNum":1210,"errorMessage":"unique constraint violated"}"#,
            ),
        ]);
        Mock::given(method("POST"))
            .and(path("/_db/testdb/_api/batch"))
            .respond_with(ResponseTemplate::new(200).set_body_string(reply))
            .mount(&server)
            .await;

        let batch = context_for(&server, true).await;
        let mut jobs = Vec::new();
        for key in ["1", "2", "2"] {
            jobs.push(
                batch
                    .handle_request(insert_request(key), meta_handler())
                    .await
                    .expect("queued")
                    .expect("job"),
            );
        }
        batch.commit().await.expect("commit");

        assert_eq!(jobs[0].status(), JobStatus::Done);
        assert_eq!(jobs[0].result().expect("result")["_key"], "1");
        assert_eq!(jobs[1].status(), JobStatus::Done);
        assert_eq!(jobs[2].status(), JobStatus::Error);
        match jobs[2].error() {
            Some(RangoError::Api(fault)) => assert_eq!(fault.error_code, Some(1210)),
            other => panic!("expected captured Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejected_batch_call_leaves_jobs_pending_and_queue_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_db/testdb/_api/batch"))
            .respond_with(ResponseTemplate::new(500).set_body_string(
                r#"{"error":true,"errorNum":4,"errorMessage":"out of memory"}"#,
            ))
            .mount(&server)
            .await;

        let batch = context_for(&server, true).await;
        let job = batch
            .handle_request(insert_request("1"), meta_handler())
            .await
            .expect("queued")
            .expect("job");

        assert!(matches!(batch.commit().await, Err(RangoError::BatchExecute(_))));
        assert_eq!(job.status(), JobStatus::Pending);
        assert_eq!(batch.queued(), 0);

        // The context is reusable after a failed commit.
        server.reset().await;
        let reply = multipart_reply(&[part(
            1,
            "202 Accepted",
            r#"{"_id":"users/9","_key":"9","_rev":"z"}"#,
        )]);
        Mock::given(method("POST"))
            .and(path("/_db/testdb/_api/batch"))
            .respond_with(ResponseTemplate::new(200).set_body_string(reply))
            .mount(&server)
            .await;
        let job = batch
            .handle_request(insert_request("9"), meta_handler())
            .await
            .expect("queued")
            .expect("job");
        batch.commit().await.expect("commit");
        assert_eq!(job.result().expect("result")["_key"], "9");
    }

    #[tokio::test]
    async fn missing_sub_response_marks_only_the_tail_job() {
        let server = MockServer::start().await;
        let reply = multipart_reply(&[part(
            1,
            "202 Accepted",
            r#"{"_id":"users/1","_key":"1","_rev":"a"}"#,
        )]);
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(reply))
            .mount(&server)
            .await;

        let batch = context_for(&server, true).await;
        let first = batch
            .handle_request(insert_request("1"), meta_handler())
            .await
            .expect("queued")
            .expect("job");
        let second = batch
            .handle_request(insert_request("2"), meta_handler())
            .await
            .expect("queued")
            .expect("job");

        batch.commit().await.expect("commit");
        assert_eq!(first.status(), JobStatus::Done);
        assert_eq!(second.status(), JobStatus::Error);
        assert!(matches!(second.error(), Some(RangoError::BatchResponse(_))));
    }

    #[tokio::test]
    async fn discarded_results_skip_demultiplexing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_db/testdb/_api/batch"))
            .respond_with(ResponseTemplate::new(200).set_body_string("anything"))
            .expect(1)
            .mount(&server)
            .await;

        let batch = context_for(&server, false).await;
        let handle = batch
            .handle_request(insert_request("1"), meta_handler())
            .await
            .expect("queued");
        assert!(handle.is_none());
        batch.commit().await.expect("commit");
        assert_eq!(batch.queued(), 0);
    }
}
