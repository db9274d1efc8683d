//! Error types used throughout the driver

use serde_json::Value;
use thiserror::Error;

/// A failure reported by the server for one operation.
///
/// Carries everything needed to diagnose the call after the fact: the
/// server's own error number folded into the message, plus the HTTP method,
/// URL and status code of the request that produced it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} ({method} {url}: HTTP {http_code})")]
pub struct ServerFault {
    /// Human-readable message, prefixed with `[errorNum]` when the server
    /// supplied one.
    pub message: String,
    /// The server-specific error number, if present in the body.
    pub error_code: Option<i64>,
    /// HTTP status code of the response.
    pub http_code: u16,
    /// HTTP method of the originating request.
    pub method: String,
    /// Full URL of the originating request.
    pub url: String,
}

impl ServerFault {
    /// Build a fault from the pieces of a raw response.
    ///
    /// The message is taken from the body's `errorMessage` field when the
    /// body is a JSON error document, falling back to the HTTP status text.
    pub fn from_parts(
        method: impl Into<String>,
        url: impl Into<String>,
        http_code: u16,
        status_text: &str,
        body: Option<&Value>,
    ) -> Self {
        let error_code = body.and_then(|b| b.get("errorNum")).and_then(Value::as_i64);
        let raw_message = body
            .and_then(|b| b.get("errorMessage"))
            .and_then(Value::as_str)
            .unwrap_or(if status_text.is_empty() { "request failed" } else { status_text });
        let message = match error_code {
            Some(code) => format!("[{code}] {raw_message}"),
            None => raw_message.to_string(),
        };
        Self { message, error_code, http_code, method: method.into(), url: url.into() }
    }
}

/// Main error type for the Rango driver.
///
/// Three families, kept distinguishable so callers can tell "your request
/// failed" from "the tracking mechanism broke":
/// - transport failures ([`Network`](RangoError::Network)), surfaced
///   immediately and never retried beyond the HTTP layer's own policy;
/// - server-reported domain failures (the [`ServerFault`]-carrying
///   variants);
/// - protocol-integrity failures
///   ([`BatchResponse`](RangoError::BatchResponse),
///   [`Decode`](RangoError::Decode), [`JobInvalid`](RangoError::JobInvalid),
///   [`JobNotFound`](RangoError::JobNotFound)).
#[derive(Error, Debug, Clone)]
pub enum RangoError {
    /// Connection-level failure: refused, reset, timed out, TLS, DNS.
    #[error("network error: {0}")]
    Network(String),

    /// The request could not be constructed on the client side.
    #[error("invalid request: {0}")]
    Request(String),

    /// A response body did not decode into the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(String),

    /// The server could not be reached or did not identify itself during
    /// connection verification.
    #[error("server connection failed: {0}")]
    Connection(ServerFault),

    /// Generic server-reported operation failure.
    #[error(transparent)]
    Api(#[from] ServerFault),

    /// The hand-off of an asynchronously executed request was rejected.
    #[error("async execution rejected: {0}")]
    AsyncExecute(ServerFault),

    /// The batch call itself was rejected; none of the queued jobs ran.
    #[error("batch execution rejected: {0}")]
    BatchExecute(ServerFault),

    /// The multipart batch response could not be demultiplexed.
    #[error("malformed batch response: {0}")]
    BatchResponse(String),

    /// The server rejected the job id as malformed.
    #[error("invalid job id: {0}")]
    JobInvalid(ServerFault),

    /// The job is not (or no longer) known to the server.
    #[error("job not found: {0}")]
    JobNotFound(ServerFault),

    /// The job has not finished yet, so there is no result to retrieve.
    #[error("job not done: {0}")]
    JobNotDone(String),

    /// A job status/result/cancel/delete probe failed for another reason.
    #[error("job operation failed: {0}")]
    Job(ServerFault),

    /// Fetching the next cursor batch from the server failed.
    #[error("cursor fetch failed: {0}")]
    CursorNext(ServerFault),

    /// Releasing the server-side cursor failed.
    #[error("cursor close failed: {0}")]
    CursorClose(ServerFault),
}

impl RangoError {
    /// The HTTP status code attached to this error, if the failure came
    /// from a server response.
    pub fn http_code(&self) -> Option<u16> {
        self.fault().map(|f| f.http_code)
    }

    /// The server-specific error number, if one was reported.
    pub fn error_code(&self) -> Option<i64> {
        self.fault().and_then(|f| f.error_code)
    }

    /// Whether this is a transport-level failure rather than a response
    /// the server produced.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Whether this error means "the tracking mechanism broke" rather than
    /// "the tracked operation failed".
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            Self::BatchResponse(_) | Self::Decode(_) | Self::JobInvalid(_) | Self::JobNotFound(_)
        )
    }

    fn fault(&self) -> Option<&ServerFault> {
        match self {
            Self::Connection(f)
            | Self::Api(f)
            | Self::AsyncExecute(f)
            | Self::BatchExecute(f)
            | Self::JobInvalid(f)
            | Self::JobNotFound(f)
            | Self::Job(f)
            | Self::CursorNext(f)
            | Self::CursorClose(f) => Some(f),
            _ => None,
        }
    }
}

/// Result type alias for Rango operations
pub type Result<T> = std::result::Result<T, RangoError>;
