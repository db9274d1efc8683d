//! Protocol constants shared across the driver

/// Name of the default database every server has.
pub const SYSTEM_DATABASE: &str = "_system";

/// Default port the server listens on.
pub const DEFAULT_PORT: u16 = 8529;

/// Fixed boundary token of the batch multipart wire format.
pub const BATCH_BOUNDARY: &str = "XXXsubpartXXX";

/// Content type of each embedded batch part.
pub const BATCH_PART_CONTENT_TYPE: &str = "application/x-arango-batchpart";

/// Header instructing the server to queue the request out-of-band.
pub const ASYNC_HEADER: &str = "x-arango-async";

/// `ASYNC_HEADER` value that retains the result for later retrieval.
pub const ASYNC_STORE: &str = "store";

/// `ASYNC_HEADER` value for fire-and-forget execution.
pub const ASYNC_FIRE_AND_FORGET: &str = "true";

/// Response header carrying the server-assigned job id.
pub const ASYNC_ID_HEADER: &str = "x-arango-async-id";
