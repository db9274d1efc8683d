//! Collection handle: document CRUD and collection administration

use rango_domain::{
    CollectionProperties, CursorPage, DocumentMeta, ImportResult, RangoError, RemoveByKeysResult,
    Result,
};
use reqwest::Method;
use serde_json::{json, Value};

use crate::cursor::Cursor;
use crate::exec::{handler, ExecutionContext};
use crate::request::Request;

/// Options for updating a document.
#[derive(Debug, Clone)]
pub struct UpdateOptions {
    /// Require this revision to match, else fail with a conflict.
    pub rev: Option<String>,
    /// Keep attributes set to null instead of removing them.
    pub keep_null: bool,
    /// Merge sub-objects instead of replacing them.
    pub merge_objects: bool,
    /// Wait for the write to sync to disk.
    pub wait_for_sync: Option<bool>,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self { rev: None, keep_null: true, merge_objects: true, wait_for_sync: None }
    }
}

/// Options for removing a document.
#[derive(Debug, Clone)]
pub struct RemoveOptions {
    /// Require this revision to match, else fail with a conflict.
    pub rev: Option<String>,
    /// Wait for the removal to sync to disk.
    pub wait_for_sync: Option<bool>,
    /// Treat a missing document as success.
    pub ignore_missing: bool,
}

impl Default for RemoveOptions {
    fn default() -> Self {
        Self { rev: None, wait_for_sync: None, ignore_missing: true }
    }
}

/// Handle to one collection, generic over the execution mode.
#[derive(Debug, Clone)]
pub struct Collection<C> {
    ctx: C,
    name: String,
}

impl<C: ExecutionContext> Collection<C> {
    pub(crate) fn new(ctx: C, name: impl Into<String>) -> Self {
        Self { ctx, name: name.into() }
    }

    /// Name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Properties of this collection.
    pub async fn properties(&self) -> Result<C::Handle<CollectionProperties>> {
        let request =
            Request::new(Method::GET, format!("/_api/collection/{}/properties", self.name));
        self.ctx
            .handle_request(
                request,
                handler(|res| {
                    if !res.is_success() {
                        return Err(RangoError::Api(res.fault()));
                    }
                    res.decode::<CollectionProperties>()
                }),
            )
            .await
    }

    /// Number of documents in the collection.
    pub async fn count(&self) -> Result<C::Handle<u64>> {
        let request = Request::new(Method::GET, format!("/_api/collection/{}/count", self.name));
        self.ctx
            .handle_request(
                request,
                handler(|res| {
                    if !res.is_success() {
                        return Err(RangoError::Api(res.fault()));
                    }
                    res.decode_field::<u64>("count")
                }),
            )
            .await
    }

    /// Current revision token of the collection.
    pub async fn revision(&self) -> Result<C::Handle<String>> {
        let request =
            Request::new(Method::GET, format!("/_api/collection/{}/revision", self.name));
        self.ctx
            .handle_request(
                request,
                handler(|res| {
                    if !res.is_success() {
                        return Err(RangoError::Api(res.fault()));
                    }
                    res.decode_field::<String>("revision")
                }),
            )
            .await
    }

    /// Whether a document with the given key exists.
    pub async fn has(&self, key: &str) -> Result<C::Handle<bool>> {
        let request =
            Request::new(Method::HEAD, format!("/_api/document/{}/{key}", self.name));
        self.ctx
            .handle_request(
                request,
                handler(|res| match res.status_code {
                    404 => Ok(false),
                    _ if res.is_success() => Ok(true),
                    _ => Err(RangoError::Api(res.fault())),
                }),
            )
            .await
    }

    /// Remove every document, keeping the collection and its indexes.
    pub async fn truncate(&self) -> Result<C::Handle<()>> {
        let request =
            Request::new(Method::PUT, format!("/_api/collection/{}/truncate", self.name));
        self.ctx
            .handle_request(
                request,
                handler(|res| {
                    if res.is_success() {
                        Ok(())
                    } else {
                        Err(RangoError::Api(res.fault()))
                    }
                }),
            )
            .await
    }

    /// Rename the collection, returning the new name.
    ///
    /// This handle keeps addressing the old name; fetch a fresh handle
    /// from the database after the rename resolves.
    pub async fn rename(&self, new_name: &str) -> Result<C::Handle<String>> {
        let request = Request::new(Method::PUT, format!("/_api/collection/{}/rename", self.name))
            .json(&json!({ "name": new_name }))?;
        self.ctx
            .handle_request(
                request,
                handler(|res| {
                    if !res.is_success() {
                        return Err(RangoError::Api(res.fault()));
                    }
                    res.decode_field::<String>("name")
                }),
            )
            .await
    }

    /// Fetch a document by key; `None` when it does not exist.
    ///
    /// With `rev` set, a mismatching revision fails with the server's
    /// precondition fault.
    pub async fn get(&self, key: &str, rev: Option<&str>) -> Result<C::Handle<Option<Value>>> {
        let mut request =
            Request::new(Method::GET, format!("/_api/document/{}/{key}", self.name));
        if let Some(rev) = rev {
            request = request.header("If-Match", rev);
        }
        self.ctx
            .handle_request(
                request,
                handler(|res| match res.status_code {
                    304 | 412 => Err(RangoError::Api(res.fault())),
                    404 => Ok(None),
                    _ if res.is_success() => res.decode::<Value>().map(Some),
                    _ => Err(RangoError::Api(res.fault())),
                }),
            )
            .await
    }

    /// Insert one document; the `_key` field, when present, names the new
    /// document.
    pub async fn insert(
        &self,
        document: &Value,
        wait_for_sync: Option<bool>,
    ) -> Result<C::Handle<DocumentMeta>> {
        let mut request = Request::new(Method::POST, "/_api/document")
            .param("collection", &self.name);
        if let Some(sync) = wait_for_sync {
            request = request.param("waitForSync", sync.to_string());
        }
        let request = request.json(document)?;
        self.ctx
            .handle_request(
                request,
                handler(|res| {
                    if !res.is_success() {
                        return Err(RangoError::Api(res.fault()));
                    }
                    res.decode::<DocumentMeta>()
                }),
            )
            .await
    }

    /// Bulk-insert documents through the import endpoint.
    ///
    /// The payload goes over the wire as raw JSON lines. With
    /// `halt_on_error` the server aborts the whole import on the first
    /// invalid document; otherwise failures are counted (and detailed,
    /// with `details`) in the [`ImportResult`].
    pub async fn insert_many(
        &self,
        documents: &[Value],
        halt_on_error: bool,
        details: bool,
    ) -> Result<C::Handle<ImportResult>> {
        let lines: Vec<String> = documents.iter().map(Value::to_string).collect();
        let request = Request::new(Method::POST, "/_api/import")
            .param("type", "documents")
            .param("collection", &self.name)
            .param("complete", halt_on_error.to_string())
            .param("details", details.to_string())
            .raw(lines.join("\r\n"));
        self.ctx
            .handle_request(
                request,
                handler(|res| {
                    if !res.is_success() {
                        return Err(RangoError::Api(res.fault()));
                    }
                    res.decode::<ImportResult>()
                }),
            )
            .await
    }

    /// Partially update a document, returning its new meta.
    pub async fn update(
        &self,
        key: &str,
        patch: &Value,
        options: UpdateOptions,
    ) -> Result<C::Handle<DocumentMeta>> {
        let mut request =
            Request::new(Method::PATCH, format!("/_api/document/{}/{key}", self.name))
                .param("keepNull", options.keep_null.to_string())
                .param("mergeObjects", options.merge_objects.to_string());
        if let Some(sync) = options.wait_for_sync {
            request = request.param("waitForSync", sync.to_string());
        }
        if let Some(rev) = &options.rev {
            request = request.header("If-Match", rev.clone());
        }
        let request = request.json(patch)?;
        self.ctx
            .handle_request(
                request,
                handler(|res| {
                    if !res.is_success() {
                        return Err(RangoError::Api(res.fault()));
                    }
                    res.decode::<DocumentMeta>()
                }),
            )
            .await
    }

    /// Replace a document wholesale, returning its new meta.
    pub async fn replace(
        &self,
        key: &str,
        document: &Value,
        rev: Option<&str>,
        wait_for_sync: Option<bool>,
    ) -> Result<C::Handle<DocumentMeta>> {
        let mut request =
            Request::new(Method::PUT, format!("/_api/document/{}/{key}", self.name));
        if let Some(sync) = wait_for_sync {
            request = request.param("waitForSync", sync.to_string());
        }
        if let Some(rev) = rev {
            request = request.header("If-Match", rev);
        }
        let request = request.json(document)?;
        self.ctx
            .handle_request(
                request,
                handler(|res| {
                    if !res.is_success() {
                        return Err(RangoError::Api(res.fault()));
                    }
                    res.decode::<DocumentMeta>()
                }),
            )
            .await
    }

    /// Remove a document by key; `None` when it was already gone and
    /// [`RemoveOptions::ignore_missing`] is set.
    pub async fn remove(
        &self,
        key: &str,
        options: RemoveOptions,
    ) -> Result<C::Handle<Option<DocumentMeta>>> {
        let mut request =
            Request::new(Method::DELETE, format!("/_api/document/{}/{key}", self.name));
        if let Some(sync) = options.wait_for_sync {
            request = request.param("waitForSync", sync.to_string());
        }
        if let Some(rev) = &options.rev {
            request = request.header("If-Match", rev.clone());
        }
        let ignore_missing = options.ignore_missing;
        self.ctx
            .handle_request(
                request,
                handler(move |res| match res.status_code {
                    412 => Err(RangoError::Api(res.fault())),
                    404 if ignore_missing => Ok(None),
                    _ if res.is_success() => res.decode::<DocumentMeta>().map(Some),
                    _ => Err(RangoError::Api(res.fault())),
                }),
            )
            .await
    }

    /// Remove every document with one of the given keys.
    pub async fn remove_many(&self, keys: &[String]) -> Result<C::Handle<RemoveByKeysResult>> {
        let request = Request::new(Method::PUT, "/_api/simple/remove-by-keys")
            .json(&json!({ "collection": self.name, "keys": keys }))?;
        self.ctx
            .handle_request(
                request,
                handler(|res| {
                    if !res.is_success() {
                        return Err(RangoError::Api(res.fault()));
                    }
                    res.decode::<RemoveByKeysResult>()
                }),
            )
            .await
    }

    /// Stream every document of the collection through a cursor.
    pub async fn all(&self, batch_size: Option<u64>) -> Result<C::Handle<Cursor>> {
        let mut body = json!({ "collection": self.name });
        if let Some(batch_size) = batch_size {
            body["batchSize"] = batch_size.into();
        }
        let request = Request::new(Method::PUT, "/_api/simple/all").json(&body)?;
        let conn = self.ctx.connection().clone();
        self.ctx
            .handle_request(
                request,
                handler(move |res| {
                    if !res.is_success() {
                        return Err(RangoError::Api(res.fault()));
                    }
                    let page = res.decode::<CursorPage>()?;
                    Ok(Cursor::new(conn.clone(), page))
                }),
            )
            .await
    }
}
