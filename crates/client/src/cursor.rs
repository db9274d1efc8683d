//! Server-backed cursor: a lazily-paginated sequence of result rows

use rango_domain::{CursorPage, RangoError, Result};
use serde_json::Value;
use tracing::debug;

use crate::connection::Connection;

/// A forward-only sequence of rows backed by a server-side cursor.
///
/// Rows are popped from the current page without I/O; crossing a page
/// boundary blocks on one fetch. When the last row has been yielded the
/// server-side cursor is released and [`next`](Self::next) settles into
/// returning `Ok(None)`. There is no replay: a new traversal needs a new
/// query.
///
/// Intended for sequential consumption by its owner. Cloning duplicates the
/// client-side position but not the server-side cursor; consume one clone.
#[derive(Debug, Clone)]
pub struct Cursor {
    conn: Connection,
    page: CursorPage,
    done: bool,
}

impl Cursor {
    /// Wrap the initial page returned by a query endpoint.
    pub(crate) fn new(conn: Connection, page: CursorPage) -> Self {
        Self { conn, page, done: false }
    }

    /// The server-side cursor id, absent when the first page was the whole
    /// result set.
    pub fn id(&self) -> Option<&str> {
        self.page.id.as_deref()
    }

    /// Total number of rows, when the query requested a count.
    pub fn count(&self) -> Option<u64> {
        self.page.count
    }

    /// Whether the server holds pages beyond the current one.
    pub fn has_more(&self) -> bool {
        self.page.has_more
    }

    /// Statistics and warnings reported with the result, if any.
    pub fn extra(&self) -> Option<&Value> {
        self.page.extra.as_ref()
    }

    /// Yield the next row, fetching the next page when the current one is
    /// exhausted. `Ok(None)` signals the end of the sequence.
    pub async fn next(&mut self) -> Result<Option<Value>> {
        loop {
            if let Some(row) = self.page.result.pop_front() {
                return Ok(Some(row));
            }
            if self.done {
                return Ok(None);
            }
            if !self.page.has_more {
                self.close().await?;
                self.done = true;
                return Ok(None);
            }
            self.fetch_next_page().await?;
        }
    }

    /// Drain the remaining rows into a vector, closing the cursor.
    pub async fn collect_rows(&mut self) -> Result<Vec<Value>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Release the server-side cursor, if one exists.
    ///
    /// Safe to call at any time and any number of times: a cursor that
    /// never had a server-side id returns `Ok(false)` without I/O, and the
    /// server answering "already gone" (404) counts as success, like the
    /// regular acknowledgment (202).
    pub async fn close(&mut self) -> Result<bool> {
        let Some(id) = self.page.id.take() else {
            return Ok(false);
        };
        let response = self.conn.delete(&format!("/_api/cursor/{id}")).await?;
        if !matches!(response.status_code, 202 | 404) {
            return Err(RangoError::CursorClose(response.fault()));
        }
        debug!(cursor = %id, "cursor released");
        Ok(true)
    }

    async fn fetch_next_page(&mut self) -> Result<()> {
        let id = self.page.id.clone().ok_or_else(|| {
            RangoError::Decode("server reported more pages but assigned no cursor id".into())
        })?;
        let response = self.conn.put(&format!("/_api/cursor/{id}")).await?;
        if !response.is_success() {
            return Err(RangoError::CursorNext(response.fault()));
        }
        let mut page: CursorPage = response.decode()?;
        // Later pages may omit the id; keep the original for the close call.
        if page.id.is_none() {
            page.id = Some(id);
        }
        self.page = page;
        Ok(())
    }
}
