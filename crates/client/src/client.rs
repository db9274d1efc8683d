//! Client entry point: server administration and database handles

use rango_domain::constants::SYSTEM_DATABASE;
use rango_domain::{ConnectionConfig, RangoError, Result, ServerVersion};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::connection::Connection;
use crate::database::Database;
use crate::exec::StandardExecution;
use crate::request::Request;

/// The entry point of the driver.
///
/// Bound to the `_system` database for server-level administration;
/// per-database work goes through [`database`](Self::database), which hands
/// out a [`Database`] in the immediate execution mode to branch into async
/// or batch execution from.
#[derive(Debug, Clone)]
pub struct Client {
    conn: Connection,
}

impl Client {
    /// Connect with the given configuration and verify the server is
    /// reachable.
    ///
    /// The verification is one `HEAD /_api/version` round trip; a server
    /// that answers anything but success fails the connect.
    #[instrument(skip(config), fields(host = %config.host, port = config.port))]
    pub async fn connect(config: ConnectionConfig) -> Result<Self> {
        let conn = Connection::new(config.with_database(SYSTEM_DATABASE))?;
        let response = conn.send(&Request::new(Method::HEAD, "/_api/version")).await?;
        if !response.is_success() {
            return Err(RangoError::Connection(response.fault()));
        }
        debug!("server verified");
        Ok(Self { conn })
    }

    /// Connect without the verification round trip.
    pub fn connect_unchecked(config: ConnectionConfig) -> Result<Self> {
        let conn = Connection::new(config.with_database(SYSTEM_DATABASE))?;
        Ok(Self { conn })
    }

    /// A handle to the named database, in immediate execution mode.
    pub fn database(&self, name: &str) -> Result<Database<StandardExecution>> {
        Ok(Database::new(self.conn.with_database(name)?))
    }

    /// Identity and version of the server.
    pub async fn version(&self) -> Result<ServerVersion> {
        let request = Request::new(Method::GET, "/_api/version").param("details", "false");
        let response = self.conn.send(&request).await?;
        if !response.is_success() {
            return Err(RangoError::Api(response.fault()));
        }
        response.decode()
    }

    /// Component details of the server build.
    pub async fn details(&self) -> Result<Value> {
        let request = Request::new(Method::GET, "/_api/version").param("details", "true");
        let response = self.conn.send(&request).await?;
        if !response.is_success() {
            return Err(RangoError::Api(response.fault()));
        }
        response.decode_field("details")
    }

    /// Names of the databases on the server.
    pub async fn databases(&self) -> Result<Vec<String>> {
        let response = self.conn.get("/_api/database").await?;
        if !response.is_success() {
            return Err(RangoError::Api(response.fault()));
        }
        response.decode_field("result")
    }

    /// Create a database; fails when it already exists.
    pub async fn create_database(&self, name: &str) -> Result<bool> {
        let request =
            Request::new(Method::POST, "/_api/database").json(&json!({ "name": name }))?;
        let response = self.conn.send(&request).await?;
        if !response.is_success() {
            return Err(RangoError::Api(response.fault()));
        }
        response.decode_field("result")
    }

    /// Drop a database. Returns whether anything was dropped; a missing
    /// database is tolerated when `ignore_missing` is set.
    pub async fn delete_database(&self, name: &str, ignore_missing: bool) -> Result<bool> {
        let response = self.conn.delete(&format!("/_api/database/{name}")).await?;
        match response.status_code {
            404 if ignore_missing => Ok(false),
            _ if response.is_success() => Ok(true),
            _ => Err(RangoError::Api(response.fault())),
        }
    }
}
