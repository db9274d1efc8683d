#![allow(dead_code)]

//! Shared helpers for the integration suites.

use rango_client::{Connection, Database, StandardExecution};
use rango_domain::constants::{BATCH_BOUNDARY, BATCH_PART_CONTENT_TYPE};
use rango_domain::ConnectionConfig;
use wiremock::MockServer;

/// Connection configuration pointed at a mock server, database `testdb`.
pub fn config_for(server: &MockServer) -> ConnectionConfig {
    let url = url::Url::parse(&server.uri()).expect("mock server uri");
    ConnectionConfig {
        host: url.host_str().expect("host").to_string(),
        port: url.port().expect("port"),
        database: "testdb".into(),
        ..Default::default()
    }
}

/// A database handle in immediate mode, against a mock server.
pub fn database_on(server: &MockServer) -> Database<StandardExecution> {
    Database::new(Connection::new(config_for(server)).expect("connection"))
}

/// One multipart part of a simulated batch reply.
pub fn batch_part(content_id: usize, status: &str, body: &str) -> String {
    format!(
        "--{BATCH_BOUNDARY}\r\nContent-Type: {BATCH_PART_CONTENT_TYPE}\r\nContent-Id: {content_id}\r\n\r\nHTTP/1.1 {status}\r\nContent-Type: application/json; charset=utf-8\r\n\r\n{body}\r\n"
    )
}

/// A complete simulated batch reply from its parts.
pub fn batch_reply(parts: &[String]) -> String {
    format!("{}--{BATCH_BOUNDARY}--\r\n\r\n", parts.concat())
}
