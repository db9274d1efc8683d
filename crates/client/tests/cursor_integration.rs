//! End-to-end behavior of cursor pagination through the API surface:
//! exact row counts across page layouts and close idempotence.

use rango_client::AqlQuery;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;

#[tokio::test]
async fn a_query_yields_every_row_across_pages_then_ends() {
    let server = MockServer::start().await;

    // 5 rows over 3 server-side pages.
    Mock::given(method("POST"))
        .and(path("/_db/testdb/_api/cursor"))
        .and(body_partial_json(json!({"query": "FOR u IN users RETURN u.n", "count": true})))
        .respond_with(ResponseTemplate::new(201).set_body_string(
            r#"{"id":"c42","result":[1,2],"hasMore":true,"count":5}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let pages = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let pages_clone = pages.clone();
    Mock::given(method("PUT"))
        .and(path("/_db/testdb/_api/cursor/c42"))
        .respond_with(move |_req: &wiremock::Request| -> ResponseTemplate {
            if pages_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0 {
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"id":"c42","result":[3,4],"hasMore":true}"#)
            } else {
                ResponseTemplate::new(200).set_body_string(r#"{"result":[5],"hasMore":false}"#)
            }
        })
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/_db/testdb/_api/cursor/c42"))
        .respond_with(ResponseTemplate::new(202).set_body_string(r#"{"id":"c42"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let db = support::database_on(&server);
    let mut cursor = db
        .query()
        .execute(AqlQuery::new("FOR u IN users RETURN u.n").count(true).batch_size(2))
        .await
        .expect("cursor");

    assert_eq!(cursor.count(), Some(5));
    let mut rows = Vec::new();
    while let Some(row) = cursor.next().await.expect("row") {
        rows.push(row);
    }
    assert_eq!(rows, vec![json!(1), json!(2), json!(3), json!(4), json!(5)]);

    // The sequence has ended for good; further calls stay at the end and
    // perform no I/O (the DELETE above was already consumed exactly once).
    assert_eq!(cursor.next().await.expect("end"), None);
    assert_eq!(cursor.next().await.expect("end"), None);
}

#[tokio::test]
async fn a_single_page_result_needs_no_server_side_cursor() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/_db/testdb/_api/cursor"))
        .respond_with(ResponseTemplate::new(201).set_body_string(
            r#"{"result":["only"],"hasMore":false}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let db = support::database_on(&server);
    let mut cursor =
        db.query().execute(AqlQuery::new("RETURN 'only'")).await.expect("cursor");

    assert_eq!(cursor.id(), None);
    assert_eq!(cursor.next().await.expect("row"), Some(json!("only")));
    assert_eq!(cursor.next().await.expect("end"), None);

    // Closing a cursor that never had a server-side id is a local no-op,
    // no matter how often it runs.
    assert!(!cursor.close().await.expect("close"));
    assert!(!cursor.close().await.expect("close"));
    assert_eq!(server.received_requests().await.expect("requests").len(), 1);
}

#[tokio::test]
async fn bound_queries_reach_the_wire_with_their_parameters() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/_db/testdb/_api/cursor"))
        .and(body_partial_json(json!({
            "query": "FOR u IN @@col FILTER u.age > @age RETURN u",
            "bindVars": {"@col": "users", "age": 42},
        })))
        .respond_with(ResponseTemplate::new(201).set_body_string(
            r#"{"result":[],"hasMore":false}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let db = support::database_on(&server);
    let mut cursor = db
        .query()
        .execute(
            AqlQuery::new("FOR u IN @@col FILTER u.age > @age RETURN u")
                .bind("@col", "users")
                .bind("age", 42),
        )
        .await
        .expect("cursor");
    assert_eq!(cursor.next().await.expect("end"), None);
}

#[tokio::test]
async fn collection_scans_stream_through_the_same_cursor_protocol() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/_db/testdb/_api/simple/all"))
        .and(body_partial_json(json!({"collection": "users", "batchSize": 2})))
        .respond_with(ResponseTemplate::new(201).set_body_string(
            r#"{"id":"s7","result":[{"_key":"1"},{"_key":"2"}],"hasMore":true}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/_db/testdb/_api/cursor/s7"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"result":[{"_key":"3"}],"hasMore":false}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/_db/testdb/_api/cursor/s7"))
        .respond_with(ResponseTemplate::new(202).set_body_string(r#"{"id":"s7"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let db = support::database_on(&server);
    let mut cursor = db.collection("users").all(Some(2)).await.expect("cursor");
    let rows = cursor.collect_rows().await.expect("rows");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2]["_key"], "3");
}
