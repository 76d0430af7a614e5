//! End-to-end pagination runs against a mock OTX API and an in-memory store

mod common;

use common::{fast_policy, page, pulse, test_client, MemoryStore, PULSES_PATH};
use otx_ingest::sink::PulseSink;
use otx_ingest::sync::{PulseSync, StopReason, SyncOptions};
use serde_json::json;
use std::time::{Duration, Instant};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

fn build_sync(server: &MockServer, store: MemoryStore, max_pages: u32) -> PulseSync<MemoryStore> {
    PulseSync::new(
        test_client(server, fast_policy(3)),
        PulseSink::new(store),
        SyncOptions::new(max_pages, Duration::ZERO),
    )
}

fn start_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), PULSES_PATH)
}

async fn mount_page(server: &MockServer, route: &str, body: serde_json::Value, expected: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_single_page_without_description() {
    let server = MockServer::start().await;
    let body = json!({
        "results": [{
            "id": "p1",
            "name": "A",
            "created": "2024-01-01T00:00:00Z",
            "modified": "2024-01-02T00:00:00Z"
        }],
        "next": null
    });
    mount_page(&server, PULSES_PATH, body, 1).await;

    let sync = build_sync(&server, MemoryStore::new(), 3);
    let summary = sync.run(&start_url(&server)).await;

    assert_eq!(summary.pages, 1);
    assert_eq!(summary.records_written, 1);
    assert_eq!(summary.stop_reason, StopReason::Exhausted);

    let store = sync.sink().store();
    assert_eq!(store.write_count(), 1);
    let record = store.get("p1").unwrap();
    assert_eq!(record.name, "A");
    assert_eq!(record.description, "");
}

#[tokio::test]
async fn test_follows_next_until_exhausted() {
    let server = MockServer::start().await;
    let uri = server.uri();

    mount_page(
        &server,
        PULSES_PATH,
        page(vec![pulse("p1", "A"), pulse("p2", "B")], Some(format!("{}/page2", uri))),
        1,
    )
    .await;
    mount_page(
        &server,
        "/page2",
        page(vec![pulse("p3", "C")], Some(format!("{}/page3", uri))),
        1,
    )
    .await;
    mount_page(&server, "/page3", page(vec![pulse("p4", "D")], None), 1).await;

    let sync = build_sync(&server, MemoryStore::new(), 0);
    let summary = sync.run(&start_url(&server)).await;

    assert_eq!(summary.pages, 3);
    assert_eq!(summary.records_written, 4);
    assert_eq!(summary.stop_reason, StopReason::Exhausted);
    assert_eq!(sync.sink().store().len(), 4);
}

#[tokio::test]
async fn test_page_ceiling_stops_despite_next() {
    let server = MockServer::start().await;
    let uri = server.uri();

    mount_page(
        &server,
        PULSES_PATH,
        page(vec![pulse("p1", "A")], Some(format!("{}/page2", uri))),
        1,
    )
    .await;
    mount_page(
        &server,
        "/page2",
        page(vec![pulse("p2", "B")], Some(format!("{}/page3", uri))),
        1,
    )
    .await;
    mount_page(&server, "/page3", page(vec![pulse("p3", "C")], None), 0).await;

    let sync = build_sync(&server, MemoryStore::new(), 2);
    let summary = sync.run(&start_url(&server)).await;

    assert_eq!(summary.pages, 2);
    assert_eq!(summary.stop_reason, StopReason::PageLimit);
    assert!(sync.sink().store().get("p3").is_none());
}

#[tokio::test]
async fn test_fetch_failure_stops_loop() {
    let server = MockServer::start().await;
    let uri = server.uri();

    mount_page(
        &server,
        PULSES_PATH,
        page(vec![pulse("p1", "A")], Some(format!("{}/page2", uri))),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&server)
        .await;

    let sync = build_sync(&server, MemoryStore::new(), 0);
    let summary = sync.run(&start_url(&server)).await;

    assert_eq!(summary.pages, 1);
    assert_eq!(summary.records_written, 1);
    assert_eq!(summary.stop_reason, StopReason::FetchFailed);
}

#[tokio::test]
async fn test_empty_body_stops_loop() {
    let server = MockServer::start().await;
    mount_page(&server, PULSES_PATH, json!({}), 1).await;

    let sync = build_sync(&server, MemoryStore::new(), 0);
    let summary = sync.run(&start_url(&server)).await;

    assert_eq!(summary.pages, 0);
    assert_eq!(summary.stop_reason, StopReason::EmptyPage);
    assert_eq!(sync.sink().store().write_count(), 0);
}

#[tokio::test]
async fn test_empty_results_page_is_noop() {
    let server = MockServer::start().await;
    mount_page(&server, PULSES_PATH, page(vec![], None), 1).await;

    let sync = build_sync(&server, MemoryStore::new(), 0);
    let summary = sync.run(&start_url(&server)).await;

    assert_eq!(summary.pages, 1);
    assert_eq!(summary.records_written, 0);
    assert_eq!(summary.stop_reason, StopReason::Exhausted);
    assert_eq!(sync.sink().store().write_count(), 0);
}

#[tokio::test]
async fn test_store_failure_does_not_stop_pagination() {
    let server = MockServer::start().await;
    let uri = server.uri();

    mount_page(
        &server,
        PULSES_PATH,
        page(
            vec![pulse("p1", "A"), pulse("p2", "B"), pulse("p3", "C")],
            Some(format!("{}/page2", uri)),
        ),
        1,
    )
    .await;
    mount_page(&server, "/page2", page(vec![pulse("p4", "D")], None), 1).await;

    let sync = build_sync(&server, MemoryStore::failing_on("p2"), 0);
    let summary = sync.run(&start_url(&server)).await;

    assert_eq!(summary.pages, 2);
    // Page 1 reports nothing written even though p1 landed
    assert_eq!(summary.records_written, 1);
    assert_eq!(summary.stop_reason, StopReason::Exhausted);

    let store = sync.sink().store();
    assert!(store.get("p1").is_some());
    assert!(store.get("p3").is_none());
    assert!(store.get("p4").is_some());
}

#[tokio::test]
async fn test_malformed_pulses_are_skipped() {
    let server = MockServer::start().await;
    let body = page(
        vec![
            pulse("p1", "A"),
            json!({ "name": "no id", "created": "x", "modified": "y" }),
            pulse("p2", "B"),
        ],
        None,
    );
    mount_page(&server, PULSES_PATH, body, 1).await;

    let sync = build_sync(&server, MemoryStore::new(), 0);
    let summary = sync.run(&start_url(&server)).await;

    assert_eq!(summary.records_written, 2);
    assert_eq!(summary.records_skipped, 1);
    assert_eq!(sync.sink().store().len(), 2);
}

#[tokio::test]
async fn test_repeated_runs_are_idempotent() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        PULSES_PATH,
        page(vec![pulse("p1", "A"), pulse("p2", "B")], None),
        2,
    )
    .await;

    let sync = build_sync(&server, MemoryStore::new(), 0);

    sync.run(&start_url(&server)).await;
    let first = sync.sink().store().get("p1").unwrap();

    sync.run(&start_url(&server)).await;
    let second = sync.sink().store().get("p1").unwrap();

    assert_eq!(sync.sink().store().len(), 2);
    assert_eq!(second.name, first.name);
    assert_eq!(second.modified, first.modified);
    assert!(second.ingested_at >= first.ingested_at);
}

#[tokio::test]
async fn test_rate_limited_page_is_retried_in_loop() {
    let server = MockServer::start().await;
    let uri = server.uri();

    mount_page(
        &server,
        PULSES_PATH,
        page(vec![pulse("p1", "A")], Some(format!("{}/page2", uri))),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(3)
        .with_priority(1)
        .expect(3)
        .mount(&server)
        .await;
    mount_page(&server, "/page2", page(vec![pulse("p2", "B")], None), 1).await;

    let sync = build_sync(&server, MemoryStore::new(), 0);
    let summary = sync.run(&start_url(&server)).await;

    assert_eq!(summary.pages, 2);
    assert_eq!(summary.records_written, 2);
    assert_eq!(summary.stop_reason, StopReason::Exhausted);
}

#[tokio::test]
async fn test_pages_are_paced() {
    let server = MockServer::start().await;
    let uri = server.uri();

    mount_page(
        &server,
        PULSES_PATH,
        page(vec![pulse("p1", "A")], Some(format!("{}/page2", uri))),
        1,
    )
    .await;
    mount_page(&server, "/page2", page(vec![pulse("p2", "B")], None), 1).await;

    let sync = PulseSync::new(
        test_client(&server, fast_policy(3)),
        PulseSink::new(MemoryStore::new()),
        SyncOptions::new(0, Duration::from_millis(250)),
    );

    let started = Instant::now();
    let summary = sync.run(&start_url(&server)).await;

    assert_eq!(summary.pages, 2);
    assert!(started.elapsed() >= Duration::from_millis(250));
}
