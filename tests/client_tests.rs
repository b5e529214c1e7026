//! Composition root: stats export, maintenance and configuration wiring.

mod mocks;

use std::sync::Arc;
use std::time::Duration;

use devflow_fetch::{
    ActionResponse, AppEnvironment, FetchClient, FetchConfig, FetchOptions, RateLimitOptions,
};
use mocks::{MockReply, MockTransport};
use serde_json::{json, Value};

fn production_client(transport: Arc<MockTransport>) -> FetchClient {
    let config = FetchConfig {
        cache_ttl_ms: 1_000,
        sweep_interval_ms: 10_000,
        rate_limit_stale_after_ms: 5_000,
        max_jitter_ms: 0,
        ..FetchConfig::for_environment(AppEnvironment::Production)
    };
    FetchClient::new(config, transport)
}

#[test]
fn test_fetch_outside_async_context() {
    let transport = Arc::new(MockTransport::new(MockReply::ok(json!(["rust", "tokio"]))));
    let client = production_client(transport.clone());

    let response: ActionResponse<Vec<String>> =
        tokio_test::block_on(client.fetch_path("/tags", FetchOptions::get()));

    assert_eq!(response.data.unwrap(), vec!["rust", "tokio"]);
    assert_eq!(
        transport.requests()[0].url,
        "http://localhost:3137/api/tags"
    );
}

#[tokio::test(start_paused = true)]
async fn test_run_sweep_cleans_cache_and_limiter() {
    let transport = Arc::new(MockTransport::new(MockReply::ok(json!({}))));
    let client = production_client(transport);

    let _: ActionResponse<Value> = client.fetch("/api/tags", FetchOptions::get()).await;
    let _: ActionResponse<Value> = client
        .fetch(
            "/api/users",
            FetchOptions::post(json!({})).rate_limit(RateLimitOptions::new(10, Duration::from_secs(1))),
        )
        .await;
    assert_eq!(client.cache().len(), 1);
    assert_eq!(client.rate_limiter().stats().active_windows, 1);

    tokio::time::advance(Duration::from_secs(6)).await;

    let report = client.run_sweep();
    assert_eq!(report.cache_entries_removed, 1);
    assert_eq!(report.rate_limit_windows_removed, 1);
    assert!(client.cache().is_empty());
    assert_eq!(client.rate_limiter().stats().active_windows, 0);
}

#[tokio::test(start_paused = true)]
async fn test_background_maintenance_sweeps_on_interval() {
    let transport = Arc::new(MockTransport::new(MockReply::ok(json!({}))));
    let client = production_client(transport);

    let handle = client.start_maintenance();
    let _: ActionResponse<Value> = client.fetch("/api/tags", FetchOptions::get()).await;
    assert_eq!(client.cache().len(), 1);

    // Entry expires after 1s, first sweep fires at 10s
    tokio::time::sleep(Duration::from_secs(11)).await;
    assert!(client.cache().is_empty());
    assert!(handle.is_running());

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_stats_snapshot_combines_components() {
    let transport = Arc::new(
        MockTransport::new(MockReply::ok(json!({"ok": true})))
            .then(MockReply::status(404, "Not Found")),
    );
    let client = production_client(transport);

    let _: ActionResponse<Value> = client.fetch("/api/missing", FetchOptions::get()).await;
    let _: ActionResponse<Value> = client.fetch("/api/found", FetchOptions::get()).await;
    let _: ActionResponse<Value> = client.fetch("/api/found", FetchOptions::get()).await;

    let stats = client.all_stats();
    assert_eq!(stats.requests.total_requests, 3);
    assert_eq!(stats.requests.successful_requests, 2);
    assert_eq!(stats.requests.failed_requests, 1);
    assert_eq!(stats.cache.total_hits, 1);
    assert_eq!(stats.cache.total_misses, 2);
    assert_eq!(stats.cache.hit_rate, 33.33);
    assert_eq!(stats.environment.environment, AppEnvironment::Production);
    assert!(stats.environment.cache_enabled);

    let snapshot = client.monitoring_snapshot();
    assert_eq!(snapshot.metrics.cache_hit_rate, 33.33);
    assert_eq!(snapshot.metrics.request_success_rate, 66.67);
    assert_eq!(snapshot.metrics.active_cache_entries, 1);

    // Emitters only log; they must not disturb the counters
    client.print_stats();
    client.log_detailed_stats();
    assert_eq!(client.all_stats().requests, stats.requests);
}

#[test]
fn test_config_file_drives_client_construction() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("devflow-fetch.toml");
    std::fs::write(
        &path,
        r#"
api_base_url = "https://devflow.example.com/api"
timeout_ms = 2500
environment = "production"
"#,
    )
    .unwrap();

    let config = devflow_fetch::config::loader::ConfigLoader::new()
        .with_config_path(&path)
        .with_env_source(Default::default())
        .load()
        .unwrap();
    let client = FetchClient::new(config, Arc::new(MockTransport::new(MockReply::ok(json!({})))));

    assert_eq!(client.config().timeout(), Duration::from_millis(2500));
    assert!(client.cache().is_enabled());
    assert_eq!(
        client.url_for("users"),
        "https://devflow.example.com/api/users"
    );
}
