use std::collections::BTreeMap;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use devflow_fetch::cache::fingerprint;
use devflow_fetch::{ActionResponse, HttpMethod, ResponseCache, SlidingWindowLimiter};
use serde_json::json;

fn benchmark_fingerprint(c: &mut Criterion) {
    let body = json!({"question": "What is ownership?", "content": "...", "userAnswer": "..."});
    let headers = BTreeMap::from([("Authorization".to_string(), "Bearer token".to_string())]);

    c.bench_function("fingerprint", |b| {
        b.iter(|| {
            fingerprint(
                black_box(HttpMethod::Post),
                black_box("http://localhost:3137/api/ai/answers"),
                Some(&body),
                &headers,
            )
        })
    });
}

fn benchmark_cache_hit(c: &mut Criterion) {
    let cache = ResponseCache::new(true);
    cache.set(
        "GET:/api/tags::{}",
        ActionResponse::success(json!([{"_id": "t1", "name": "rust"}])),
        Duration::from_secs(3600),
        "/api/tags",
    );

    c.bench_function("cache_hit", |b| {
        b.iter(|| cache.get(black_box("GET:/api/tags::{}")))
    });
}

fn benchmark_rate_limit_admission(c: &mut Criterion) {
    let limiter = SlidingWindowLimiter::new(Duration::from_secs(3600));

    c.bench_function("rate_limit_admission", |b| {
        b.iter(|| limiter.can_make_request(black_box("/api/users"), 100, Duration::from_millis(10)))
    });
}

criterion_group!(
    benches,
    benchmark_fingerprint,
    benchmark_cache_hit,
    benchmark_rate_limit_admission
);
criterion_main!(benches);
