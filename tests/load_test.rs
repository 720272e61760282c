//! Load testing for the load balancer.

use std::time::{Duration, Instant};

mod common;

#[tokio::test]
async fn test_load_performance() {
    // 1. Setup Mock Backends
    let b1 = common::start_mock_backend("Hello from backend").await;
    let b2 = common::start_mock_backend("Hello from backend").await;

    // 2. Start Balancer
    let mut config = common::test_config(&[b1, b2]);
    config.dispatch.workers = Some(4);
    let balancer = common::start_balancer(config).await;

    // 3. Run Load Test
    let concurrency = 20;
    let requests_per_task = 25;
    let total_requests = concurrency * requests_per_task;

    let client = common::client();
    let start = Instant::now();

    let mut handles = Vec::with_capacity(concurrency);
    for _ in 0..concurrency {
        let client = client.clone();
        let url = balancer.url("/load");
        handles.push(tokio::spawn(async move {
            let mut ok = 0usize;
            for _ in 0..requests_per_task {
                if let Ok(res) = client.get(&url).send().await {
                    if res.status() == 200 {
                        ok += 1;
                    }
                }
            }
            ok
        }));
    }

    let mut success = 0;
    for h in handles {
        success += h.await.unwrap();
    }
    let elapsed = start.elapsed();

    println!(
        "{} requests in {:?} ({:.0} req/s)",
        total_requests,
        elapsed,
        total_requests as f64 / elapsed.as_secs_f64()
    );

    assert_eq!(success, total_requests, "Some requests failed under load");
    assert!(elapsed < Duration::from_secs(30), "Load test took too long");
}
