//! Load testing for the shadowing proxy.

use std::time::{Duration, Instant};

mod common;

use common::{client, proxy_config, settle, start_mock_backend, wait_until, MockResponse, TestProxy};

#[tokio::test]
async fn test_load_performance() {
    // 1. Setup mock upstreams that always agree
    let body = r#"{"message":"Hello from backend"}"#;
    let primary = start_mock_backend(MockResponse::json(body)).await;
    let secondary = start_mock_backend(MockResponse::json(body)).await;

    // 2. Start proxy, mirroring a fifth of the traffic
    let mut config = proxy_config(&primary, &secondary);
    config.workers.count = 8;
    config.workers.queue_capacity = 256;
    config.sampling.percentage = 20;
    let proxy = TestProxy::start(config).await;

    // 3. Run load test
    let concurrency = 20;
    let requests_per_task = 50;
    let total_requests = concurrency * requests_per_task;

    let client = client();
    let start = Instant::now();

    let mut tasks = Vec::new();
    for _ in 0..concurrency {
        let client = client.clone();
        let url = proxy.url("/load");
        tasks.push(tokio::spawn(async move {
            let mut latencies = Vec::new();
            for _ in 0..requests_per_task {
                let req_start = Instant::now();
                if let Ok(res) = client.get(&url).send().await {
                    if res.status().is_success() {
                        latencies.push(req_start.elapsed());
                    }
                }
            }
            latencies
        }));
    }

    let mut all_latencies = Vec::new();
    for task in tasks {
        all_latencies.extend(task.await.unwrap());
    }

    let duration = start.elapsed();
    let rps = total_requests as f64 / duration.as_secs_f64();

    assert_eq!(all_latencies.len(), total_requests, "every request must succeed");

    all_latencies.sort();
    let p50 = all_latencies[all_latencies.len() / 2];
    let p95 = all_latencies[(all_latencies.len() as f64 * 0.95) as usize];
    let p99 = all_latencies[(all_latencies.len() as f64 * 0.99) as usize];

    println!("\n--- Load Test Results ---");
    println!("Total Requests: {}", total_requests);
    println!("Concurrency:    {}", concurrency);
    println!("Total Duration: {:?}", duration);
    println!("Requests/sec:   {:.2}", rps);
    println!("P50 Latency:    {:?}", p50);
    println!("P95 Latency:    {:?}", p95);
    println!("P99 Latency:    {:?}", p99);
    println!("Shadowed:       {}/{}", secondary.hits(), total_requests);
    println!("-------------------------\n");

    // 4. Sampling holds exactly under concurrency and agreeing upstreams
    // produce no records
    let expected = total_requests / 5;
    assert!(wait_until(Duration::from_secs(10), || secondary.hits() == expected).await);
    settle().await;
    assert_eq!(secondary.hits(), expected);
    assert_eq!(primary.hits(), total_requests);
    assert!(proxy.sink.is_empty());

    proxy.stop().await.unwrap();
}
