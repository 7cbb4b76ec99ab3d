//! Load testing for the traced service: counters must stay exact under
//! concurrency.

use std::collections::HashSet;
use std::time::{Duration, Instant};

mod common;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_counters_exact_under_load() {
    let server = common::start_default_server().await;
    let client = common::client();

    let concurrency = 20;
    let requests_per_task = 25;
    // Every fifth request in each task hits the failing endpoint.
    let failures_per_task = requests_per_task / 5;

    let start = Instant::now();
    let mut tasks = Vec::new();
    for _ in 0..concurrency {
        let client = client.clone();
        let ok_url = server.url("/api/info");
        let fail_url = server.url("/api/fail");
        tasks.push(tokio::spawn(async move {
            let mut latencies = Vec::new();
            let mut trace_ids = Vec::new();
            for i in 0..requests_per_task {
                let url = if i % 5 == 0 { &fail_url } else { &ok_url };
                let req_start = Instant::now();
                let res = client.get(url).send().await.unwrap();
                latencies.push(req_start.elapsed());
                trace_ids.push(res.headers()["x-trace-id"].to_str().unwrap().to_string());
            }
            (latencies, trace_ids)
        }));
    }

    let mut all_latencies: Vec<Duration> = Vec::new();
    let mut trace_ids = HashSet::new();
    for task in tasks {
        let (latencies, ids) = task.await.unwrap();
        all_latencies.extend(latencies);
        trace_ids.extend(ids);
    }

    let total = (concurrency * requests_per_task) as u64;
    let failures = (concurrency * failures_per_task) as u64;
    assert_eq!(server.metrics.request_count(), total);
    assert_eq!(server.metrics.error_count(), failures);
    assert_eq!(trace_ids.len() as u64, total, "trace IDs must not repeat");

    let duration = start.elapsed();
    all_latencies.sort();
    let p50 = all_latencies[all_latencies.len() / 2];
    let p99 = all_latencies[(all_latencies.len() as f64 * 0.99) as usize];

    println!("\n--- Load Test Results ---");
    println!("Total Requests: {}", total);
    println!("Concurrency:    {}", concurrency);
    println!("Total Duration: {:?}", duration);
    println!("Requests/sec:   {:.2}", total as f64 / duration.as_secs_f64());
    println!("P50 Latency:    {:?}", p50);
    println!("P99 Latency:    {:?}", p99);
    println!("-------------------------\n");
}
