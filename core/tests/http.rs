//! End-to-end benchmark scenarios against a local mock server

use std::time::{Duration, Instant};

use katyusha_core::{Benchmark, BenchmarkParameters, Headers, ParameterGroups};
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn base_params(url: &str) -> BenchmarkParameters {
    BenchmarkParameters {
        url: url.to_string(),
        req_count: 1,
        concurrent_conns: 1,
        ..Default::default()
    }
}

#[tokio::test]
async fn single_request_with_echoed_header() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(header("TEST", "TEST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("Test")
                .set_delay(Duration::from_secs(1)),
        )
        .mount(&server)
        .await;

    let mut params = base_params(&server.uri());
    let mut headers = Headers::new();
    headers.set("TEST: TEST").unwrap();
    params.headers = headers;

    let summary = Benchmark::new(params).unwrap().run().await;

    assert_eq!(summary.success, 1);
    assert_eq!(summary.fail, 0);
    assert_eq!(summary.min, summary.max);
    assert!(summary.req_per_sec >= 1.0);
    assert_eq!(summary.data_transferred, 4);
}

#[tokio::test]
async fn five_serial_requests() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("Test")
                .set_delay(Duration::from_secs(1)),
        )
        .mount(&server)
        .await;

    let mut params = base_params(&server.uri());
    params.req_count = 5;

    let started = Instant::now();
    let summary = Benchmark::new(params).unwrap().run().await;
    let elapsed = started.elapsed();

    assert_eq!(summary.success, 5);
    assert_eq!(summary.fail, 0);
    assert!(summary.avg >= Duration::from_secs(1));
    assert!(summary.avg < Duration::from_secs(2));
    assert!(elapsed >= Duration::from_secs(5));
}

#[tokio::test]
async fn post_sends_form_encoded_parameters() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("key=value"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Test"))
        .mount(&server)
        .await;

    let mut params = base_params(&server.uri());
    params.method = "POST".to_string();
    let mut groups = ParameterGroups::new();
    groups.push_group("key=value").unwrap();
    params.parameters = groups;

    let summary = Benchmark::new(params).unwrap().run().await;

    // The mock only matches the exact form body; anything else is a 404.
    assert_eq!(summary.success, 1);
    assert_eq!(summary.fail, 0);
}

#[tokio::test]
async fn get_sends_query_parameters() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("key", "value"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Test"))
        .mount(&server)
        .await;

    let mut params = base_params(&server.uri());
    let mut groups = ParameterGroups::new();
    groups.push_group("key=value").unwrap();
    params.parameters = groups;

    let summary = Benchmark::new(params).unwrap().run().await;

    assert_eq!(summary.success, 1);
    assert_eq!(summary.fail, 0);
}

#[tokio::test]
async fn post_body_reaches_the_server() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string("TEST BODY"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut params = base_params(&server.uri());
    params.method = "POST".to_string();
    params.body = b"TEST BODY".to_vec();

    let summary = Benchmark::new(params).unwrap().run().await;

    assert_eq!(summary.success, 1);
}

#[tokio::test]
async fn abort_after_stops_failing_run() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut params = base_params(&server.uri());
    params.req_count = 1000;
    params.concurrent_conns = 10;
    params.abort_after = 5;

    let summary = Benchmark::new(params).unwrap().run().await;

    assert!(summary.fail >= 5);
    assert!(summary.req_count < 1000);
    assert!(summary.errors["Internal Server Error"] >= 5);
    assert_eq!(summary.errors.values().sum::<u64>(), summary.fail);
}

#[tokio::test]
async fn duration_stop_against_fast_server() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let mut params = base_params(&server.uri());
    params.req_count = 0;
    params.concurrent_conns = 2;
    params.duration = Duration::from_secs(2);

    let summary = Benchmark::new(params).unwrap().run().await;

    assert!(summary.success > 0);
    assert!(summary.total_time >= Duration::from_secs(2));
    assert!(summary.total_time < Duration::from_secs(4));
}

#[tokio::test]
async fn target_version_is_probed_before_the_run() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/version"))
        .respond_with(ResponseTemplate::new(200).set_body_string("  9.9.1\n"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let mut params = base_params(&server.uri());
    params.target_endpoint = "/version".to_string();

    let summary = Benchmark::new(params).unwrap().run().await;

    assert_eq!(summary.target_version, "9.9.1");
    assert_eq!(summary.success, 1);
}

#[tokio::test]
async fn rerun_observes_equal_request_counts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let mut params = base_params(&server.uri());
    params.req_count = 20;
    params.concurrent_conns = 4;

    let benchmark = Benchmark::new(params).unwrap();
    let first = benchmark.run().await;
    let second = benchmark.run().await;

    assert_eq!(first.req_count, 20);
    assert_eq!(first.req_count, second.req_count);
}
