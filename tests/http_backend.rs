//! Failure injection against a real TCP backend through the reqwest transport.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use resilient_client::config::ClientConfig;
use resilient_client::http::ReqwestTransport;
use resilient_client::{ApiError, CircuitStatus, ResilientClient};

mod common;

fn config_for(base_url: String) -> ClientConfig {
    let mut config = ClientConfig::new(base_url);
    config.timeout_secs = 2.0;
    config.resilience.base_delay_secs = 0.01;
    config.resilience.backoff_factor = 2.0;
    config
}

fn client_for(config: ClientConfig) -> ResilientClient {
    let http = reqwest::Client::builder().no_proxy().build().unwrap();
    ResilientClient::with_transport(config, Arc::new(ReqwestTransport::with_client(http))).unwrap()
}

#[tokio::test]
async fn test_retry_on_server_error() {
    let call_count = Arc::new(AtomicU32::new(0));
    let cc = call_count.clone();
    let addr = common::start_programmable_backend(move || {
        let cc = cc.clone();
        async move {
            let count = cc.fetch_add(1, Ordering::SeqCst);
            if count < 2 {
                (503, r#"{"error": "unavailable"}"#.into())
            } else {
                (200, r#"{"status": "ok"}"#.into())
            }
        }
    })
    .await;

    let client = client_for(config_for(format!("http://{}", addr)));
    let response = client.get("/health", None).await.expect("should succeed after retries");

    assert_eq!(response.status_code(), 200);
    assert_eq!(response.json_value().unwrap()["status"], "ok");
    assert_eq!(call_count.load(Ordering::SeqCst), 3, "Should have attempted 3 times");
    assert_eq!(client.get_resilience_state().consecutive_failures, 0);
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let call_count = Arc::new(AtomicU32::new(0));
    let cc = call_count.clone();
    let addr = common::start_programmable_backend(move || {
        let cc = cc.clone();
        async move {
            cc.fetch_add(1, Ordering::SeqCst);
            (404, r#"{"error": "missing"}"#.into())
        }
    })
    .await;

    let client = client_for(config_for(format!("http://{}", addr)));
    let err = client.get("/nothing", None).await.unwrap_err();

    match err {
        ApiError::Client { status, body } => {
            assert_eq!(status.as_u16(), 404);
            assert!(body.contains("missing"));
        }
        other => panic!("expected client error, got {:?}", other),
    }
    assert_eq!(call_count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_connection_refused_trips_breaker() {
    let addr = common::closed_port().await;
    let mut config = config_for(format!("http://{}", addr));
    config.resilience.max_retries = 1;
    config.resilience.circuit_breaker_threshold = 2;
    let client = client_for(config);

    let err = client.get("/", None).await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)), "got {:?}", err);
    assert_eq!(client.get_resilience_state().status, CircuitStatus::Open);

    let err = client.get("/", None).await.unwrap_err();
    assert!(err.is_circuit_open());
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let addr = common::start_programmable_backend(|| async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        (200, "{}".into())
    })
    .await;

    let mut config = config_for(format!("http://{}", addr));
    config.timeout_secs = 0.05;
    config.resilience.max_retries = 0;
    let client = client_for(config);

    let err = client.get("/slow", None).await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(client.get_resilience_state().consecutive_failures, 1);
}

#[tokio::test]
async fn test_concurrent_callers_share_one_client() {
    let addr = common::start_programmable_backend(|| async { (200, r#"{"ok": true}"#.into()) }).await;
    let client = Arc::new(client_for(config_for(format!("http://{}", addr))));
    client.set_auth_token("token-1").unwrap();

    let mut tasks = Vec::new();
    for i in 0..10 {
        let client = client.clone();
        tasks.push(tokio::spawn(async move {
            for _ in 0..5 {
                client
                    .post("/items", Some(&serde_json::json!({ "task": i })), None)
                    .await
                    .unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let state = client.get_resilience_state();
    assert_eq!(state.status, CircuitStatus::Closed);
    assert_eq!(state.consecutive_failures, 0);
}

#[tokio::test]
async fn test_backend_reads_body_sent_after_head() {
    use tokio::io::AsyncWriteExt;
    use tokio::net::{TcpListener, TcpStream};

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        common::read_request(&mut socket).await.unwrap()
    });

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"POST /items HTTP/1.1\r\nHost: test\r\nContent-Length: 11\r\n\r\n")
        .await
        .unwrap();
    stream.flush().await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    stream.write_all(b"{\"id\": 42}\n").await.unwrap();

    assert_eq!(server.await.unwrap(), b"{\"id\": 42}\n");
}

#[tokio::test]
async fn test_large_post_bodies_are_accepted() {
    let addr = common::start_programmable_backend(|| async { (200, r#"{"ok": true}"#.into()) }).await;
    let client = client_for(config_for(format!("http://{}", addr)));
    let payload = serde_json::json!({ "blob": "x".repeat(256 * 1024) });

    for _ in 0..5 {
        let response = client.post("/upload", Some(&payload), None).await.unwrap();
        assert_eq!(response.status_code(), 200);
    }
    assert_eq!(client.get_resilience_state().consecutive_failures, 0);
}
