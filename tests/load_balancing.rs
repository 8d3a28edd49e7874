//! End-to-end tests: real listeners, real backends, real hyper transport.

use std::time::Duration;

use axum::http::StatusCode;

mod common;

#[tokio::test]
async fn requests_rotate_across_backends() {
    let (a, seen_a) = common::start_recording_backend("a").await;
    let (b, seen_b) = common::start_recording_backend("b").await;
    let proxy = common::start_proxy(common::config(vec![common::pool(&[a, b])])).await;
    let client = common::client();

    let mut bodies = Vec::new();
    for _ in 0..4 {
        let response = client.get(proxy.url(0, "/")).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        bodies.push(response.text().await.unwrap());
    }

    assert_ne!(bodies[0], bodies[1]);
    assert_eq!(bodies[0], bodies[2]);
    assert_eq!(bodies[1], bodies[3]);
    assert_eq!(seen_a.lock().unwrap().len(), 2);
    assert_eq!(seen_b.lock().unwrap().len(), 2);

    proxy.stop().await;
}

#[tokio::test]
async fn pools_are_independent() {
    let (a, _) = common::start_recording_backend("a").await;
    let (b, _) = common::start_recording_backend("b").await;
    let proxy = common::start_proxy(common::config(vec![
        common::pool(&[a]),
        common::pool(&[b]),
    ]))
    .await;
    let client = common::client();

    let first = client.get(proxy.url(0, "/")).send().await.unwrap();
    let second = client.get(proxy.url(1, "/")).send().await.unwrap();

    assert_eq!(first.text().await.unwrap(), "a");
    assert_eq!(second.text().await.unwrap(), "b");

    proxy.stop().await;
}

#[tokio::test]
async fn host_override_and_path_reach_backend() {
    let (a, seen) = common::start_recording_backend("a").await;
    let mut pool = common::pool(&[a]);
    pool.host = Some("app.example".into());
    let proxy = common::start_proxy(common::config(vec![pool])).await;

    let response = common::client()
        .get(proxy.url(0, "/orders/7?expand=1"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let request = seen.lock().unwrap()[0].to_lowercase();
    assert!(request.starts_with("get /orders/7?expand=1 http/1.1"));
    assert!(request.contains("host: app.example\r\n"));
    assert!(request.contains("x-forwarded-for: 127.0.0.1"));
    assert!(request.contains("x-request-id: "));

    proxy.stop().await;
}

#[tokio::test]
async fn dead_primaries_send_traffic_to_backup() {
    let (a, seen_a) = common::start_recording_backend("a").await;
    let (backup, seen_backup) = common::start_recording_backend("backup").await;
    let mut pool = common::pool(&[a]);
    pool.backup = Some(format!("http://{backup}"));
    let proxy = common::start_proxy(common::config(vec![pool])).await;
    proxy.status.set_status(&a.to_string(), 0);

    for _ in 0..3 {
        let response = common::client().get(proxy.url(0, "/")).send().await.unwrap();
        assert_eq!(response.text().await.unwrap(), "backup");
    }
    assert!(seen_a.lock().unwrap().is_empty());
    assert_eq!(seen_backup.lock().unwrap().len(), 3);

    proxy.stop().await;
}

#[tokio::test]
async fn dead_primaries_without_backup_answer_503() {
    let (a, _) = common::start_recording_backend("a").await;
    let proxy = common::start_proxy(common::config(vec![common::pool(&[a])])).await;
    proxy.status.set_status(&a.to_string(), 0);

    let response = common::client().get(proxy.url(0, "/")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.text().await.unwrap(), "Service not available");

    proxy.stop().await;
}

#[tokio::test]
async fn refused_primary_replays_request_on_backup() {
    let dead = common::dead_addr().await;
    let (backup, seen_backup) = common::start_recording_backend("backup").await;
    let mut pool = common::pool(&[dead]);
    pool.backup = Some(format!("http://{backup}"));
    let proxy = common::start_proxy(common::config(vec![pool])).await;

    // Not yet swept, so the dead primary is still seeded alive.
    let response = common::client()
        .post(proxy.url(0, "/submit"))
        .body("order=42")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "backup");
    let request = seen_backup.lock().unwrap()[0].clone();
    assert!(request.starts_with("POST /submit HTTP/1.1"));
    assert!(request.ends_with("order=42"));

    proxy.stop().await;
}

#[tokio::test]
async fn refused_primary_without_backup_answers_502() {
    let dead = common::dead_addr().await;
    let proxy = common::start_proxy(common::config(vec![common::pool(&[dead])])).await;

    let response = common::client().get(proxy.url(0, "/")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    // Forwarding failures leave health state alone.
    assert_eq!(proxy.status.get_status(&dead.to_string()), (10, true));

    proxy.stop().await;
}

#[tokio::test]
async fn sweep_evicts_dead_backend() {
    let (alive, _) = common::start_recording_backend("alive").await;
    let dead = common::dead_addr().await;
    let mut config = common::config(vec![common::pool(&[dead, alive])]);
    config.health_check.interval_secs = 1;
    let proxy = common::start_proxy(config).await;

    // The first sweep runs one interval after start.
    tokio::time::sleep(Duration::from_millis(1600)).await;

    assert_eq!(proxy.status.get_status(&dead.to_string()), (0, false));
    let (rtt, is_alive) = proxy.status.get_status(&alive.to_string());
    assert!(is_alive);
    assert!(rtt >= 1);

    for _ in 0..3 {
        let response = common::client().get(proxy.url(0, "/")).send().await.unwrap();
        assert_eq!(response.text().await.unwrap(), "alive");
    }

    proxy.stop().await;
}
