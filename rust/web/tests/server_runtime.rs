use hilvan_web::config::ServerSettings;
use hilvan_web::server::WebServer;
use serde_json::{json, Value};
use std::time::Duration;
use warp::hyper::{self, Body, Client as HyperClient, Request};

async fn send(
    client: &HyperClient<hyper::client::HttpConnector>,
    method: hyper::Method,
    uri: String,
    body: Option<Value>,
) -> (hyper::StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(hyper::header::CONTENT_TYPE, "application/json")
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .expect("build request");
    let response = client.request(request).await.expect("send request");
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body())
        .await
        .expect("read body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, json)
}

#[tokio::test]
async fn ticker_drives_rounds_on_a_live_server() {
    let mut settings = ServerSettings::default();
    settings.port = 0;
    settings.tick_interval_ms = 20;
    let handle = WebServer::new(settings).start().await.expect("start server");
    let base = format!("http://{}", handle.address());
    let client = HyperClient::new();

    let (status, body) = send(&client, hyper::Method::GET, format!("{base}/health"), None).await;
    assert_eq!(status, hyper::StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(
        &client,
        hyper::Method::POST,
        format!("{base}/api/sessions"),
        Some(json!({ "seed": 5, "round_secs": 1 })),
    )
    .await;
    assert_eq!(status, hyper::StatusCode::CREATED);
    let sid = body["session_id"].as_str().unwrap().to_string();

    let mut players = Vec::new();
    for _ in 0..2 {
        let (_, body) = send(
            &client,
            hyper::Method::POST,
            format!("{base}/api/sessions/{sid}/players"),
            None,
        )
        .await;
        players.push(body["player_id"].as_u64().unwrap());
    }
    for p in &players {
        let (status, _) = send(
            &client,
            hyper::Method::POST,
            format!("{base}/api/sessions/{sid}/players/{p}/deal"),
            None,
        )
        .await;
        assert_eq!(status, hyper::StatusCode::OK);
    }

    // round 1 lasts one second, then resolution and a one second cleanup
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let (_, state) = send(
        &client,
        hyper::Method::GET,
        format!("{base}/api/sessions/{sid}/state"),
        None,
    )
    .await;
    assert_eq!(state["round"]["number"], 1);
    assert_eq!(state["round"]["phase"], "resolving");
    let committed = state["seats"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|s| s["has_played"] == true)
        .count();
    assert_eq!(committed, 2);

    handle.shutdown().await.expect("clean shutdown");
}

#[tokio::test]
async fn binding_an_unresolvable_host_fails() {
    let mut settings = ServerSettings::default();
    settings.host = "definitely-not-a-host.invalid".into();
    settings.port = 0;
    assert!(WebServer::new(settings).start().await.is_err());
}
