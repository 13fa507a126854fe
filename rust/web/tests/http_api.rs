use hilvan_web::server::{routes, AppContext};
use serde_json::{json, Value};
use warp::http::StatusCode;

async fn call(ctx: &AppContext, method: &str, path: &str, body: Option<Value>) -> (StatusCode, Value) {
    let api = routes(ctx);
    let mut request = warp::test::request().method(method).path(path);
    if let Some(body) = body {
        request = request
            .header("content-type", "application/json")
            .body(body.to_string());
    }
    let response = request.reply(&api).await;
    let status = response.status();
    let json = if response.body().is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(response.body()).expect("json body")
    };
    (status, json)
}

async fn create(ctx: &AppContext) -> String {
    let (status, body) = call(ctx, "POST", "/api/sessions", Some(json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);
    body["session_id"].as_str().expect("session id").to_string()
}

async fn join(ctx: &AppContext, sid: &str) -> u64 {
    let (status, body) = call(ctx, "POST", &format!("/api/sessions/{sid}/players"), None).await;
    assert_eq!(status, StatusCode::CREATED);
    body["player_id"].as_u64().expect("player id")
}

/// Creates a session with two players who have both been dealt, so round 1
/// is active.
async fn started(ctx: &AppContext) -> (String, u64, u64) {
    let sid = create(ctx).await;
    let a = join(ctx, &sid).await;
    let b = join(ctx, &sid).await;
    for p in [a, b] {
        let (status, body) = call(
            ctx,
            "POST",
            &format!("/api/sessions/{sid}/players/{p}/deal"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "applied");
    }
    (sid, a, b)
}

fn hand_of(state: &Value, player: u64) -> Vec<u64> {
    state["seats"]
        .as_array()
        .expect("seats")
        .iter()
        .find(|s| s["player"] == player)
        .expect("seat for player")["hand"]
        .as_array()
        .expect("hand")
        .iter()
        .map(|c| c["id"].as_u64().expect("card id"))
        .collect()
}

#[tokio::test]
async fn health_and_metrics_respond() {
    let ctx = AppContext::new_for_tests();
    let (status, body) = call(&ctx, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = call(&ctx, "GET", "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["total_requests"].as_u64().is_some());
}

#[tokio::test]
async fn session_lifecycle() {
    let ctx = AppContext::new_for_tests();
    let (status, body) = call(
        &ctx,
        "POST",
        "/api/sessions",
        Some(json!({ "seed": 1337, "round_secs": 20 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let sid = body["session_id"].as_str().unwrap().to_string();
    assert_eq!(body["seed"], 1337);
    assert_eq!(body["config"]["round_secs"], 20);

    let (status, info) = call(&ctx, "GET", &format!("/api/sessions/{sid}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["started"], false);
    assert_eq!(info["players"], json!([]));

    let (status, state) = call(&ctx, "GET", &format!("/api/sessions/{sid}/state"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state["started"], false);
    assert!(state["round"].is_null());

    let (status, _) = call(&ctx, "DELETE", &format!("/api/sessions/{sid}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = call(&ctx, "GET", &format!("/api/sessions/{sid}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "session_not_found");
}

#[tokio::test]
async fn create_without_body_uses_defaults() {
    let ctx = AppContext::new_for_tests();
    let api = routes(&ctx);
    let response = warp::test::request()
        .method("POST")
        .path("/api/sessions")
        .reply(&api)
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(body["seed"], 7);
    assert_eq!(body["config"]["round_secs"], 15);
}

#[tokio::test]
async fn invalid_overrides_are_bad_requests() {
    let ctx = AppContext::new_for_tests();
    let (status, body) = call(
        &ctx,
        "POST",
        "/api/sessions",
        Some(json!({ "round_secs": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_config");

    let api = routes(&ctx);
    let response = warp::test::request()
        .method("POST")
        .path("/api/sessions")
        .header("content-type", "application/json")
        .body("{not json")
        .reply(&api)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn oversized_hands_are_bad_requests() {
    let ctx = AppContext::new_for_tests();
    let (status, body) = call(
        &ctx,
        "POST",
        "/api/sessions",
        Some(json!({ "initial_hand_size": u64::MAX })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_config");
    assert!(ctx.sessions().active_sessions().is_empty());
}

#[tokio::test]
async fn third_player_gets_conflict() {
    let ctx = AppContext::new_for_tests();
    let sid = create(&ctx).await;
    join(&ctx, &sid).await;
    join(&ctx, &sid).await;

    let (status, body) = call(&ctx, "POST", &format!("/api/sessions/{sid}/players"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "seats_full");
}

#[tokio::test]
async fn dealing_both_players_starts_round_one() {
    let ctx = AppContext::new_for_tests();
    let (sid, a, _) = started(&ctx).await;

    let (_, state) = call(&ctx, "GET", &format!("/api/sessions/{sid}/state"), None).await;
    assert_eq!(state["started"], true);
    assert_eq!(state["round"]["number"], 1);
    assert_eq!(state["round"]["phase"], "active");
    assert_eq!(hand_of(&state, a).len(), 5);

    // a later start request is a no-op, not an error
    let (status, body) = call(
        &ctx,
        "POST",
        &format!("/api/sessions/{sid}/players/{a}/start"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["reason"], "already_started");
}

#[tokio::test]
async fn second_play_in_a_round_is_rejected_with_202() {
    let ctx = AppContext::new_for_tests();
    let (sid, a, _) = started(&ctx).await;
    let (_, state) = call(&ctx, "GET", &format!("/api/sessions/{sid}/state"), None).await;
    let hand = hand_of(&state, a);

    let play = format!("/api/sessions/{sid}/players/{a}/play");
    let (status, body) = call(&ctx, "POST", &play, Some(json!({ "card_id": hand[0] }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "outcome": "applied" }));

    let (status, body) = call(&ctx, "POST", &play, Some(json!({ "card_id": hand[1] }))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body, json!({ "outcome": "rejected", "reason": "already_played" }));

    let (_, state) = call(&ctx, "GET", &format!("/api/sessions/{sid}/state"), None).await;
    let seat = state["seats"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["player"] == a)
        .unwrap()
        .clone();
    assert_eq!(seat["has_played"], true);
    assert_eq!(seat["played_card"], hand[0]);
}

#[tokio::test]
async fn reset_flag_returns_the_staged_card() {
    let ctx = AppContext::new_for_tests();
    let (sid, a, _) = started(&ctx).await;
    let (_, state) = call(&ctx, "GET", &format!("/api/sessions/{sid}/state"), None).await;
    let card = hand_of(&state, a)[2];

    let base = format!("/api/sessions/{sid}/players/{a}");
    call(&ctx, "POST", &format!("{base}/play"), Some(json!({ "card_id": card }))).await;
    let (status, body) = call(&ctx, "POST", &format!("{base}/reset-flag"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "applied");

    let (status, _) = call(&ctx, "POST", &format!("{base}/play"), Some(json!({ "card_id": card }))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn playing_someone_elses_card_is_rejected() {
    let ctx = AppContext::new_for_tests();
    let (sid, a, b) = started(&ctx).await;
    let (_, state) = call(&ctx, "GET", &format!("/api/sessions/{sid}/state"), None).await;
    let theirs = hand_of(&state, b)[0];

    let (status, body) = call(
        &ctx,
        "POST",
        &format!("/api/sessions/{sid}/players/{a}/play"),
        Some(json!({ "card_id": theirs })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["reason"], "not_owner");
}

#[tokio::test]
async fn unknown_handles_are_not_found() {
    let ctx = AppContext::new_for_tests();
    let sid = create(&ctx).await;

    let (status, body) = call(&ctx, "POST", &format!("/api/sessions/{sid}/players/999/deal"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "player_not_found");

    let (status, body) = call(&ctx, "POST", "/api/sessions/nope/players", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "session_not_found");

    let (status, _) = call(&ctx, "GET", "/api/sessions/nope/events", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(&ctx, "GET", "/api/nowhere", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn leaving_frees_the_seat() {
    let ctx = AppContext::new_for_tests();
    let sid = create(&ctx).await;
    let a = join(&ctx, &sid).await;
    join(&ctx, &sid).await;

    let (status, _) = call(&ctx, "DELETE", &format!("/api/sessions/{sid}/players/{a}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = call(&ctx, "POST", &format!("/api/sessions/{sid}/players"), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["seat"], "first");
}

#[tokio::test]
async fn request_metrics_track_commands() {
    let ctx = AppContext::new_for_tests();
    let (sid, a, _) = started(&ctx).await;
    call(&ctx, "POST", &format!("/api/sessions/{sid}/players/{a}/deal"), None).await;

    let snapshot = ctx.metrics().snapshot();
    assert_eq!(snapshot.commands_applied, 2);
    assert_eq!(snapshot.commands_rejected, 1);
    assert_eq!(snapshot.active_sessions, 1);
    assert!(snapshot.total_requests >= 6);
}
