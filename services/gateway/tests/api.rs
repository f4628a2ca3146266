use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use feed_engine::InMemoryDirectory;
use gateway::{create_router, AppState, GatewayConfig};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use types::ids::{EventId, UserId};
use types::profile::{Gender, Preferences, UserProfile};

fn profile(age: u8) -> UserProfile {
    UserProfile {
        user_id: UserId::new(),
        age,
        gender: Gender::Female,
        interests: ["climbing".to_string()].into_iter().collect(),
        preferences: Preferences::default(),
        created_at: 0,
        last_active_at: 0,
    }
}

fn setup(config: GatewayConfig) -> (Router, Arc<InMemoryDirectory>) {
    let directory = Arc::new(InMemoryDirectory::new());
    let state = AppState::with_store(&config, directory.clone());
    (create_router(state), directory)
}

fn register(directory: &InMemoryDirectory, age: u8) -> UserId {
    let p = profile(age);
    let id = p.user_id;
    directory.upsert(p);
    id
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    send_raw(app, method, uri, body.map(|b| b.to_string())).await
}

async fn send_raw(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<String>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn swipe(app: &Router, actor: UserId, target: UserId, action: &str) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/v1/swipes",
        Some(json!({ "actorId": actor.to_string(), "targetId": target.to_string(), "action": action })),
    )
    .await
}

#[tokio::test]
async fn test_health() {
    let (app, _) = setup(GatewayConfig::default());
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_reciprocal_likes_create_one_match() {
    let (app, directory) = setup(GatewayConfig::default());
    let a = register(&directory, 30);
    let b = register(&directory, 31);

    let (status, first) = swipe(&app, a, b, "LIKE").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["matched"], false);
    assert!(first.get("matchId").is_none());

    let (_, second) = swipe(&app, b, a, "SUPER_LIKE").await;
    assert_eq!(second["matched"], true);
    let match_id = second["matchId"].as_str().unwrap().to_string();

    // Retry after the match exists: no second match
    let (_, retry) = swipe(&app, b, a, "SUPER_LIKE").await;
    assert_eq!(retry["matched"], false);
    assert_eq!(retry["matchId"], match_id.as_str());

    let (status, record) = send(&app, Method::GET, &format!("/v1/matches/{}", match_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["status"], "ACTIVE");
}

#[tokio::test]
async fn test_end_match_lifecycle() {
    let (app, directory) = setup(GatewayConfig::default());
    let a = register(&directory, 30);
    let b = register(&directory, 31);
    swipe(&app, a, b, "LIKE").await;
    let (_, created) = swipe(&app, b, a, "LIKE").await;
    let match_id = created["matchId"].as_str().unwrap().to_string();
    let uri = format!("/v1/matches/{}/end", match_id);

    let (status, body) = send(
        &app,
        Method::POST,
        &uri,
        Some(json!({ "endedBy": UserId::new().to_string() })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "FORBIDDEN");

    let (status, ended) = send(&app, Method::POST, &uri, Some(json!({ "endedBy": a.to_string() }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ended["changed"], true);
    let ended_at = ended["endedAt"].as_i64().unwrap();

    let (_, again) = send(&app, Method::POST, &uri, Some(json!({ "endedBy": b.to_string() }))).await;
    assert_eq!(again["changed"], false);
    assert_eq!(again["endedAt"].as_i64().unwrap(), ended_at);

    let (_, record) = send(&app, Method::GET, &format!("/v1/matches/{}", match_id), None).await;
    assert_eq!(record["status"], "ENDED");
}

#[tokio::test]
async fn test_rejected_swipes() {
    let (app, directory) = setup(GatewayConfig::default());
    let a = register(&directory, 30);
    let b = register(&directory, 31);

    let (status, body) = swipe(&app, a, a, "LIKE").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BAD_REQUEST");

    let (status, _) = swipe(&app, a, b, "WINK").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/v1/swipes",
        Some(json!({ "actorId": "nope", "targetId": b.to_string(), "action": "LIKE" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_resources() {
    let (app, _) = setup(GatewayConfig::default());
    let (status, _) = send(&app, Method::GET, &format!("/v1/matches/{}", UserId::new()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::GET, &format!("/v1/feed?userId={}", UserId::new()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_feed_drops_swiped_target() {
    let (app, directory) = setup(GatewayConfig::default());
    let a = register(&directory, 30);
    let b = register(&directory, 31);
    let c = register(&directory, 32);
    let feed_uri = format!("/v1/feed?userId={}&limit=10", a);

    let (status, feed) = send(&app, Method::GET, &feed_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feed["candidates"].as_array().unwrap().len(), 2);
    assert_eq!(feed["hasMore"], false);
    assert_eq!(feed["stale"], false);

    swipe(&app, a, b, "PASS").await;

    let (_, feed) = send(&app, Method::GET, &feed_uri, None).await;
    let ids: Vec<&str> = feed["candidates"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["candidateId"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![c.to_string().as_str()]);
}

fn candidate_ids(feed: &Value) -> Vec<String> {
    feed["candidates"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["candidateId"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_swiping_a_page_keeps_the_next_page() {
    let (app, directory) = setup(GatewayConfig::default());
    let a = register(&directory, 30);
    for _ in 0..4 {
        register(&directory, 31);
    }

    let (_, first) = send(&app, Method::GET, &format!("/v1/feed?userId={}&limit=2", a), None).await;
    let first_ids = candidate_ids(&first);
    assert_eq!(first_ids.len(), 2);
    assert_eq!(first["hasMore"], true);
    for target in &first_ids {
        let target = UserId::parse(target).unwrap();
        assert_eq!(swipe(&app, a, target, "PASS").await.0, StatusCode::OK);
    }

    let next_uri = format!(
        "/v1/feed?userId={}&limit=2&offset={}",
        a,
        first["nextOffset"].as_u64().unwrap()
    );
    let (_, second) = send(&app, Method::GET, &next_uri, None).await;
    let second_ids = candidate_ids(&second);
    assert_eq!(second_ids.len(), 2);
    assert_eq!(second["hasMore"], false);
    assert!(second_ids.iter().all(|id| !first_ids.contains(id)));
}

#[tokio::test]
async fn test_malformed_input_gets_json_error() {
    let (app, directory) = setup(GatewayConfig::default());
    let a = register(&directory, 30);

    let (status, body) = send_raw(&app, Method::POST, "/v1/swipes", Some("{not json".into())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BAD_REQUEST");
    assert!(body["message"].is_string());

    let (status, body) = send(&app, Method::POST, "/v1/swipes", Some(json!({ "actorId": a.to_string() }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BAD_REQUEST");

    let (status, body) = send(&app, Method::GET, &format!("/v1/feed?userId={}&limit=-1", a), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BAD_REQUEST");

    let (status, body) = send(&app, Method::GET, "/v1/feed", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BAD_REQUEST");

    let (status, body) = send_raw(&app, Method::POST, "/v1/events", Some("[]".into())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_feed_page_limit_validated() {
    let (app, directory) = setup(GatewayConfig::default());
    let a = register(&directory, 30);
    let (status, _) = send(&app, Method::GET, &format!("/v1/feed?userId={}&limit=1000", a), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_inbound_event_acknowledged_once() {
    let (app, directory) = setup(GatewayConfig::default());
    let a = register(&directory, 30);
    let event = json!({
        "event_id": EventId::new().to_string(),
        "occurred_at": 1,
        "payload": { "event_type": "UserUpdated", "user_id": a.to_string() }
    });

    let (status, first) = send(&app, Method::POST, "/v1/events", Some(event.clone())).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(first["duplicate"], false);

    let (status, second) = send(&app, Method::POST, "/v1/events", Some(event)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(second["duplicate"], true);
}

#[tokio::test]
async fn test_swipe_rate_limited_per_actor() {
    let (app, directory) = setup(GatewayConfig {
        swipe_rate_per_sec: 2,
        ..GatewayConfig::default()
    });
    let a = register(&directory, 30);
    let others: Vec<UserId> = (0..3).map(|_| register(&directory, 30)).collect();

    assert_eq!(swipe(&app, a, others[0], "PASS").await.0, StatusCode::OK);
    assert_eq!(swipe(&app, a, others[1], "PASS").await.0, StatusCode::OK);
    let (status, body) = swipe(&app, a, others[2], "PASS").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "RATE_LIMIT_EXCEEDED");

    assert_eq!(swipe(&app, others[0], a, "PASS").await.0, StatusCode::OK);
}
