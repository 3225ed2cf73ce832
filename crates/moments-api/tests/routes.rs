use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use tower::ServiceExt;

use moments_api::{AppStateInner, router};
use moments_db::Database;
use moments_types::api::Claims;

const SECRET: &str = "test-secret";
const IDENTITY_URL: &str = "http://identity.test/login";

fn app() -> Router {
    let state = Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        jwt_secret: SECRET.into(),
        identity_url: IDENTITY_URL.into(),
    });
    router(state)
}

fn token(user: &str) -> String {
    let claims = Claims {
        sub: user.into(),
        exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
}

async fn send(app: &Router, method: &str, uri: &str, user: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token(user)));
    }
    let req = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn ids(list: &Value) -> Vec<i64> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn test_unauthenticated_requests_are_redirected() {
    let app = app();
    let req = Request::builder().uri("/home").body(Body::empty()).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()[header::LOCATION], IDENTITY_URL);

    let req = Request::builder()
        .uri("/home")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_home_greets_caller() {
    let app = app();
    let (status, body) = send(&app, "GET", "/home", Some("James1"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("James1"));
}

#[tokio::test]
async fn test_public_moment_is_discoverable() {
    let app = app();
    let (status, body) = send(
        &app,
        "POST",
        "/moments",
        Some("James1"),
        Some(json!({
            "location": { "latitude": 43.0, "longitude": -87.9 },
            "public": true,
            "media": [{ "message": "hello", "type": 1, "dir": "media/a.png" }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["id"].as_i64().unwrap();
    assert!(id >= 1);

    let (status, list) = send(&app, "GET", "/search/public?lat=43&lon=-87", Some("Other1"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&list), vec![id]);
    assert_eq!(list[0]["media"][0]["dir"], "media/a.png");
}

#[tokio::test]
async fn test_private_moment_find_and_share_flow() {
    let app = app();
    let (_, body) = send(
        &app,
        "POST",
        "/moments",
        Some("James1"),
        Some(json!({
            "location": { "latitude": 43.0, "longitude": -87.9 },
            "public": false,
            "recipients": ["Sadie1", "Frank1"]
        })),
    )
    .await;
    let id = body["id"].as_i64().unwrap();

    let (_, lost) = send(&app, "GET", "/search/lost?lat=43&lon=-87", Some("Sadie1"), None).await;
    assert_eq!(ids(&lost), vec![id]);
    let (_, public) = send(&app, "GET", "/search/public?lat=43&lon=-87", Some("Sadie1"), None).await;
    assert!(ids(&public).is_empty());

    let uri = format!("/moments/{}/found", id);
    let (status, _) = send(&app, "POST", &uri, Some("Sadie1"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "POST", &uri, Some("Sadie1"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, found) = send(&app, "GET", "/search/found", Some("Sadie1"), None).await;
    assert_eq!(ids(&found), vec![id]);
    assert!(found[0]["finds"][0]["findDate"].is_string());

    let shares = format!("/moments/{}/shares", id);
    let (status, _) = send(&app, "POST", &shares, Some("Sadie1"), Some(json!({ "recipients": ["Frank1"] }))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, shared) = send(&app, "GET", "/search/shared?from=Sadie1", Some("Frank1"), None).await;
    assert_eq!(ids(&shared), vec![id]);
    let (_, shared) = send(&app, "GET", "/search/shared?from=Sadie1", Some("Other1"), None).await;
    assert!(ids(&shared).is_empty());

    let (_, left) = send(&app, "GET", "/search/left", Some("James1"), None).await;
    assert_eq!(left[0]["finds"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_share_before_finding_is_rejected() {
    let app = app();
    let (_, body) = send(
        &app,
        "POST",
        "/moments",
        Some("James1"),
        Some(json!({
            "location": { "latitude": 43.0, "longitude": -87.9 },
            "public": false,
            "recipients": ["Sadie1"]
        })),
    )
    .await;
    let uri = format!("/moments/{}/shares", body["id"].as_i64().unwrap());

    let (status, _) = send(&app, "POST", &uri, Some("Sadie1"), Some(json!({ "all": true }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_input_never_reaches_the_database() {
    let app = app();
    let (status, body) = send(
        &app,
        "POST",
        "/moments",
        Some("James1"),
        Some(json!({
            "location": { "latitude": 43.0, "longitude": -87.9 },
            "public": false,
            "hidden": true
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");

    let (status, _) = send(
        &app,
        "POST",
        "/moments",
        Some("James1"),
        Some(json!({
            "location": { "latitude": 43.0, "longitude": -87.9 },
            "public": true,
            "media": [{ "type": 0, "dir": "x" }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "POST", "/moments", Some("James1"), Some(json!({ "public": true }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, left) = send(&app, "GET", "/search/left", Some("James1"), None).await;
    assert!(ids(&left).is_empty());
}

#[tokio::test]
async fn test_only_sender_deletes() {
    let app = app();
    let (_, body) = send(
        &app,
        "POST",
        "/moments",
        Some("James1"),
        Some(json!({
            "location": { "latitude": 43.0, "longitude": -87.9 },
            "public": true
        })),
    )
    .await;
    let uri = format!("/moments/{}", body["id"].as_i64().unwrap());

    let (status, _) = send(&app, "DELETE", &uri, Some("Other1"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "DELETE", &uri, Some("James1"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &uri, Some("James1"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
