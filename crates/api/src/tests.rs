use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::body::to_bytes;
use axum::http::header::{CONTENT_TYPE, SET_COOKIE};
use axum::http::{Request, Response, StatusCode};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde::Serialize;
use serde_json::{Value, json};
use tower_util::ServiceExt;

use crate::observability;
use crate::routes;
use crate::state::AppState;
use respawn_infra::config::AppConfig;

#[derive(Serialize)]
struct Claims {
    sub: String,
    username: String,
    role: String,
    iat: u64,
    exp: u64,
}

fn test_config() -> AppConfig {
    AppConfig {
        app_env: "test".to_string(),
        port: 0,
        log_level: "info".to_string(),
        data_backend: "memory".to_string(),
        surreal_endpoint: "ws://127.0.0.1:8000".to_string(),
        surreal_ns: "respawn".to_string(),
        surreal_db: "test".to_string(),
        surreal_user: "root".to_string(),
        surreal_pass: "root".to_string(),
        jwt_secret: "test-secret".to_string(),
        jwt_ttl_secs: 3600,
        cors_allowed_origins: String::new(),
    }
}

fn test_token(secret: &str, sub: &str, role: &str) -> String {
    let now = unix_now();
    signed_token(secret, sub, role, now, now + 3600)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time")
        .as_secs()
}

fn signed_token(secret: &str, sub: &str, role: &str, iat: u64, exp: u64) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        username: format!("{sub}-name"),
        role: role.to_string(),
        iat,
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("token")
}

fn user_token(sub: &str) -> String {
    test_token("test-secret", sub, "user")
}

fn test_app() -> axum::Router {
    routes::router(AppState::in_memory(test_config()))
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request")
}

async fn body_json(response: Response<Body>) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&body).expect("json body")
}

async fn create_post(app: &axum::Router, token: &str, title: &str, game: &str) -> Value {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/posts",
            Some(token),
            json!({
                "title": title,
                "body": format!("{title} review body"),
                "game_title": game,
                "platform": "PC",
                "tags": ["RPG", "rpg", " indie "]
            }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

async fn notifications_for(app: &axum::Router, token: &str) -> Vec<Value> {
    let response = app
        .clone()
        .oneshot(empty_request("GET", "/v1/notifications", Some(token)))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["items"]
        .as_array()
        .cloned()
        .unwrap_or_default()
}

#[tokio::test]
async fn health_reports_version_and_environment() {
    let app = test_app();
    let response = app
        .oneshot(empty_request("GET", "/health", None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["environment"], "test");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn ready_checks_the_memory_backend() {
    let app = test_app();
    let response = app
        .oneshot(empty_request("GET", "/ready", None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["backend"], "memory");
}

#[tokio::test]
async fn protected_routes_reject_anonymous_and_invalid_tokens() {
    let app = test_app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/posts",
            None,
            json!({ "title": "t", "body": "b", "game_title": "g" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "unauthorized");

    let forged = test_token("wrong-secret", "mallory", "admin");
    let response = app
        .clone()
        .oneshot(empty_request("GET", "/v1/notifications", Some(&forged)))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let now = unix_now();
    let expired = signed_token("test-secret", "alice", "user", now - 7200, now - 3600);
    let response = app
        .clone()
        .oneshot(empty_request("GET", "/v1/notifications", Some(&expired)))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let response = app
        .clone()
        .oneshot(empty_request("GET", "/v1/posts", Some(&expired)))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    // Public reads stay open.
    let response = app
        .clone()
        .oneshot(empty_request("GET", "/v1/posts", None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn register_login_and_profile_flow() {
    let app = test_app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/auth/register",
            None,
            json!({
                "username": "Alice_01",
                "email": "Alice@Example.com",
                "password": "correct horse",
                "display_name": "Alice"
            }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let cookie = response
        .headers()
        .get(SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .expect("session cookie");
    assert!(cookie.starts_with("rs_session="));
    assert!(cookie.contains("HttpOnly"));
    let body = body_json(response).await;
    let user_id = body["user"]["user_id"].as_str().expect("user id").to_string();
    assert_eq!(body["user"]["email"], "alice@example.com");
    assert!(body["user"].get("password_hash").is_none());
    assert_eq!(body["token"]["token_type"], "Bearer");

    let duplicate = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/auth/register",
            None,
            json!({
                "username": "alice_01",
                "email": "other@example.com",
                "password": "correct horse"
            }),
        ))
        .await
        .expect("response");
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(duplicate).await["error"]["code"], "conflict");

    let wrong = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/auth/login",
            None,
            json!({ "identifier": "alice_01", "password": "battery staple" }),
        ))
        .await
        .expect("response");
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let login = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/auth/login",
            None,
            json!({ "email": "alice@example.com", "password": "correct horse" }),
        ))
        .await
        .expect("response");
    assert_eq!(login.status(), StatusCode::OK);
    let token = body_json(login).await["token"]["access_token"]
        .as_str()
        .expect("access token")
        .to_string();

    let session = cookie.split(';').next().expect("cookie pair").to_string();
    let me = Request::builder()
        .method("GET")
        .uri("/v1/auth/me")
        .header("cookie", session)
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(me).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["user_id"], user_id.as_str());

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            "/v1/auth/me",
            Some(&token),
            json!({ "bio": "Soulslike enjoyer", "avatar_url": "https://cdn.example.com/a.png" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["bio"], "Soulslike enjoyer");

    let response = app
        .clone()
        .oneshot(empty_request("GET", &format!("/v1/users/{user_id}"), None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let profile = body_json(response).await;
    assert_eq!(profile["username"], "Alice_01");
    assert!(profile.get("email").is_none());

    let response = app
        .clone()
        .oneshot(empty_request("POST", "/v1/auth/logout", None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let cleared = response
        .headers()
        .get(SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    assert!(cleared.contains("Max-Age=0"));
}

#[tokio::test]
async fn register_trims_and_lowercases_before_validating() {
    let app = test_app();
    let response = app
        .oneshot(json_request(
            "POST",
            "/v1/auth/register",
            None,
            json!({
                "username": "  bob_99 ",
                "email": "  Bob@Example.com ",
                "password": "correct horse"
            }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["user"]["username"], "bob_99");
    assert_eq!(body["user"]["email"], "bob@example.com");
}

#[tokio::test]
async fn register_rejects_short_passwords() {
    let app = test_app();
    let response = app
        .oneshot(json_request(
            "POST",
            "/v1/auth/register",
            None,
            json!({ "username": "bob", "email": "bob@example.com", "password": "short" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "validation_error");
    assert!(
        body["error"]["message"]
            .as_str()
            .is_some_and(|message| message.contains("password"))
    );
}

#[tokio::test]
async fn post_crud_enforces_ownership() {
    let app = test_app();
    let alice = user_token("alice");
    let bob = user_token("bob");

    let post = create_post(&app, &alice, "Elden Ring", "Elden Ring").await;
    let post_id = post["post_id"].as_str().expect("post id").to_string();
    assert_eq!(post["author_id"], "alice");
    assert_eq!(post["rating_average"], 0.0);
    let tags = post["tags"].as_array().expect("tags");
    assert_eq!(tags.len(), 2);
    assert!(tags.contains(&json!("rpg")));
    assert!(tags.contains(&json!("indie")));

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/v1/posts/{post_id}"),
            Some(&bob),
            json!({ "title": "hijacked" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"]["code"], "forbidden");

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/v1/posts/{post_id}"),
            Some(&alice),
            json!({ "title": "Elden Ring, 100 hours in" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["title"], "Elden Ring, 100 hours in");

    let response = app
        .clone()
        .oneshot(empty_request(
            "DELETE",
            &format!("/v1/posts/{post_id}"),
            Some(&bob),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(empty_request(
            "DELETE",
            &format!("/v1/posts/{post_id}"),
            Some(&alice),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(empty_request("GET", &format!("/v1/posts/{post_id}"), None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"]["code"], "not_found");
}

#[tokio::test]
async fn admins_can_delete_any_post() {
    let app = test_app();
    let alice = user_token("alice");
    let admin = test_token("test-secret", "moderator", "admin");

    let post = create_post(&app, &alice, "Starfield", "Starfield").await;
    let post_id = post["post_id"].as_str().expect("post id");

    let response = app
        .clone()
        .oneshot(empty_request(
            "DELETE",
            &format!("/v1/posts/{post_id}"),
            Some(&admin),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn post_listing_filters_and_paginates() {
    let app = test_app();
    let alice = user_token("alice");
    let bob = user_token("bob");

    create_post(&app, &alice, "First run", "Hades").await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    create_post(&app, &alice, "Second run", "Hades").await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    create_post(&app, &bob, "Cozy farming", "Stardew Valley").await;

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/v1/posts?game=hades&limit=1", None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_json(response).await;
    assert_eq!(page["total"], 2);
    assert_eq!(page["total_pages"], 2);
    assert_eq!(page["items"].as_array().map(Vec::len), Some(1));

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/v1/posts?q=FARMING", None))
        .await
        .expect("response");
    let page = body_json(response).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["author_id"], "bob");

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/v1/posts?sort=oldest", None))
        .await
        .expect("response");
    let page = body_json(response).await;
    assert_eq!(page["items"][0]["title"], "First run");

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/v1/posts?sort=loudest", None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "validation_error");

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/v1/posts?limit=500", None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn user_posts_require_a_known_user() {
    let app = test_app();
    let response = app
        .oneshot(empty_request("GET", "/v1/users/nobody/posts", None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comment_thread_nests_replies_and_notifies_owners() {
    let app = test_app();
    let alice = user_token("alice");
    let bob = user_token("bob");

    let post = create_post(&app, &alice, "Hollow Knight", "Hollow Knight").await;
    let post_id = post["post_id"].as_str().expect("post id").to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/v1/posts/{post_id}/comments"),
            Some(&bob),
            json!({ "body": "The music is incredible" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let bob_comment = body_json(response).await;
    let bob_comment_id = bob_comment["comment_id"].as_str().expect("comment id").to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/v1/posts/{post_id}/comments"),
            Some(&alice),
            json!({ "body": "Agreed, Greenpath especially", "parent_id": bob_comment_id }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(empty_request(
            "GET",
            &format!("/v1/posts/{post_id}/comments"),
            None,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let thread = body_json(response).await;
    assert_eq!(thread["total"], 2);
    assert_eq!(thread["comments"].as_array().map(Vec::len), Some(1));
    assert_eq!(thread["comments"][0]["comment_id"], bob_comment_id.as_str());
    assert_eq!(
        thread["comments"][0]["replies"][0]["author_id"],
        "alice"
    );

    let response = app
        .clone()
        .oneshot(empty_request("GET", &format!("/v1/posts/{post_id}"), None))
        .await
        .expect("response");
    assert_eq!(body_json(response).await["comment_count"], 2);

    let alice_inbox = notifications_for(&app, &alice).await;
    assert_eq!(alice_inbox.len(), 1);
    assert_eq!(alice_inbox[0]["kind"], "post_comment");
    assert_eq!(alice_inbox[0]["actor_id"], "bob");

    let bob_inbox = notifications_for(&app, &bob).await;
    assert_eq!(bob_inbox.len(), 1);
    assert_eq!(bob_inbox[0]["kind"], "comment_reply");
    assert!(bob_inbox[0]["comment_id"].is_string());
}

#[tokio::test]
async fn comments_on_missing_posts_and_foreign_edits_are_rejected() {
    let app = test_app();
    let alice = user_token("alice");
    let bob = user_token("bob");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/posts/missing/comments",
            Some(&bob),
            json!({ "body": "hello?" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let post = create_post(&app, &alice, "Celeste", "Celeste").await;
    let post_id = post["post_id"].as_str().expect("post id");
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/v1/posts/{post_id}/comments"),
            Some(&alice),
            json!({ "body": "Strawberries are optional" }),
        ))
        .await
        .expect("response");
    let comment_id = body_json(response).await["comment_id"]
        .as_str()
        .expect("comment id")
        .to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/v1/comments/{comment_id}"),
            Some(&bob),
            json!({ "body": "edited by someone else" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/v1/comments/{comment_id}"),
            Some(&alice),
            json!({ "body": "Strawberries are optional, mostly" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(empty_request(
            "DELETE",
            &format!("/v1/comments/{comment_id}"),
            Some(&alice),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Own comment on own post: nobody to notify.
    assert!(notifications_for(&app, &alice).await.is_empty());
}

#[tokio::test]
async fn ratings_upsert_and_report_viewer_score() {
    let app = test_app();
    let alice = user_token("alice");
    let bob = user_token("bob");

    let post = create_post(&app, &alice, "Baldur's Gate 3", "Baldur's Gate 3").await;
    let post_id = post["post_id"].as_str().expect("post id").to_string();
    let rating_uri = format!("/v1/posts/{post_id}/rating");

    let response = app
        .clone()
        .oneshot(json_request("PUT", &rating_uri, Some(&bob), json!({ "score": 4 })))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let outcome = body_json(response).await;
    assert_eq!(outcome["average"], 4.0);
    assert_eq!(outcome["count"], 1);

    let response = app
        .clone()
        .oneshot(json_request("PUT", &rating_uri, Some(&bob), json!({ "score": 2 })))
        .await
        .expect("response");
    let outcome = body_json(response).await;
    assert_eq!(outcome["previous_score"], 4);
    assert_eq!(outcome["count"], 1);

    let response = app
        .clone()
        .oneshot(json_request("PUT", &rating_uri, Some(&bob), json!({ "score": 9 })))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(empty_request("GET", &rating_uri, Some(&bob)))
        .await
        .expect("response");
    let summary = body_json(response).await;
    assert_eq!(summary["my_score"], 2);
    assert_eq!(summary["distribution"], json!([0, 1, 0, 0, 0]));

    let response = app
        .clone()
        .oneshot(empty_request("GET", &rating_uri, None))
        .await
        .expect("response");
    assert!(body_json(response).await.get("my_score").is_none());

    let response = app
        .clone()
        .oneshot(empty_request("DELETE", &rating_uri, Some(&bob)))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(empty_request("DELETE", &rating_uri, Some(&bob)))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let inbox = notifications_for(&app, &alice).await;
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0]["kind"], "post_rating");
}

#[tokio::test]
async fn reactions_toggle_without_spamming_the_owner() {
    let app = test_app();
    let alice = user_token("alice");
    let bob = user_token("bob");

    let post = create_post(&app, &alice, "Tunic", "Tunic").await;
    let post_id = post["post_id"].as_str().expect("post id").to_string();
    let uri = format!("/v1/posts/{post_id}/reactions");

    let response = app
        .clone()
        .oneshot(json_request("POST", &uri, Some(&bob), json!({ "kind": "like" })))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let state = body_json(response).await;
    assert_eq!(state["kind"], "like");
    assert_eq!(state["like_count"], 1);

    let response = app
        .clone()
        .oneshot(json_request("POST", &uri, Some(&bob), json!({ "kind": "like" })))
        .await
        .expect("response");
    let state = body_json(response).await;
    assert!(state["kind"].is_null());
    assert_eq!(state["like_count"], 0);

    let response = app
        .clone()
        .oneshot(json_request("POST", &uri, Some(&bob), json!({ "kind": "like" })))
        .await
        .expect("response");
    assert_eq!(body_json(response).await["like_count"], 1);

    let response = app
        .clone()
        .oneshot(json_request("POST", &uri, Some(&bob), json!({ "kind": "meh" })))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let inbox = notifications_for(&app, &alice).await;
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0]["kind"], "post_like");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/comments/missing/reactions",
            Some(&bob),
            json!({ "kind": "dislike" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn notifications_can_be_marked_read_by_their_recipient_only() {
    let app = test_app();
    let alice = user_token("alice");
    let bob = user_token("bob");

    let post = create_post(&app, &alice, "Outer Wilds", "Outer Wilds").await;
    let post_id = post["post_id"].as_str().expect("post id");
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/v1/posts/{post_id}/reactions"),
            Some(&bob),
            json!({ "kind": "dislike" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let inbox = notifications_for(&app, &alice).await;
    assert_eq!(inbox.len(), 1);
    let notification_id = inbox[0]["notification_id"]
        .as_str()
        .expect("notification id")
        .to_string();

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/v1/notifications/unread-count", Some(&alice)))
        .await
        .expect("response");
    assert_eq!(body_json(response).await["unread"], 1);

    let read_uri = format!("/v1/notifications/{notification_id}/read");
    let response = app
        .clone()
        .oneshot(empty_request("POST", &read_uri, Some(&bob)))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(empty_request("POST", &read_uri, Some(&alice)))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await["read_at_ms"].is_i64());

    assert!(notifications_for(&app, &alice).await.is_empty());
    let response = app
        .clone()
        .oneshot(empty_request(
            "GET",
            "/v1/notifications?include_read=true",
            Some(&alice),
        ))
        .await
        .expect("response");
    assert_eq!(body_json(response).await["items"].as_array().map(Vec::len), Some(1));

    let response = app
        .clone()
        .oneshot(empty_request("POST", "/v1/notifications/read-all", Some(&alice)))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["updated"], 0);

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/v1/notifications?cursor=garbage", Some(&alice)))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn correlation_and_request_ids_are_echoed() {
    let app = test_app();
    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .header("x-correlation-id", "corr-123")
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("x-correlation-id")
            .and_then(|value| value.to_str().ok()),
        Some("corr-123")
    );
    assert!(response.headers().get("x-request-id").is_some());

    let response = app
        .oneshot(empty_request("GET", "/health", None))
        .await
        .expect("response");
    assert!(response.headers().get("x-correlation-id").is_some());
}

#[tokio::test]
async fn metrics_endpoint_is_exposed() {
    let _ = observability::init_metrics();
    let app = test_app();

    let health_response = app
        .clone()
        .oneshot(empty_request("GET", "/health", None))
        .await
        .expect("response");
    assert_eq!(health_response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/metrics", None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("text/plain"))
    );
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = String::from_utf8(body.to_vec()).expect("metrics body");
    assert!(body.contains("respawn_api_http_requests_total"));
}
