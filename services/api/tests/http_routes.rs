mod common;

use aikido_live_core::auth::{DEFAULT_CONFIRM_EMAIL_PATH, DEFAULT_RESET_PASSWORD_PATH};
use aikido_live_core::{DocumentIds, OutboundEmail, Outbox, WritePolicy};
use api_lib::config::{Config, StoreBackend};
use api_lib::web::{router, state::AppState};
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use common::{token_from_link, Harness, RecordingNotifier};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use tower_sessions::MemoryStore;
use url::Url;

fn config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        log_level: tracing::Level::INFO,
        store: StoreBackend::Memory,
        container: Some(common::handle()),
        document_ids: DocumentIds::default(),
        write_policy: WritePolicy::LastWriterWins,
        require_email_confirmation: true,
        public_base_url: Url::parse("http://localhost:3000").unwrap(),
        confirm_email_path: DEFAULT_CONFIRM_EMAIL_PATH.into(),
        reset_password_path: DEFAULT_RESET_PASSWORD_PATH.into(),
        cors_origin: "http://localhost:3000".into(),
        smtp: None,
    }
}

async fn app() -> (Router, Arc<RecordingNotifier>) {
    let harness = Harness::new().await;
    let notifier = Arc::new(RecordingNotifier::default());
    let (outbox, _worker) = Outbox::spawn(notifier.clone());
    let state = Arc::new(AppState::new(Arc::new(config()), harness.repo, outbox));
    (router(state, MemoryStore::default(), false), notifier)
}

fn json_request(method: &str, uri: &str, body: Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// The path and query of an emailed link, as a request URI for the router.
fn emailed_uri(link: &str) -> String {
    let url = Url::parse(link).unwrap();
    format!("{}?{}", url.path(), url.query().unwrap())
}

fn cookie_pair(response: &axum::response::Response) -> String {
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("session cookie");
    set_cookie
        .split(';')
        .next()
        .expect("cookie pair")
        .to_string()
}

/// Registers `email`, opens the emailed confirmation link and logs in;
/// returns the `Cookie` header value.
async fn signed_in_as(
    app: &Router,
    notifier: &RecordingNotifier,
    first_name: &str,
    email: &str,
) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/register",
            json!({
                "firstName": first_name,
                "lastName": "Ueshiba",
                "email": email,
                "password": "secret1",
                "confirmPassword": "secret1"
            }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let link = notifier
        .wait_for_email(|e| match e {
            OutboundEmail::Confirmation { to, link, .. } if to == email => Some(link.clone()),
            _ => None,
        })
        .await;

    let response = app
        .clone()
        .oneshot(get(&emailed_uri(&link), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK, "{}", link);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/login",
            json!({ "email": email, "password": "secret1" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    cookie_pair(&response)
}

async fn signed_in(app: &Router, notifier: &RecordingNotifier) -> String {
    signed_in_as(app, notifier, "Alice", "alice@example.com").await
}

#[tokio::test]
async fn protected_routes_require_a_session() {
    let (app, _) = app().await;
    for uri in ["/account/profile", "/library", "/playlists", "/blog/mine"] {
        let response = app.clone().oneshot(get(uri, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
    }

    let response = app.clone().oneshot(get("/blog", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn invalid_registration_is_rejected() {
    let (app, _) = app().await;
    let response = app
        .oneshot(json_request(
            "POST",
            "/auth/register",
            json!({
                "firstName": "Alice",
                "lastName": "Ueshiba",
                "email": "not-an-email",
                "password": "secret1",
                "confirmPassword": "secret1"
            }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let (app, _) = app().await;
    let response = app
        .oneshot(json_request(
            "POST",
            "/auth/login",
            json!({ "email": "nobody@example.com", "password": "whatever" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signed_in_user_can_publish_and_read_back_a_post() {
    let (app, notifier) = app().await;
    let cookie = signed_in(&app, &notifier).await;

    let response = app
        .clone()
        .oneshot(get("/account/profile", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["email"], "alice@example.com");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/blog",
            json!({
                "title": "Keiko notes",
                "content": "Today we practised shiho nage from katate dori, focusing on posture.",
                "tags": "keiko, shiho nage",
                "isPublished": true
            }),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["tags"], json!(["keiko", "shiho nage"]));
    assert_eq!(created["authorName"], "Alice Ueshiba");
    let id = created["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(get(&format!("/blog/{}", id), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["viewCount"], 1);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/blog/{}/appreciate", id),
            json!({}),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["appreciated"], true);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/playlists/Basics/tracks",
            json!({ "name": "Tenkan", "url": "https://vimeo.com/1", "source": "vimeo" }),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(json_request("POST", "/auth/logout", json!({}), Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get("/account/profile", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn emailed_reset_link_opens_and_resets_the_password() {
    let (app, notifier) = app().await;
    signed_in(&app, &notifier).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/forgot-password",
            json!({ "email": "alice@example.com" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let link = notifier
        .wait_for_email(|e| match e {
            OutboundEmail::PasswordReset { link, .. } => Some(link.clone()),
            _ => None,
        })
        .await;

    let response = app
        .clone()
        .oneshot(get(&emailed_uri(&link), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK, "{}", link);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/reset-password",
            json!({
                "token": token_from_link(&link),
                "newPassword": "secret2",
                "confirmPassword": "secret2"
            }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The token is spent.
    let response = app
        .clone()
        .oneshot(get(&emailed_uri(&link), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(json_request(
            "POST",
            "/auth/login",
            json!({ "email": "alice@example.com", "password": "secret2" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn drafts_cannot_be_appreciated_by_other_members() {
    let (app, notifier) = app().await;
    let alice = signed_in(&app, &notifier).await;
    let bob = signed_in_as(&app, &notifier, "Bob", "bob@example.com").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/blog",
            json!({
                "title": "Unfinished notes",
                "content": "Still drafting my thoughts on irimi nage and ma-ai in randori.",
                "tags": "",
                "isPublished": false
            }),
            Some(&alice),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let id = body_json(response).await["id"].as_str().unwrap().to_string();
    let appreciate = format!("/blog/{}/appreciate", id);

    let response = app
        .clone()
        .oneshot(json_request("POST", &appreciate, json!({}), Some(&bob)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(json_request("POST", &appreciate, json!({}), Some(&alice)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["appreciationCount"], 1);
}
