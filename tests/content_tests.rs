//! Guides and chat proxy, driven through the router.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use backoffice::{
    build_app,
    chat::{ChatClient, ChatMessage},
    guides::GuideLibrary,
    payments::webhook::StripeVerifier,
    AppState,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

struct EchoChat;

#[async_trait]
impl ChatClient for EchoChat {
    async fn complete(&self, messages: Vec<ChatMessage>) -> anyhow::Result<String> {
        let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        Ok(format!("echo: {last} ({} messages)", messages.len()))
    }
}

struct BrokenChat;

#[async_trait]
impl ChatClient for BrokenChat {
    async fn complete(&self, _messages: Vec<ChatMessage>) -> anyhow::Result<String> {
        anyhow::bail!("upstream said 500 with secret-internal-detail")
    }
}

async fn send(app: &Router, req: Request<Body>) -> Response {
    app.clone().oneshot(req).await.unwrap()
}

async fn body_bytes(res: Response) -> Vec<u8> {
    res.into_body().collect().await.unwrap().to_bytes().to_vec()
}

async fn json_body(res: Response) -> Value {
    serde_json::from_slice(&body_bytes(res).await).unwrap()
}

fn guides_dir() -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("backoffice-guides-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("getting_started.md"), "# Getting started\n").unwrap();
    std::fs::write(dir.join("traffic_secrets.md"), "# Traffic\n").unwrap();
    std::fs::write(dir.join("draft.txt"), "not a guide").unwrap();
    dir
}

async fn get(app: &Router, uri: &str) -> Response {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

/// Registers, pays for and logs in a user; returns the session cookie.
async fn logged_in_cookie(app: &Router) -> String {
    let post = |uri: &str, body: Value| {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    };
    send(
        app,
        post(
            "/api/register",
            json!({ "username": "alice", "email": "a@x.com", "password": "pw1" }),
        ),
    )
    .await;

    let event = json!({
        "type": "checkout.session.completed",
        "data": { "object": { "customer_email": "a@x.com" } }
    })
    .to_string();
    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    let signature = StripeVerifier::new("whsec_test", 300).sign(event.as_bytes(), now);
    send(
        app,
        Request::builder()
            .method("POST")
            .uri("/api/payment-webhook")
            .header("Stripe-Signature", signature)
            .body(Body::from(event))
            .unwrap(),
    )
    .await;

    let res = send(
        app,
        post("/api/login", json!({ "username": "alice", "password": "pw1" })),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    res.headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string()
}

fn chat_request(cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header("Content-Type", "application/json");
    if let Some(c) = cookie {
        builder = builder.header(header::COOKIE, c);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn lists_markdown_guides_with_titles() {
    let dir = guides_dir();
    let mut state = AppState::fake();
    state.guides = GuideLibrary::new(&dir);
    let app = build_app(state);

    let res = get(&app, "/api/guides").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        json_body(res).await,
        json!({ "guides": [
            { "filename": "getting_started.md", "title": "Getting Started" },
            { "filename": "traffic_secrets.md", "title": "Traffic Secrets" }
        ]})
    );
    std::fs::remove_dir_all(dir).ok();
}

#[tokio::test]
async fn reads_and_downloads_a_guide() {
    let dir = guides_dir();
    let mut state = AppState::fake();
    state.guides = GuideLibrary::new(&dir);
    let app = build_app(state);

    let res = get(&app, "/api/guides/getting_started").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await, json!({ "content": "# Getting started\n" }));

    let res = get(&app, "/api/guides/download/traffic_secrets.md").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers().get(header::CONTENT_DISPOSITION).unwrap(),
        "attachment; filename=\"traffic_secrets.md\""
    );
    assert!(res
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/markdown"));
    assert_eq!(body_bytes(res).await, b"# Traffic\n");
    std::fs::remove_dir_all(dir).ok();
}

#[tokio::test]
async fn missing_or_escaping_guides_are_not_found() {
    let dir = guides_dir();
    let mut state = AppState::fake();
    state.guides = GuideLibrary::new(&dir);
    let app = build_app(state);

    assert_eq!(get(&app, "/api/guides/nope").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(get(&app, "/api/guides/..%2Fsecret").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        get(&app, "/api/guides/download/nope").await.status(),
        StatusCode::NOT_FOUND
    );
    std::fs::remove_dir_all(dir).ok();
}

#[tokio::test]
async fn unreadable_guides_dir_is_a_server_error() {
    let app = build_app(AppState::fake());
    let res = get(&app, "/api/guides").await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(res).await["error"], "InternalError");
}

#[tokio::test]
async fn chat_requires_a_session() {
    let mut state = AppState::fake();
    state.chat = Some(Arc::new(EchoChat));
    let app = build_app(state);

    let res = send(&app, chat_request(None, json!({ "message": "hi" }))).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn chat_relays_reply() {
    let mut state = AppState::fake();
    state.chat = Some(Arc::new(EchoChat));
    let app = build_app(state);
    let cookie = logged_in_cookie(&app).await;

    let res = send(
        &app,
        chat_request(
            Some(&cookie),
            json!({
                "message": "how do I get paid?",
                "history": [
                    { "role": "user", "content": "hello" },
                    { "role": "assistant", "content": "hi there" }
                ]
            }),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        json_body(res).await,
        json!({ "reply": "echo: how do I get paid? (3 messages)" })
    );

    let res = send(&app, chat_request(Some(&cookie), json!({ "message": "  " }))).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn chat_without_backend_is_unavailable() {
    let app = build_app(AppState::fake());
    let cookie = logged_in_cookie(&app).await;
    let res = send(&app, chat_request(Some(&cookie), json!({ "message": "hi" }))).await;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn chat_upstream_failure_hides_detail() {
    let mut state = AppState::fake();
    state.chat = Some(Arc::new(BrokenChat));
    let app = build_app(state);
    let cookie = logged_in_cookie(&app).await;

    let res = send(&app, chat_request(Some(&cookie), json!({ "message": "hi" }))).await;
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body = json_body(res).await;
    assert!(!body.to_string().contains("secret-internal-detail"));
}
