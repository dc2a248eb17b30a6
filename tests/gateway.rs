mod common;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use common::{ScriptedModel, test_image};
use performative::{
    Gateway, GatewayConfig, Part, TurnRole, prompt::CHAT_SYSTEM_INSTRUCTION, router,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

fn app(model: &ScriptedModel) -> Router {
    app_with(model, GatewayConfig::default())
}

fn app_with(model: &ScriptedModel, config: GatewayConfig) -> Router {
    router(Arc::new(Gateway::new(model.clone(), config)))
}

async fn post(app: Router, path: &str, body: impl Into<Body>) -> (StatusCode, Value) {
    let request = Request::post(path)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn post_json(app: Router, path: &str, body: Value) -> (StatusCode, Value) {
    post(app, path, body.to_string()).await
}

#[tokio::test]
async fn analyze_returns_embedded_rating() {
    let model = ScriptedModel::replying(
        r#"Sure! {"rating": 7, "explanation": "Staged lighting and posed smile."}"#,
    );
    let image = test_image();

    let (status, body) = post_json(
        app(&model),
        "/api/analyze",
        json!({ "image": image.to_data_url() }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "rating": 7, "explanation": "Staged lighting and posed smile." })
    );

    let requests = model.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].turns.len(), 1);
    let turn = &requests[0].turns[0];
    assert_eq!(turn.role, TurnRole::User);
    assert_eq!(turn.parts[0], Part::Image(image));
    assert!(matches!(&turn.parts[1], Part::Text(text) if text.contains("\"rating\"")));
}

#[tokio::test]
async fn analyze_keeps_plain_reply_with_default_rating() {
    let model = ScriptedModel::replying("I cannot analyze this image");

    let (status, body) = post_json(
        app(&model),
        "/api/analyze",
        json!({ "image": test_image().to_data_url() }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "rating": 5, "explanation": "I cannot analyze this image" })
    );
}

#[tokio::test]
async fn analyze_accepts_bare_base64() {
    let model = ScriptedModel::replying(r#"{"rating": 2, "explanation": "Candid."}"#);

    let (status, body) = post_json(
        app(&model),
        "/api/analyze",
        json!({ "image": test_image().base64() }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rating"], 2);
    assert!(matches!(
        &model.requests()[0].turns[0].parts[0],
        Part::Image(image) if image.mime() == "image/jpeg"
    ));
}

#[tokio::test]
async fn analyze_upstream_failure_is_a_server_error() {
    let model = ScriptedModel::failing();

    let (status, body) = post_json(
        app(&model),
        "/api/analyze",
        json!({ "image": test_image().to_data_url() }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Failed to analyze image" }));
}

#[tokio::test]
async fn analyze_rejects_non_image_payload() {
    let model = ScriptedModel::replying("unused");

    let (status, body) = post_json(
        app(&model),
        "/api/analyze",
        json!({ "image": "data:text/plain;base64,aGVsbG8=" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("invalid image"));
    assert!(model.requests().is_empty());
}

#[tokio::test]
async fn analyze_rejects_oversize_image() {
    let model = ScriptedModel::replying("unused");
    let config = GatewayConfig {
        max_image_bytes: 4,
        ..Default::default()
    };

    let (status, body) = post_json(
        app_with(&model, config),
        "/api/analyze",
        json!({ "image": test_image().to_data_url() }),
    )
    .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body["error"].is_string());
    assert!(model.requests().is_empty());
}

#[tokio::test]
async fn oversize_body_is_rejected_before_parsing() {
    let model = ScriptedModel::replying("unused");
    let config = GatewayConfig {
        max_image_bytes: 3,
        ..Default::default()
    };
    let oversized = json!({ "image": "A".repeat(config.body_limit() + 1) }).to_string();

    let (status, body) = post(app_with(&model, config), "/api/analyze", oversized).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn malformed_body_gets_an_error_object() {
    let model = ScriptedModel::replying("unused");

    let (status, body) = post(app(&model), "/api/analyze", "not json").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn chat_replays_history() {
    let model = ScriptedModel::replying("Lean into the oversized cardigan, babe.");
    let image = test_image();

    let (status, body) = post_json(
        app(&model),
        "/api/chat",
        json!({
            "image": image.to_data_url(),
            "message": "  how do I look more performative?  ",
            "conversation_history": [
                { "role": "user", "content": "is the matcha too much?" },
                { "role": "assistant", "content": "never, sweetie" },
            ],
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "response": "Lean into the oversized cardigan, babe." })
    );

    let requests = model.requests();
    let request = &requests[0];
    assert_eq!(
        request.system_instruction.as_deref(),
        Some(CHAT_SYSTEM_INSTRUCTION)
    );
    let roles: Vec<TurnRole> = request.turns.iter().map(|turn| turn.role).collect();
    assert_eq!(roles, vec![TurnRole::User, TurnRole::Model, TurnRole::User]);
    assert_eq!(request.turns[0].parts[0], Part::Image(image));
    assert_eq!(
        request.turns[2].parts,
        vec![Part::Text("how do I look more performative?".to_string())]
    );
}

#[tokio::test]
async fn chat_upstream_failure_is_a_server_error() {
    let model = ScriptedModel::failing();

    let (status, body) = post_json(
        app(&model),
        "/api/chat",
        json!({ "image": test_image().to_data_url(), "message": "hi" }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Failed to process message" }));
}

#[tokio::test]
async fn chat_rejects_blank_message() {
    let model = ScriptedModel::replying("unused");

    let (status, body) = post_json(
        app(&model),
        "/api/chat",
        json!({ "image": test_image().to_data_url(), "message": "   " }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "message must not be empty" }));
    assert!(model.requests().is_empty());
}

#[tokio::test]
async fn health_reports_ok() {
    let model = ScriptedModel::replying("unused");
    let request = Request::get("/health").body(Body::empty()).unwrap();

    let response = app(&model).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(
        serde_json::from_slice::<Value>(&bytes).unwrap(),
        json!({ "status": "ok" })
    );
}

#[tokio::test]
async fn cors_allows_configured_origin() {
    let model = ScriptedModel::replying("unused");
    let preflight = |origin: &str| {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/analyze")
            .header("origin", origin)
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap()
    };

    let allowed = app(&model)
        .oneshot(preflight("http://localhost:3000"))
        .await
        .unwrap();
    assert_eq!(
        allowed.headers()["access-control-allow-origin"],
        "http://localhost:3000"
    );

    let denied = app(&model)
        .oneshot(preflight("https://elsewhere.example"))
        .await
        .unwrap();
    assert!(!denied.headers().contains_key("access-control-allow-origin"));
}
