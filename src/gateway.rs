use crate::{
    extract,
    image::{ImageData, ImageError},
    messages::{AnalysisResult, AnalyzeRequest, ChatMessage, ChatRequest, ChatResponse, ErrorResponse, Role},
    model::{ModelRequest, Part, Turn, TurnRole, VisionModel},
    prompt,
};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use std::{sync::Arc, time::Instant};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

pub const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &["http://localhost:3000", "http://127.0.0.1:3000"];

// room for the JSON envelope and chat history on top of the encoded image
const BODY_OVERHEAD_BYTES: usize = 1024 * 1024;

#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// Largest accepted image after base64 decoding.
    pub max_image_bytes: usize,
    /// Origins allowed by CORS; `*` allows any.
    pub allowed_origins: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            allowed_origins: DEFAULT_ALLOWED_ORIGINS
                .iter()
                .map(|origin| origin.to_string())
                .collect(),
        }
    }
}

impl GatewayConfig {
    /// Request body limit derived from the image limit and base64 expansion.
    pub fn body_limit(&self) -> usize {
        self.max_image_bytes.div_ceil(3) * 4 + BODY_OVERHEAD_BYTES
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{0}")]
    Rejected(#[from] JsonRejection),
    #[error("invalid image: {0}")]
    InvalidImage(#[from] ImageError),
    #[error("message must not be empty")]
    EmptyMessage,
    #[error("Failed to analyze image")]
    AnalysisFailed,
    #[error("Failed to process message")]
    ChatFailed,
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Rejected(rejection) => rejection.status(),
            GatewayError::InvalidImage(ImageError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::InvalidImage(_) | GatewayError::EmptyMessage => StatusCode::BAD_REQUEST,
            GatewayError::AnalysisFailed | GatewayError::ChatFailed => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Stateless request handler in front of a [`VisionModel`].
///
/// Shared between requests behind an `Arc`; nothing in it is mutated after
/// construction, so concurrent requests need no locking.
pub struct Gateway<M> {
    model: M,
    config: GatewayConfig,
}

impl<M: VisionModel> Gateway<M> {
    pub fn new(model: M, config: GatewayConfig) -> Self {
        Self { model, config }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Rates one image. Replies without usable JSON still produce a result.
    pub async fn analyze(&self, request: AnalyzeRequest) -> Result<AnalysisResult, GatewayError> {
        let image = self.decode_image(&request.image)?;
        let model_request = analysis_request(image);
        let summary = model_request.summary();

        let start_time = Instant::now();
        let response = self.model.generate(model_request).await.map_err(|err| {
            log::error!("Analysis error after {:?}: {err}", start_time.elapsed());
            GatewayError::AnalysisFailed
        })?;
        log::info!("Analysis completed in {:?} ({summary})", start_time.elapsed());

        let result = extract::parse_analysis(&response.text);
        log::debug!("Rated image {}", result.score_label());
        Ok(result)
    }

    /// Answers a follow-up message about the image, given the earlier turns.
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, GatewayError> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(GatewayError::EmptyMessage);
        }

        let image = self.decode_image(&request.image)?;
        let model_request = chat_request(image, message, &request.conversation_history);
        let summary = model_request.summary();

        let start_time = Instant::now();
        let response = self.model.generate(model_request).await.map_err(|err| {
            log::error!("Chat error after {:?}: {err}", start_time.elapsed());
            GatewayError::ChatFailed
        })?;
        log::info!("Chat reply completed in {:?} ({summary})", start_time.elapsed());

        Ok(ChatResponse {
            response: response.text,
        })
    }

    fn decode_image(&self, raw: &str) -> Result<ImageData, GatewayError> {
        let image = ImageData::from_data_url(raw)
            .and_then(|image| image.ensure_within(self.config.max_image_bytes).map(|_| image))
            .inspect_err(|err| log::warn!("Rejected image: {err}"))?;
        Ok(image)
    }
}

/// Single user turn: the image followed by the rating instruction.
pub fn analysis_request(image: ImageData) -> ModelRequest {
    ModelRequest {
        turns: vec![Turn::user(vec![
            Part::Image(image),
            Part::Text(prompt::ANALYZE_INSTRUCTION.to_string()),
        ])],
        ..Default::default()
    }
}

/// Replays `history`, appends `message`, and attaches the image to the earliest user turn.
pub fn chat_request(image: ImageData, message: &str, history: &[ChatMessage]) -> ModelRequest {
    let mut turns: Vec<Turn> = history
        .iter()
        .map(|entry| match entry.role {
            Role::User => Turn::user(vec![Part::Text(entry.content.clone())]),
            Role::Assistant => Turn::model(entry.content.clone()),
        })
        .collect();
    turns.push(Turn::user(vec![Part::Text(message.to_string())]));

    if let Some(first_user) = turns.iter_mut().find(|turn| turn.role == TurnRole::User) {
        first_user.parts.insert(0, Part::Image(image));
    }

    ModelRequest {
        system_instruction: Some(prompt::CHAT_SYSTEM_INSTRUCTION.to_string()),
        temperature: Some(prompt::CHAT_TEMPERATURE),
        turns,
    }
}

async fn post_analyze<M>(
    State(gateway): State<Arc<Gateway<M>>>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalysisResult>, GatewayError>
where
    M: VisionModel + Send + Sync + 'static,
{
    let Json(request) = payload.inspect_err(|err| log::warn!("Rejected analyze body: {err}"))?;
    gateway.analyze(request).await.map(Json)
}

async fn post_chat<M>(
    State(gateway): State<Arc<Gateway<M>>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, GatewayError>
where
    M: VisionModel + Send + Sync + 'static,
{
    let Json(request) = payload.inspect_err(|err| log::warn!("Rejected chat body: {err}"))?;
    gateway.chat(request).await.map(Json)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub fn router<M>(gateway: Arc<Gateway<M>>) -> Router
where
    M: VisionModel + Send + Sync + 'static,
{
    let body_limit = gateway.config().body_limit();
    let cors = cors_layer(&gateway.config().allowed_origins);

    Router::new()
        .route("/", get(|| async { "Welcome to the performativity gateway!" }))
        .route("/health", get(health))
        .route("/api/analyze", post(post_analyze::<M>))
        .route("/api/chat", post(post_chat::<M>))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(gateway)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|origin| origin == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins.iter().filter_map(|origin| {
            HeaderValue::from_str(origin)
                .inspect_err(|_| log::warn!("Ignoring invalid CORS origin {origin:?}"))
                .ok()
        }))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}
