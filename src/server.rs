use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{HeaderName, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, get_service, post},
};
use futures::{Stream, StreamExt, stream::BoxStream};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;

use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;

use tracing::info;

use crate::AppState;
use crate::aggregator::StreamAggregator;
use crate::config::AppConfig;
use crate::llm::LlmCompletionService;
use crate::normalized::{ChatEvent, event_line};
use crate::prompts::PromptStore;
use crate::telemetry::preview;
use crate::workflow::{WorkflowEngine, WorkflowState};

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let settings = config.llm_settings();
    info!(
        name: "llm.config.loaded",
        base_url = %settings.base_url,
        model = %settings.model,
        timeout_secs = settings.timeout.as_secs(),
        "LLM configuration loaded"
    );
    if settings.api_key.is_none() {
        tracing::warn!("No API key configured; completion requests will be unauthenticated");
    }

    let completion = Arc::new(LlmCompletionService::from_settings(settings)?);

    let prompts = PromptStore::new(&config.prompts.dir);
    if config.prompts.preload {
        prompts.preload()?;
    }

    let state = AppState::new(Arc::clone(&config), completion, Arc::new(prompts));
    let app = build_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        page = %config.storage.page_path.display(),
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// All routes with CORS and request tracing applied.
pub fn build_router(state: AppState) -> Router {
    let cors = if state.config.server.cors_permissive {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/chat-message", post(chat_message))
        .route("/page", get(page))
        .route(
            "/chat",
            get_service(ServeFile::new(&state.config.storage.chat_ui_path)),
        )
        .route("/health", get(health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Request body for the chat endpoint.
#[derive(Debug, Deserialize)]
struct ChatMessageRequest {
    message: String,
}

/// POST /chat-message - Run the workflow and stream its events.
async fn chat_message(
    State(state): State<AppState>,
    Json(req): Json<ChatMessageRequest>,
) -> Response {
    let request_id = new_request_id();
    info!(
        request_id = %request_id,
        message = %preview(&req.message, 50),
        "Received chat message"
    );

    let events: BoxStream<'static, ChatEvent> = match state.pages.read_existing().await {
        Ok(existing) => {
            let run = WorkflowState::new(req.message, existing);
            let engine = WorkflowEngine::new(Arc::clone(&state.agents));
            StreamAggregator::new(engine, request_id)
                .into_stream(run)
                .boxed()
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Failed to read existing page");
            futures::stream::iter([
                ChatEvent::start(&request_id),
                ChatEvent::error(&request_id, e.to_string()),
                ChatEvent::finished(&request_id),
            ])
            .boxed()
        }
    };

    build_event_stream_response(events)
}

/// GET /page - The current page with surrounding chatter removed.
async fn page(State(state): State<AppState>) -> Result<Html<String>, (StatusCode, String)> {
    state.pages.read_extracted().await.map(Html).map_err(|e| {
        tracing::error!(error = %e, "Failed to read page");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })
}

/// GET /health
async fn health() -> &'static str {
    "ok"
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// `req_<unix seconds>_<8 hex chars>`.
pub fn new_request_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("req_{}_{}", chrono::Utc::now().timestamp(), &suffix[..8])
}

/// Wrap an event stream as a newline-delimited JSON response.
fn build_event_stream_response<S>(events: S) -> Response
where
    S: Stream<Item = ChatEvent> + Send + 'static,
{
    let body = Body::from_stream(events.map(|evt| Ok::<_, Infallible>(event_line(&evt))));

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        body,
    )
        .into_response()
}
