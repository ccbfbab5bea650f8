use axum::{
    Form, Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use tracing::info;

use crate::AppState;
use crate::config::AppConfig;
use crate::ui::chat::{chat_panel, feed_update};
use crate::ui::page::index_page;
use crate::widget::{ChatWidget, QUICK_PROMPTS, WidgetSnapshot};

/// Response header asking HTMX to reload the page.
const HX_REFRESH: &str = "HX-Refresh";

/// Upper bound on how often idle widgets are swept.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        // HTML pages and fragments
        .route("/", get(index_handler))
        .route("/chat/{id}/messages", get(get_panel).post(post_message))
        .route("/chat/{id}/feed", get(get_feed))
        .route("/chat/{id}/quick/{index}", post(post_quick_prompt))
        // JSON
        .route("/api/chat/{id}", get(api_get_widget))
        .route("/generate", post(proxy_generate))
        .route("/health", get(health))
        // Static assets
        .nest_service("/static", ServeDir::new("static"))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    info!(
        name: "generation.config.loaded",
        base_url = %config.generation.base_url,
        api_key_set = !config.generation.api_key.is_empty(),
        "Generation service configuration loaded"
    );

    let state = AppState::new(&config)?;
    spawn_idle_sweeper(&state, config.session.idle_timeout());

    let app = router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %format!("http://{addr}"),
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// Periodically drop widgets whose page has gone away.
fn spawn_idle_sweeper(state: &AppState, timeout: Duration) {
    let widgets = state.widgets.clone();
    let period = timeout.min(MAX_SWEEP_INTERVAL).max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let removed = widgets.cleanup_expired_with_timeout(timeout);
            if removed > 0 {
                tracing::debug!(removed, remaining = widgets.len(), "Swept idle widgets");
            }
        }
    });
}

// ─────────────────────────────────────────────────────────────────────────────
// HTML Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET / - Full page with a brand-new conversation.
async fn index_handler(State(state): State<AppState>) -> Html<String> {
    let widget = state.widgets.create();
    tracing::debug!(widget_id = %widget.id(), "Created widget for page load");
    Html(index_page(&widget.snapshot(), &*state.renderer))
}

/// Form body for message submission.
#[derive(Debug, Deserialize)]
struct SubmitForm {
    /// Draft text from the input box.
    #[serde(default)]
    message: String,
}

/// GET /chat/:id/messages - Current chat panel (HTMX fragment).
async fn get_panel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, Response> {
    let widget = find_page_widget(&state, &id)?;
    Ok(render_panel(&state, &widget.snapshot()))
}

/// GET /chat/:id/feed - Feed fragment for the pending-reply poll.
async fn get_feed(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, Response> {
    let widget = find_page_widget(&state, &id)?;
    Ok(Html(feed_update(&widget.snapshot(), &*state.renderer)))
}

/// POST /chat/:id/messages - Submit the draft.
async fn post_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<SubmitForm>,
) -> Result<Html<String>, Response> {
    let widget = find_page_widget(&state, &id)?;
    widget.set_input(form.message);
    start_submission(&widget, None);
    Ok(render_panel(&state, &widget.snapshot()))
}

/// POST /chat/:id/quick/:index - Submit one of the quick prompts.
async fn post_quick_prompt(
    State(state): State<AppState>,
    Path((id, index)): Path<(String, usize)>,
) -> Result<Html<String>, Response> {
    let widget = find_page_widget(&state, &id)?;
    let prompt = QUICK_PROMPTS
        .get(index)
        .ok_or_else(|| StatusCode::NOT_FOUND.into_response())?;
    start_submission(&widget, Some(prompt));
    Ok(render_panel(&state, &widget.snapshot()))
}

// ─────────────────────────────────────────────────────────────────────────────
// API Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET /api/chat/:id - Widget state as JSON.
async fn api_get_widget(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WidgetSnapshot>, StatusCode> {
    let widget = find_widget(&state, &id)?;
    Ok(Json(widget.snapshot()))
}

/// POST /generate - Pass-through to the generation service.
async fn proxy_generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);

    match state.proxy.forward(authorization, body).await {
        Ok((status, bytes)) => {
            tracing::debug!(status = status.as_u16(), "Proxied generation request");
            (status, [(header::CONTENT_TYPE, "application/json")], bytes).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, endpoint = %state.proxy.endpoint(), "Generation proxy failed");
            (
                StatusCode::BAD_GATEWAY,
                format!("Failed to reach generation service: {e}"),
            )
                .into_response()
        }
    }
}

/// GET /health
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn find_widget(state: &AppState, id: &str) -> Result<ChatWidget, StatusCode> {
    state.widgets.get(id).ok_or_else(|| {
        tracing::debug!(widget_id = %id, "Widget not found");
        StatusCode::NOT_FOUND
    })
}

/// Like [`find_widget`], for routes driven by HTMX from an open page.
///
/// A widget that was swept while its page stayed open answers `404` with
/// `HX-Refresh: true`, so the page reloads into a fresh conversation instead
/// of silently ignoring the click.
fn find_page_widget(state: &AppState, id: &str) -> Result<ChatWidget, Response> {
    find_widget(state, id).map_err(|status| {
        (
            status,
            [(HX_REFRESH, "true")],
            "This chat session has expired. Reloading…",
        )
            .into_response()
    })
}

/// Accept the submission if the gate allows it and settle it in the background.
fn start_submission(widget: &ChatWidget, text: Option<&str>) {
    if let Some(pending) = widget.begin_submit(text) {
        tokio::spawn(pending.complete());
    }
}

fn render_panel(state: &AppState, snapshot: &WidgetSnapshot) -> Html<String> {
    Html(chat_panel(snapshot, &*state.renderer))
}
