//! Webhook intake for platform event callbacks.
//!
//! One endpoint does all the work: the platform POSTs every event to
//! `/slack/events`, and anything that is not a fresh mention is answered
//! 200 and dropped. Accepted mentions are spawned as detached turns so
//! the response goes out before the platform's delivery timeout.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::dedup::{Claim, DedupGuard};
use crate::error::{Error, ServerError};
use crate::relay::{ConversationManager, TurnRequest};

/// Shared state for webhook handlers.
pub struct WebhookState {
    pub manager: Arc<ConversationManager>,
    pub dedup: DedupGuard,
}

/// Outer envelope of every event POST.
#[derive(Debug, Deserialize)]
struct EventEnvelope {
    #[serde(rename = "type")]
    kind: String,
    challenge: Option<String>,
    event: Option<InnerEvent>,
}

/// The event payload inside an `event_callback` envelope. Only the fields
/// a mention turn needs are decoded.
#[derive(Debug, Deserialize)]
struct InnerEvent {
    #[serde(rename = "type")]
    kind: String,
    client_msg_id: Option<String>,
    text: Option<String>,
    channel: Option<String>,
    ts: Option<String>,
    thread_ts: Option<String>,
}

/// Build the webhook router.
pub fn router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route("/slack/events", post(events_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1 MB max request body
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and start serving in the background.
///
/// Returns the actual bound `SocketAddr` (useful when binding to port 0).
pub async fn start_server(
    addr: SocketAddr,
    state: Arc<WebhookState>,
) -> Result<SocketAddr, Error> {
    let listener =
        tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::StartupFailed {
                reason: format!("failed to bind {addr}: {e}"),
            })?;
    let bound_addr = listener
        .local_addr()
        .map_err(|e| ServerError::StartupFailed {
            reason: format!("failed to get local addr: {e}"),
        })?;

    let app = router(state);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "webhook server error");
        }
    });

    tracing::info!(addr = %bound_addr, "webhook server listening");
    Ok(bound_addr)
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn events_handler(
    State(state): State<Arc<WebhookState>>,
    Json(envelope): Json<EventEnvelope>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    // Endpoint ownership probe: echo the challenge and nothing else.
    if envelope.kind == "url_verification" {
        let challenge = envelope.challenge.unwrap_or_default();
        return Ok(Json(json!({ "challenge": challenge })));
    }

    if envelope.kind != "event_callback" {
        return Ok(Json(json!({ "status": "ignored" })));
    }
    let Some(event) = envelope.event else {
        return Ok(Json(json!({ "status": "ignored" })));
    };
    if event.kind != "app_mention" {
        return Ok(Json(json!({ "status": "ignored" })));
    }

    // Bot echoes and message edits carry no client_msg_id.
    let Some(client_msg_id) = event.client_msg_id else {
        return Ok(Json(json!({ "status": "ignored" })));
    };
    let (Some(channel), Some(ts)) = (event.channel, event.ts) else {
        return Ok(Json(json!({ "status": "ignored" })));
    };

    match state.dedup.claim(&client_msg_id, &ts).await {
        Ok(Claim::Fresh) => {}
        Ok(Claim::Duplicate) => {
            tracing::info!(%client_msg_id, "duplicate delivery dropped");
            return Ok(Json(json!({ "status": "Success" })));
        }
        // A non-200 makes the platform redeliver once the store is back.
        Err(e) => {
            tracing::error!(error = %e, %client_msg_id, "dedup claim failed");
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            ));
        }
    }

    let thread_id = event.thread_ts.unwrap_or_else(|| ts.clone());
    let prompt = strip_mention(event.text.as_deref().unwrap_or_default());
    tracing::info!(%channel, %thread_id, %client_msg_id, "mention accepted");

    let request = TurnRequest {
        channel,
        thread_id,
        prompt,
    };
    let manager = Arc::clone(&state.manager);
    tokio::spawn(async move {
        if let Err(e) = manager.run_turn(request).await {
            tracing::error!(error = %e, "relay turn failed");
        }
    });

    Ok(Json(json!({ "status": "Success" })))
}

/// Text after the first `<@...>` mention marker, trimmed. A message with
/// no marker is used whole.
fn strip_mention(text: &str) -> String {
    if let Some(start) = text.find("<@") {
        if let Some(rel) = text[start..].find('>') {
            return text[start + rel + 1..].trim().to_string();
        }
    }
    text.trim().to_string()
}
