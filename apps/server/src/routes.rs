//! Request handlers.

use std::convert::Infallible;

use async_stream::stream;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::response::sse::{Event as SseEvent, Sse};
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

use deepcut_core::{ChannelEmitter, ProgressEvent, SilentEmitter};
use deepcut_shared::{DeepCutError, GenerationRequest, Idea, IdeaId};

use crate::AppState;
use crate::error::ApiError;

const IDEA_NOT_FOUND: &str = "Idea not found";

pub(crate) async fn health() -> Json<Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// Research stream
// ---------------------------------------------------------------------------

/// Validate the request body before any stage runs.
fn research_request(
    body: Result<Json<Value>, JsonRejection>,
) -> Result<GenerationRequest, ApiError> {
    let value = match body {
        Ok(Json(value)) => value,
        Err(rejection) => {
            warn!(error = %rejection, "unreadable research request body");
            Value::Null
        }
    };
    let topic = value.get("topic").and_then(Value::as_str).unwrap_or_default();
    let style = value
        .get("style")
        .and_then(Value::as_str)
        .map(str::to_string);
    Ok(GenerationRequest::new(topic, style)?)
}

pub(crate) async fn research(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, ApiError> {
    let request = research_request(body)?;
    info!(topic = %request.topic(), "research run requested");

    let (emitter, rx) = ChannelEmitter::channel();
    let pipeline = state.pipeline.clone();
    tokio::spawn(async move {
        // Failures already reached the client as an `error` event.
        let _ = pipeline.run(&request, &emitter).await;
    });

    Ok(Sse::new(progress_stream(rx)))
}

/// Forward progress events as SSE frames, ending after `done` or `error`.
fn progress_stream(
    mut rx: UnboundedReceiver<ProgressEvent>,
) -> impl Stream<Item = Result<SseEvent, Infallible>> {
    stream! {
        while let Some(event) = rx.recv().await {
            let terminal = event.is_terminal();
            match SseEvent::default().json_data(&event) {
                Ok(sse) => yield Ok(sse),
                Err(e) => warn!(error = %e, "failed to encode progress event"),
            }
            if terminal {
                break;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Automated trigger
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct CronQuery {
    secret: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DailyIdeaResponse {
    success: bool,
    id: IdeaId,
    topic: String,
    top_title: String,
    email_sent: bool,
}

/// Accept the secret from `?secret=` or `Authorization: Bearer <secret>`.
/// An empty query value counts as absent.
fn authorize(
    expected: Option<&str>,
    query: Option<&str>,
    headers: &HeaderMap,
) -> Result<(), ApiError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v));
    let provided = query.filter(|q| !q.is_empty()).or(header);

    match (expected, provided) {
        (Some(expected), Some(provided)) if expected == provided => Ok(()),
        _ => Err(DeepCutError::auth("Unauthorized").into()),
    }
}

pub(crate) async fn daily_idea(
    State(state): State<AppState>,
    Query(query): Query<CronQuery>,
    headers: HeaderMap,
) -> Result<Json<DailyIdeaResponse>, ApiError> {
    authorize(state.cron_secret.as_deref(), query.secret.as_deref(), &headers)?;

    let outcome = state.pipeline.run_automated(&SilentEmitter).await?;
    let top_title = outcome.top_title();

    let email_sent = match &state.mailer {
        Some(mailer) => match mailer.send_digest(&outcome).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "daily digest email failed");
                false
            }
        },
        None => false,
    };

    info!(id = %outcome.id, topic = %outcome.topic, email_sent, "daily idea generated");
    Ok(Json(DailyIdeaResponse {
        success: true,
        id: outcome.id,
        topic: outcome.topic,
        top_title,
        email_sent,
    }))
}

// ---------------------------------------------------------------------------
// Stored ideas
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct ListQuery {
    search: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct IdeasResponse {
    ideas: Vec<Idea>,
}

#[derive(Debug, Serialize)]
pub(crate) struct IdeaResponse {
    idea: Idea,
}

#[derive(Debug, Serialize)]
pub(crate) struct DeleteResponse {
    success: bool,
}

pub(crate) async fn list_ideas(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<IdeasResponse>, ApiError> {
    let search = query.search.as_deref().filter(|s| !s.trim().is_empty());
    let ideas = state.store.get_all_ideas(search).await?;
    Ok(Json(IdeasResponse { ideas }))
}

pub(crate) async fn get_idea(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<IdeaResponse>, ApiError> {
    let id: IdeaId = id.parse().map_err(|_| ApiError::NotFound(IDEA_NOT_FOUND))?;
    let idea = state
        .store
        .get_idea_by_id(&id)
        .await?
        .ok_or(ApiError::NotFound(IDEA_NOT_FOUND))?;
    Ok(Json(IdeaResponse { idea }))
}

pub(crate) async fn delete_idea(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let id: IdeaId = id.parse().map_err(|_| ApiError::NotFound(IDEA_NOT_FOUND))?;
    if !state.store.delete_idea(&id).await? {
        return Err(ApiError::NotFound(IDEA_NOT_FOUND));
    }
    info!(%id, "idea deleted");
    Ok(Json(DeleteResponse { success: true }))
}
