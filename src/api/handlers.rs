//! Request handlers.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error};

use super::AppState;
use crate::config::secrets::ExposeSecret;
use crate::engine::SubmitResult;
use crate::error::Error;
use crate::intake::SourceEvent;
use crate::model::{AnswerRecord, AskRequest, QueueSnapshot, Tier, WorkId};

/// Body of `POST /api/ask`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskBody {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub amount_cents: u64,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdmissionResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<WorkId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
    pub duplicate: bool,
    pub ignored: bool,
}

impl From<&SubmitResult> for AdmissionResponse {
    fn from(result: &SubmitResult) -> Self {
        Self {
            ok: true,
            id: Some(result.item().id),
            tier: Some(result.item().tier),
            duplicate: result.is_duplicate(),
            ignored: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueueResponse {
    pub items: QueueSnapshot,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub items: Vec<AnswerRecord>,
}

/// Request failures, all rendered as `{ "error": code }`.
pub enum ApiError {
    Engine(Error),
    /// Body missing, not JSON, or of the wrong shape.
    BadBody(JsonRejection),
    /// Admin route called without a matching token.
    Forbidden,
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self::Engine(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadBody(rejection)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Engine(Error::InvalidInput(_)) => {
                (StatusCode::BAD_REQUEST, "missing_question")
            }
            ApiError::Engine(Error::Blocked) => (StatusCode::BAD_REQUEST, "blocked"),
            ApiError::Engine(Error::NotFound(_)) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Engine(other) => {
                error!("request failed: {other}");
                (StatusCode::INTERNAL_SERVER_ERROR, "server_error")
            }
            ApiError::BadBody(rejection) => {
                debug!("rejected request body: {}", rejection.body_text());
                (StatusCode::BAD_REQUEST, "invalid_body")
            }
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
        };
        (status, Json(json!({ "error": code }))).into_response()
    }
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "ok": true,
        "time": Utc::now().to_rfc3339(),
        "queued": state.engine.list_queue().len(),
        "observers": state.engine.hub().observer_count(),
    }))
}

/// POST /api/ask
pub async fn ask(
    State(state): State<AppState>,
    body: Result<Json<AskBody>, JsonRejection>,
) -> Result<Json<AdmissionResponse>, ApiError> {
    let Json(body) = body?;
    let origin = body.source.unwrap_or_else(|| "mod".to_string());
    let request = AskRequest::new(body.question, origin)
        .submitter(body.user.unwrap_or_default())
        .amount_cents(body.amount_cents);
    let result = state.engine.submit(request)?;
    Ok(Json(AdmissionResponse::from(&result)))
}

/// GET /api/queue
pub async fn list_queue(State(state): State<AppState>) -> Json<QueueResponse> {
    Json(QueueResponse {
        items: state.engine.list_queue(),
    })
}

/// POST /api/queue/:id/stop
pub async fn stop(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_id(&id)?;
    state.engine.withdraw(id)?;
    Ok(Json(json!({ "ok": true })))
}

/// POST /api/queue/:id/answer-now
pub async fn answer_now(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_id(&id)?;
    state.engine.promote(id)?;
    Ok(Json(json!({ "ok": true })))
}

/// GET /api/history
pub async fn history(State(state): State<AppState>) -> Json<HistoryResponse> {
    Json(HistoryResponse {
        items: state.engine.history(),
    })
}

/// POST /api/events
pub async fn source_event(
    State(state): State<AppState>,
    event: Result<Json<SourceEvent>, JsonRejection>,
) -> Result<Json<AdmissionResponse>, ApiError> {
    let Json(event) = event?;
    let Some(request) = state.intake.to_ask(&event) else {
        return Ok(Json(AdmissionResponse {
            ok: true,
            id: None,
            tier: None,
            duplicate: false,
            ignored: true,
        }));
    };
    let result = state.engine.submit(request)?;
    Ok(Json(AdmissionResponse::from(&result)))
}

/// POST /admin/overlay/replay
pub async fn replay(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_admin(&state, &headers)?;
    let delivered = state.engine.replay();
    Ok(Json(json!({ "ok": true, "delivered": delivered })))
}

fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(token) = &state.admin_token else {
        return Err(ApiError::Forbidden);
    };
    let presented = headers
        .get("x-admin-token")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if presented != token.expose_secret() {
        return Err(ApiError::Forbidden);
    }
    Ok(())
}

/// Unparseable ids cannot name a queued item.
fn parse_id(raw: &str) -> Result<WorkId, ApiError> {
    raw.parse::<WorkId>()
        .map_err(|_| ApiError::Engine(Error::NotFound(WorkId(uuid::Uuid::nil()))))
}
