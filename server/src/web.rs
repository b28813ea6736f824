use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use reelchef::error::{PollError, SubmitError};
use reelchef::model::{JobView, PlanTier};
use reelchef::pipeline::RunOutcome;
use reelchef::quota::QuotaStatus;
use reelchef::secrets::verify_shared_secret;
use reelchef::service::{SubmitRequest, SubmitResponse};
use serde::Deserialize;
use serde_json::json;

use crate::state::AppState;

/// Set by the auth collaborator in front of this service.
pub const USER_HEADER: &str = "x-user-id";
pub const WORKER_SECRET_HEADER: &str = "x-worker-secret";

type SharedState = Arc<AppState>;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/extractions", post(submit))
        .route("/api/extractions/:job_id", get(poll))
        .route("/api/quota", get(quota))
        .route("/api/internal/extractions/:job_id/run", post(run_job))
        .route(
            "/api/internal/subscriptions/:user_id/reset",
            post(reset_subscription),
        )
        .route(
            "/api/internal/subscriptions/:user_id/plan",
            put(change_plan),
        )
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(state)
}

#[derive(Debug)]
pub enum HttpError {
    Submit(SubmitError),
    Poll(PollError),
    Unauthorized(&'static str),
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        match &self {
            HttpError::Submit(
                e @ SubmitError::QuotaExceeded {
                    used,
                    limit,
                    plan_tier,
                },
            ) => (
                StatusCode::PAYMENT_REQUIRED,
                Json(json!({
                    "error": e.to_string(),
                    "used": used,
                    "limit": limit,
                    "planTier": plan_tier,
                })),
            ),
            HttpError::Submit(e @ SubmitError::Database(_)) => {
                log::error!("Submission failed: {e}");
                internal_error()
            }
            HttpError::Submit(e) => (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": e.to_string()})),
            ),
            HttpError::Poll(e @ PollError::NotFound) => (
                StatusCode::NOT_FOUND,
                Json(json!({"error": e.to_string()})),
            ),
            HttpError::Poll(e) => {
                log::error!("Poll failed: {e}");
                internal_error()
            }
            HttpError::Unauthorized(reason) => {
                (StatusCode::UNAUTHORIZED, Json(json!({"error": reason})))
            }
        }
        .into_response()
    }
}

fn internal_error() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "Internal server error"})),
    )
}

impl From<SubmitError> for HttpError {
    fn from(err: SubmitError) -> Self {
        Self::Submit(err)
    }
}

impl From<PollError> for HttpError {
    fn from(err: PollError) -> Self {
        Self::Poll(err)
    }
}

/// The authenticated caller, as asserted by the upstream auth layer.
pub struct UserId(pub String);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for UserId {
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| UserId(v.to_string()))
            .ok_or(HttpError::Unauthorized("Missing user"))
    }
}

fn authorize_worker(state: &AppState, headers: &HeaderMap) -> Result<(), HttpError> {
    let expected = state
        .worker_secret
        .as_ref()
        .ok_or(HttpError::Unauthorized("Internal routes are disabled"))?;
    let presented = headers
        .get(WORKER_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if verify_shared_secret(expected, presented) {
        Ok(())
    } else {
        Err(HttpError::Unauthorized("Invalid worker secret"))
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

async fn submit(
    State(state): State<SharedState>,
    UserId(user_id): UserId,
    Json(request): Json<SubmitRequest>,
) -> Result<Response, HttpError> {
    let response = state.service.submit(&user_id, request).await?;
    let status = match response {
        SubmitResponse::Accepted { .. } => StatusCode::ACCEPTED,
        SubmitResponse::Existing { .. } => StatusCode::OK,
    };
    Ok((status, Json(response)).into_response())
}

async fn poll(
    State(state): State<SharedState>,
    UserId(user_id): UserId,
    Path(job_id): Path<String>,
) -> Result<Json<JobView>, HttpError> {
    Ok(Json(state.service.poll(&user_id, &job_id)?))
}

async fn quota(
    State(state): State<SharedState>,
    UserId(user_id): UserId,
) -> Result<Json<QuotaStatus>, HttpError> {
    Ok(Json(state.service.quota_status(&user_id)?))
}

/// Runs a job synchronously. A failed job is a processed request, reported
/// as 422 so schedulers can tell it from a completed one.
async fn run_job(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(job_id): Path<String>,
) -> Result<Response, HttpError> {
    authorize_worker(&state, &headers)?;
    let outcome = state.service.run_job(&job_id).await;
    let status = match outcome {
        RunOutcome::NotFound => StatusCode::NOT_FOUND,
        RunOutcome::Failed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        RunOutcome::Skipped { .. } | RunOutcome::Completed { .. } => StatusCode::OK,
    };
    Ok((status, Json(outcome)).into_response())
}

async fn reset_subscription(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> Result<Json<QuotaStatus>, HttpError> {
    authorize_worker(&state, &headers)?;
    Ok(Json(state.service.reset_quota(&user_id)?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanChange {
    plan_tier: PlanTier,
}

async fn change_plan(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    Json(change): Json<PlanChange>,
) -> Result<Json<QuotaStatus>, HttpError> {
    authorize_worker(&state, &headers)?;
    Ok(Json(state.service.set_plan(&user_id, change.plan_tier)?))
}
