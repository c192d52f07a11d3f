use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::screening::{EvaluationRecord, ScreeningSession};
use crate::scoring::ScoringWeights;
use crate::screening::evaluator::EvaluationOutcome;
use crate::screening::ranking::display_order;
use crate::screening::summary::SessionSummary;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateSessionRequest {
    pub job_id: Uuid,
    pub candidate_ids: Vec<Uuid>,
    pub pass_threshold: Option<f64>,
    pub top_n_candidates: Option<u32>,
}

#[derive(Serialize)]
pub struct SessionProgress {
    #[serde(flatten)]
    pub session: ScreeningSession,
    pub progress_pct: f64,
    pub duration_seconds: Option<f64>,
    pub is_running: bool,
}

#[derive(Deserialize)]
pub struct ScoreRequest {
    pub candidate_id: Uuid,
    pub job_id: Uuid,
}

fn progress(state: &AppState, session: ScreeningSession) -> SessionProgress {
    SessionProgress {
        progress_pct: session.progress_pct(),
        duration_seconds: session.duration_seconds(),
        is_running: state.coordinator.is_running(session.id),
        session,
    }
}

/// POST /api/v1/screening/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionProgress>), AppError> {
    let session = state
        .coordinator
        .create_session(
            req.job_id,
            &req.candidate_ids,
            req.pass_threshold,
            req.top_n_candidates,
        )
        .await?;
    // The run happens in the background; progress is observed by polling.
    state.coordinator.start_run(session.id)?;
    Ok((StatusCode::ACCEPTED, Json(progress(&state, session))))
}

/// GET /api/v1/screening/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionProgress>, AppError> {
    let session = state.store.get_session(id).await?;
    Ok(Json(progress(&state, session)))
}

/// POST /api/v1/screening/sessions/:id/run
/// Finished sessions are returned as-is (200); otherwise the run is started
/// (202). A run already in progress is a 409.
pub async fn handle_run_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<SessionProgress>), AppError> {
    let session = state.store.get_session(id).await?;
    if session.status.is_terminal() {
        return Ok((StatusCode::OK, Json(progress(&state, session))));
    }
    state.coordinator.start_run(id)?;
    Ok((StatusCode::ACCEPTED, Json(progress(&state, session))))
}

/// POST /api/v1/screening/sessions/:id/cancel
pub async fn handle_cancel_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionProgress>, AppError> {
    let session = state.coordinator.cancel(id).await?;
    Ok(Json(progress(&state, session)))
}

/// GET /api/v1/screening/sessions/:id/results
pub async fn handle_session_results(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<EvaluationRecord>>, AppError> {
    // 404 for an unknown session rather than an empty list
    state.store.get_session(id).await?;
    let mut units = state.store.list_units(id).await?;
    units.sort_by(display_order);
    Ok(Json(units))
}

/// GET /api/v1/screening/sessions/:id/summary
pub async fn handle_session_summary(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSummary>, AppError> {
    Ok(Json(state.coordinator.summary(id).await?))
}

/// GET /api/v1/screening/results/:id
pub async fn handle_get_result(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EvaluationRecord>, AppError> {
    Ok(Json(state.store.get_unit(id).await?))
}

/// POST /api/v1/screening/results/:id/retry
pub async fn handle_retry_result(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EvaluationRecord>, AppError> {
    Ok(Json(state.coordinator.retry_unit(id).await?))
}

/// POST /api/v1/screening/score
pub async fn handle_score_one(
    State(state): State<AppState>,
    Json(req): Json<ScoreRequest>,
) -> Result<Json<EvaluationOutcome>, AppError> {
    let outcome = state
        .coordinator
        .score_one(req.candidate_id, req.job_id)
        .await?;
    Ok(Json(outcome))
}

/// PUT /api/v1/jobs/:id/weights
pub async fn handle_update_weights(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(weights): Json<ScoringWeights>,
) -> Result<Json<ScoringWeights>, AppError> {
    state.coordinator.update_weights(id, weights).await?;
    Ok(Json(weights))
}
