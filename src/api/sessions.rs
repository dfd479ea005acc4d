use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::validation::check_payload;
use crate::core::state::AppState;
use crate::exam::question::load_question_set;
use crate::exam::state::StateError;
use crate::schemas::session::{
    EditDraftRequest, EnterExamRequest, RunResponse, SelectQuestionRequest, SessionResponse,
    SetLanguageRequest, SubmitResponse,
};
use crate::services::session::{
    FinalizeError, FinalizeMode, FinalizeOutcome, SessionController, StudentIdentity,
};
use crate::stores::types::StudentStatus;
use crate::tasks::countdown;


pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/enter", post(enter_exam))
        .route("/sessions/:session_id", get(get_session))
        .route("/sessions/:session_id/select", post(select_question))
        .route("/sessions/:session_id/language", post(set_language))
        .route("/sessions/:session_id/draft", put(edit_draft))
        .route("/sessions/:session_id/run", post(run_code))
        .route("/sessions/:session_id/lock", post(lock_question))
        .route("/sessions/:session_id/submit", post(submit_exam))
}

/// Gate on the approval store, then start (or resume) the student's session.
async fn enter_exam(
    State(state): State<AppState>,
    Json(payload): Json<EnterExamRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    check_payload(&payload)?;
    let name = payload.student_name.trim().to_string();
    let register_number = payload.register_number.trim().to_string();

    let record = state
        .approvals()
        .find_student(&name, &register_number)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check student status"))?;

    let student = match record {
        Some(record) if record.status == StudentStatus::Approved => StudentIdentity {
            name,
            register_number: register_number.clone(),
            student_id: Some(record.id),
        },
        Some(record) if record.status == StudentStatus::Completed => {
            return Err(ApiError::Conflict("You have already completed the exam".to_string()));
        }
        Some(record) if record.status == StudentStatus::Rejected => {
            return Err(ApiError::Forbidden("Access denied: your request was rejected"));
        }
        _ => return Err(ApiError::Forbidden("Please wait for admin approval")),
    };

    if let Some(existing) = state.sessions().find_for_student(&register_number).await {
        let snapshot = existing.snapshot().await;
        return Ok((StatusCode::OK, Json(SessionResponse::from_snapshot(snapshot))));
    }

    let active = state.sessions().active_count().await;
    if active as u64 >= state.settings().exam().max_concurrent_sessions {
        return Err(ApiError::ServiceUnavailable(
            "Exam service is temporarily at capacity. Try again in a few minutes.".to_string(),
        ));
    }

    let questions = load_question_set(state.questions().as_ref())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load exam questions"))?;
    if questions.is_empty() {
        return Err(ApiError::NotFound("No exam questions available".to_string()));
    }

    let controller = SessionController::new(
        student,
        questions,
        state.settings().exam().duration_seconds,
        state.executor().clone(),
        state.submissions().clone(),
        state.approvals().clone(),
    );
    countdown::spawn(controller.clone());
    state.sessions().insert(controller.clone()).await;
    tracing::info!(
        session_id = %controller.id(),
        register_number = %controller.student().register_number,
        "Exam session started"
    );

    let snapshot = controller.snapshot().await;
    Ok((StatusCode::CREATED, Json(SessionResponse::from_snapshot(snapshot))))
}

async fn get_session(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SessionResponse>, ApiError> {
    let controller = fetch_controller(&state, &session_id).await?;
    Ok(Json(SessionResponse::from_snapshot(controller.snapshot().await)))
}

async fn select_question(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<SelectQuestionRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let controller = fetch_controller(&state, &session_id).await?;
    let snapshot = controller.select_question(payload.index).await;
    Ok(Json(SessionResponse::from_snapshot(snapshot)))
}

async fn set_language(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<SetLanguageRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let controller = fetch_controller(&state, &session_id).await?;
    let snapshot = controller.set_language(payload.language).await.map_err(map_state_error)?;
    Ok(Json(SessionResponse::from_snapshot(snapshot)))
}

async fn edit_draft(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<EditDraftRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let controller = fetch_controller(&state, &session_id).await?;
    let snapshot = controller.edit_draft(payload.code).await.map_err(map_state_error)?;
    Ok(Json(SessionResponse::from_snapshot(snapshot)))
}

async fn run_code(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<RunResponse>, ApiError> {
    let controller = fetch_controller(&state, &session_id).await?;
    let report = controller.run_current().await.map_err(map_state_error)?;
    Ok(Json(RunResponse::from_report(report)))
}

async fn lock_question(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SessionResponse>, ApiError> {
    let controller = fetch_controller(&state, &session_id).await?;
    let snapshot = controller.lock_current().await.map_err(map_state_error)?;
    Ok(Json(SessionResponse::from_snapshot(snapshot)))
}

async fn submit_exam(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let controller = fetch_controller(&state, &session_id).await?;
    match controller.finalize(FinalizeMode::ManualSubmit).await {
        Ok(FinalizeOutcome::Submitted(summary)) => Ok(Json(SubmitResponse::submitted(summary))),
        Ok(FinalizeOutcome::AlreadySubmitted) => {
            let snapshot = controller.snapshot().await;
            Ok(Json(SubmitResponse::already_submitted(snapshot.state.score)))
        }
        Err(FinalizeError::Persistence(_)) => Err(ApiError::ServiceUnavailable(
            "There was an error submitting your results.".to_string(),
        )),
    }
}

async fn fetch_controller(
    state: &AppState,
    session_id: &str,
) -> Result<Arc<SessionController>, ApiError> {
    state
        .sessions()
        .get(session_id)
        .await
        .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))
}

fn map_state_error(err: StateError) -> ApiError {
    match err {
        StateError::QuestionLocked | StateError::RunInProgress => {
            ApiError::Conflict(err.to_string())
        }
        StateError::SessionClosed => ApiError::BadRequest(err.to_string()),
    }
}
