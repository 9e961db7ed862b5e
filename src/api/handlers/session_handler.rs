use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;
use validator::Validate;

use crate::{
    api::{app_state::AppState, dto::session_dto::*},
    error::AppError,
};

pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;
    debug!("Creating session for persona: {}", request.persona_id);

    let session = state
        .session_service
        .create(
            &request.persona_id,
            request.difficulty.unwrap_or_default(),
            request.mode.unwrap_or_default(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn list_sessions(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let sessions = state.session_service.list().await?;
    Ok(Json(SessionListResponse {
        total: sessions.len(),
        sessions,
    }))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    debug!("Getting session: {}", id);
    Ok(Json(state.session_service.get(&id).await?))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    debug!("Deleting session: {}", id);
    state.session_service.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn submit_turn(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SubmitTurnRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;
    let outcome = state.session_service.submit_turn(&id, request.into()).await?;
    Ok(Json(outcome))
}

pub async fn get_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.session_service.summary(&id).await?))
}

pub async fn get_prompt(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let prompt = state.session_service.prompt(&id).await?;
    Ok(Json(PersonaPromptResponse {
        session_id: id,
        prompt,
    }))
}
