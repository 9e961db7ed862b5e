use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::debug;

use crate::{
    api::{app_state::AppState, dto::persona_dto::*},
    error::AppError,
};

pub async fn list_personas(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let personas: Vec<PersonaSummaryResponse> = state
        .registry
        .list()
        .iter()
        .map(|p| PersonaSummaryResponse::from(p.as_ref()))
        .collect();

    Ok(Json(PersonaListResponse {
        total: personas.len(),
        personas,
    }))
}

pub async fn get_persona(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    debug!("Getting persona: {}", id);
    let persona = state.registry.require(&id)?;
    Ok(Json(persona.as_ref().clone()))
}
