use axum::{Json, extract::State, response::IntoResponse};
use tracing::debug;
use validator::Validate;

use crate::{
    api::{app_state::AppState, dto::score_dto::*},
    error::AppError,
    services::coaching::suggested_techniques,
};

/// Score one utterance without a session
pub async fn score_utterance(
    State(state): State<AppState>,
    Json(request): Json<ScoreRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    let persona = request
        .persona_id
        .as_deref()
        .map(|id| state.registry.require(id))
        .transpose()?;

    let objection = match (&persona, request.objection_id.as_deref()) {
        (Some(p), Some(objection_id)) => Some(p.objection(objection_id).ok_or_else(|| {
            AppError::NotFound(format!(
                "Objection '{}' not found for persona '{}'",
                objection_id, p.id
            ))
        })?),
        (None, Some(_)) => {
            return Err(AppError::Validation(
                "objection_id requires persona_id".to_string(),
            ));
        }
        (Some(p), None) => p.objection_patterns.first(),
        (None, None) => None,
    };

    let score = state.scorer.score_utterance(&request.utterance, objection);
    debug!(total = score.total, "Scored standalone utterance");
    state.metrics.record_turn(score.rapport_breakers_triggered.len(), None);

    Ok(Json(ScoreResponse {
        objection_id: objection.map(|o| o.id.clone()),
        suggestions: suggested_techniques(&score),
        score,
    }))
}
