use axum::{Json, extract::State, response::IntoResponse};
use tracing::debug;
use validator::Validate;

use crate::{
    api::{app_state::AppState, dto::call_dto::*},
    error::AppError,
};

pub async fn analyze_call(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeCallRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    let persona = request
        .persona_id
        .as_deref()
        .map(|id| state.registry.require(id))
        .transpose()?;

    let mut transcript = request.transcript;
    if request.label_speakers || !transcript.is_labelled() {
        state.analyzer.label_speakers(&mut transcript);
    }
    debug!(segments = transcript.segments.len(), "Analyzing call");

    let report = state.analyzer.analyze(&transcript, persona.as_deref())?;
    state.metrics.record_call_analyzed();

    Ok(Json(AnalyzeCallResponse {
        text: report.to_string(),
        report,
    }))
}
