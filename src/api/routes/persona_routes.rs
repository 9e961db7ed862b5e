//! Persona Routes

use crate::api::handlers::persona_handler::*;
use axum::{Router, routing::get};

use crate::api::app_state::AppState;

/// 创建人设路由器
pub fn create_persona_router() -> Router<AppState> {
    Router::new()
        .route("/personas", get(list_personas))
        .route("/personas/:id", get(get_persona))
}
