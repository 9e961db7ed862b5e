//! Score Routes

use crate::api::handlers::score_handler::*;
use axum::{Router, routing::post};

use crate::api::app_state::AppState;

/// 创建无状态评分路由器
pub fn create_score_router() -> Router<AppState> {
    Router::new().route("/score", post(score_utterance))
}
