//! Call Analysis Routes

use crate::api::handlers::call_handler::*;
use axum::{Router, routing::post};

use crate::api::app_state::AppState;

/// 创建通话分析路由器
pub fn create_call_router() -> Router<AppState> {
    Router::new().route("/calls/analyze", post(analyze_call))
}
