//! Routes 模块
//!
//! 定义 API 路由。

pub mod call_routes;
pub mod persona_routes;
pub mod score_routes;
pub mod session_routes;
