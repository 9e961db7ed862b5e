//! Handlers 模块
//!
//! HTTP 请求处理程序。

pub mod call_handler;
pub mod persona_handler;
pub mod score_handler;
pub mod session_handler;

pub use call_handler::*;
pub use persona_handler::*;
pub use score_handler::*;
pub use session_handler::*;
