//! DTO 模块
//!
//! 数据传输对象，用于 API 请求和响应的序列化。

pub mod call_dto;
pub mod persona_dto;
pub mod score_dto;
pub mod session_dto;

pub use call_dto::*;
pub use persona_dto::*;
pub use score_dto::*;
pub use session_dto::*;
