//! 会话 DTO
//!
//! 定义会话相关的请求和响应数据结构。

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::session::{Difficulty, SessionSnapshot, TrainingMode};
use crate::services::session::TurnInput;

/// 创建会话请求
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSessionRequest {
    /// 人设 ID
    #[validate(length(min = 1, max = 128))]
    pub persona_id: String,
    /// 难度（默认 medium）
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    /// 训练模式（默认 scoring）
    #[serde(default)]
    pub mode: Option<TrainingMode>,
}

/// 提交发言请求
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitTurnRequest {
    /// 销售方发言，允许为空，最多 4000 字符
    #[validate(length(max = 4000))]
    pub utterance: String,
    /// 客户上一句
    #[serde(default)]
    #[validate(length(max = 4000))]
    pub client_message: Option<String>,
    /// 显式转交
    #[serde(default)]
    pub escalate: bool,
}

impl From<SubmitTurnRequest> for TurnInput {
    fn from(request: SubmitTurnRequest) -> Self {
        Self {
            utterance: request.utterance,
            client_message: request.client_message,
            escalate: request.escalate,
        }
    }
}

/// 会话列表响应
#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionSnapshot>,
    pub total: usize,
}

/// 人设提示词响应
#[derive(Debug, Serialize)]
pub struct PersonaPromptResponse {
    pub session_id: String,
    pub prompt: String,
}
