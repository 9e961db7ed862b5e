//! 单次评分 DTO

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::score::ScoreResult;

/// 无状态评分请求
#[derive(Debug, Deserialize, Validate)]
pub struct ScoreRequest {
    #[validate(length(max = 4000))]
    pub utterance: String,
    /// 用于匹配依据和关注点的人设
    #[serde(default)]
    pub persona_id: Option<String>,
    /// 人设中的异议 ID（需要同时给出 persona_id）
    #[serde(default)]
    pub objection_id: Option<String>,
}

/// 评分响应
#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    pub objection_id: Option<String>,
    pub score: ScoreResult,
    pub suggestions: Vec<String>,
}
