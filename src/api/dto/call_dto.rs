//! 通话分析 DTO

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::transcript::CallTranscript;
use crate::services::call_analysis::CallAnalysisReport;

/// 单次分析的片段上限
pub const MAX_SEGMENTS: u64 = 2000;

/// 通话分析请求
#[derive(Debug, Deserialize, Validate)]
pub struct AnalyzeCallRequest {
    #[validate(custom(function = "validate_transcript"))]
    pub transcript: CallTranscript,
    #[serde(default)]
    pub persona_id: Option<String>,
    /// 使用关键词启发式重新标注说话方；未标注的转写总会被标注
    #[serde(default)]
    pub label_speakers: bool,
}

fn validate_transcript(transcript: &CallTranscript) -> Result<(), ValidationError> {
    if transcript.segments.len() as u64 > MAX_SEGMENTS {
        return Err(ValidationError::new("too_many_segments"));
    }
    if transcript
        .segments
        .iter()
        .any(|s| !(s.start.is_finite() && s.end.is_finite()) || s.end < s.start)
    {
        return Err(ValidationError::new("invalid_segment_times"));
    }
    Ok(())
}

/// 通话分析响应
#[derive(Debug, Serialize)]
pub struct AnalyzeCallResponse {
    pub report: CallAnalysisReport,
    /// 纯文本报告
    pub text: String,
}
