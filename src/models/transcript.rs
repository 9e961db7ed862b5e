//! 通话转写模型
//!
//! 已转写、带时间戳的通话片段。转写本身由外部完成。

use serde::{Deserialize, Serialize};

/// 说话方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Agent,
    Client,
}

/// 转写片段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// 开始时间（秒）
    pub start: f64,
    /// 结束时间（秒）
    pub end: f64,
    /// 文本
    pub text: String,
    /// 说话方（未标注时为空）
    #[serde(default)]
    pub speaker: Option<Speaker>,
}

impl TranscriptSegment {
    pub fn new(start: f64, end: f64, text: &str, speaker: Option<Speaker>) -> Self {
        Self {
            start,
            end,
            text: text.to_string(),
            speaker,
        }
    }
}

/// 完整通话转写
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallTranscript {
    /// 片段（按时间顺序）
    pub segments: Vec<TranscriptSegment>,
    /// 通话时长（秒）
    pub duration: f64,
    /// 语言
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    "en".to_string()
}

impl CallTranscript {
    pub fn new(segments: Vec<TranscriptSegment>, duration: f64) -> Self {
        Self {
            segments,
            duration,
            language: default_language(),
        }
    }

    /// 某一方的发言 (文本, 开始时间)
    pub fn turns_of(&self, speaker: Speaker) -> Vec<(&str, f64)> {
        self.segments
            .iter()
            .filter(|s| s.speaker == Some(speaker))
            .map(|s| (s.text.as_str(), s.start))
            .collect()
    }

    pub fn agent_turns(&self) -> Vec<(&str, f64)> {
        self.turns_of(Speaker::Agent)
    }

    pub fn client_turns(&self) -> Vec<(&str, f64)> {
        self.turns_of(Speaker::Client)
    }

    /// 是否所有片段都已标注说话方
    pub fn is_labelled(&self) -> bool {
        self.segments.iter().all(|s| s.speaker.is_some())
    }
}
