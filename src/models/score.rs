//! 评分结果模型
//!
//! 单条销售发言的 CFR 四步评分。每次评分新建，创建后不再修改。

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 四个步骤的最高分
pub const MAX_ACKNOWLEDGE: u8 = 3;
pub const MAX_ISOLATE: u8 = 3;
pub const MAX_HANDLE: u8 = 3;
pub const MAX_CLOSE: u8 = 2;
/// 单轮满分 (3+3+3+2)
pub const MAX_TURN_SCORE: u8 = MAX_ACKNOWLEDGE + MAX_ISOLATE + MAX_HANDLE + MAX_CLOSE;

/// 四步得分
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepScores {
    /// 认可与肯定 (0-3)
    pub acknowledge: u8,
    /// 隔离异议 (0-3)
    pub isolate: u8,
    /// 处理异议 (0-3)
    pub handle: u8,
    /// 推进成交 (0-2)
    pub close: u8,
}

impl StepScores {
    /// 总分 (0-11)
    pub fn total(&self) -> u8 {
        self.acknowledge + self.isolate + self.handle + self.close
    }
}

/// 被触发的破坏融洽规则
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggeredBreaker {
    /// 规则 ID
    pub rule_id: String,
    /// 命中的原文
    pub matched_text: String,
    /// 配合度惩罚
    pub penalty: u8,
    /// 建议替代说法
    pub suggested_alternative: String,
}

/// 配合度变化的组成部分
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooperationBreakdown {
    /// round(total / 11 * 10) - 5
    pub base: i32,
    /// 破坏融洽惩罚之和（非负）
    pub rapport_penalty: i32,
    /// 魔法话术奖励
    pub magic_phrase_bonus: i32,
}

impl CooperationBreakdown {
    pub fn delta(&self) -> i32 {
        self.base - self.rapport_penalty + self.magic_phrase_bonus
    }
}

/// 评分结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// 四步得分
    pub step_scores: StepScores,
    /// 总分
    pub total: u8,
    /// 识别出的技巧 ID
    pub detected_techniques: BTreeSet<String>,
    /// 识别出的魔法话术 ID
    pub detected_magic_phrases: BTreeSet<String>,
    /// 触发的破坏融洽规则
    pub rapport_breakers_triggered: Vec<TriggeredBreaker>,
    /// 引用到的异议依据
    pub evidence_referenced: Vec<String>,
    /// 嵌入式指令（全大写词组）
    pub embedded_commands: Vec<String>,
    /// 配合度变化明细
    pub cooperation: CooperationBreakdown,
    /// 配合度变化
    pub cooperation_delta: i32,
    /// 教练反馈
    pub feedback: Vec<String>,
}

impl ScoreResult {
    /// 空发言的评分：全部为零，只保留居中的基础值
    pub fn zero() -> Self {
        let cooperation = CooperationBreakdown {
            base: base_cooperation(0),
            rapport_penalty: 0,
            magic_phrase_bonus: 0,
        };
        Self {
            step_scores: StepScores::default(),
            total: 0,
            detected_techniques: BTreeSet::new(),
            detected_magic_phrases: BTreeSet::new(),
            rapport_breakers_triggered: Vec::new(),
            evidence_referenced: Vec::new(),
            embedded_commands: Vec::new(),
            cooperation,
            cooperation_delta: cooperation.delta(),
            feedback: Vec::new(),
        }
    }

    /// 单轮满分
    pub fn max_score(&self) -> u8 {
        MAX_TURN_SCORE
    }

    pub fn has_rapport_breakers(&self) -> bool {
        !self.rapport_breakers_triggered.is_empty()
    }
}

/// 以中性为中心的基础配合度变化
pub fn base_cooperation(total: u8) -> i32 {
    (f64::from(total) / f64::from(MAX_TURN_SCORE) * 10.0).round() as i32 - 5
}
