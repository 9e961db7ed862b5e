use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::persona::{ObjectionPattern, Persona};
use crate::models::score::ScoreResult;

/// 配合度上限
pub const MAX_COOPERATION: u8 = 10;

/// 会话阶段
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionPhase {
    /// 正在提出第 objection_index 个异议
    Presenting { objection_index: usize },
    /// 全部异议已化解
    Resolved,
    /// 已转交或客户失去耐心
    Escalated,
}

impl SessionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Resolved | SessionPhase::Escalated)
    }
}

/// 难度，决定本次会话使用的异议数量
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    /// 前两个异议
    Beginner,
    /// 前四个异议
    #[default]
    Medium,
    /// 全部异议
    Advanced,
}

impl Difficulty {
    /// 在给定异议总数下本次会话的异议数量
    pub fn objection_limit(&self, available: usize) -> usize {
        match self {
            Difficulty::Beginner => available.min(2),
            Difficulty::Medium => available.min(4),
            Difficulty::Advanced => available,
        }
    }
}

/// 训练模式，决定每轮返回多少评分信息
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrainingMode {
    /// 每轮详细辅导
    Practice,
    /// 每轮实时评分
    #[default]
    Scoring,
    /// 结束前不给反馈
    Challenge,
}

/// 一轮对话记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRecord {
    /// 销售方发言
    pub utterance: String,
    /// 评分
    pub score: ScoreResult,
    /// 记录时间
    pub recorded_at: DateTime<Utc>,
}

/// 人设会话状态
///
/// 每个进行中的角色扮演一份。只通过状态机修改。
#[derive(Debug, Clone)]
pub struct PersonaSessionState {
    /// 会话唯一标识
    pub id: String,

    /// 人设（只读）
    pub persona: Arc<Persona>,

    /// 难度
    pub difficulty: Difficulty,

    /// 训练模式
    pub mode: TrainingMode,

    /// 当前阶段
    pub phase: SessionPhase,

    /// 配合度 (0-10)
    pub cooperation_level: u8,

    /// 已评分轮次
    pub turn_count: u32,

    /// 已化解的异议数量
    pub objections_resolved: usize,

    /// 历史记录
    pub history: Vec<TurnRecord>,

    /// 创建时间
    pub created_at: DateTime<Utc>,

    /// 最后活跃时间
    pub last_active_at: DateTime<Utc>,
}

impl PersonaSessionState {
    /// 创建新会话，配合度从人设基线开始
    pub fn new(persona: Arc<Persona>, difficulty: Difficulty, mode: TrainingMode) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            cooperation_level: persona.baseline_cooperation.min(MAX_COOPERATION),
            persona,
            difficulty,
            mode,
            phase: SessionPhase::Presenting { objection_index: 0 },
            turn_count: 0,
            objections_resolved: 0,
            history: Vec::new(),
            created_at: now,
            last_active_at: now,
        }
    }

    /// 本次会话的异议数量
    pub fn objection_count(&self) -> usize {
        self.difficulty
            .objection_limit(self.persona.objection_patterns.len())
    }

    /// 本次会话的异议队列
    pub fn objection_queue(&self) -> &[ObjectionPattern] {
        &self.persona.objection_patterns[..self.objection_count()]
    }

    /// 当前异议序号，终止状态为 None
    pub fn active_objection_index(&self) -> Option<usize> {
        match self.phase {
            SessionPhase::Presenting { objection_index } => Some(objection_index),
            _ => None,
        }
    }

    /// 当前异议
    pub fn active_objection(&self) -> Option<&ObjectionPattern> {
        self.active_objection_index()
            .and_then(|i| self.objection_queue().get(i))
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// 更新最后活跃时间
    pub fn touch(&mut self) {
        self.last_active_at = Utc::now();
    }
}

/// 会话快照（对外展示）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: String,
    pub persona_id: String,
    pub persona_label: String,
    pub difficulty: Difficulty,
    pub mode: TrainingMode,
    pub phase: SessionPhase,
    pub cooperation_level: u8,
    pub turn_count: u32,
    pub objections_resolved: usize,
    pub objection_count: usize,
    /// 当前异议 ID
    pub active_objection: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

impl From<&PersonaSessionState> for SessionSnapshot {
    fn from(state: &PersonaSessionState) -> Self {
        Self {
            id: state.id.clone(),
            persona_id: state.persona.id.clone(),
            persona_label: state.persona.label.clone(),
            difficulty: state.difficulty,
            mode: state.mode,
            phase: state.phase,
            cooperation_level: state.cooperation_level,
            turn_count: state.turn_count,
            objections_resolved: state.objections_resolved,
            objection_count: state.objection_count(),
            active_objection: state.active_objection().map(|o| o.id.clone()),
            created_at: state.created_at,
            last_active_at: state.last_active_at,
        }
    }
}
