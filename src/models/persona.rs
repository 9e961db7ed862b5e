//! 人设数据模型
//!
//! 客户人设及其异议模式。人设从 JSON 文件加载，加载时做严格校验，
//! 缺失或未知字段都视为配置错误。

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::error::{AppError, Result};

/// 异议模式
///
/// 人设在对话中可能提出的一个具体顾虑，以及处理它的预期剧本。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectionPattern {
    /// 异议唯一标识
    pub id: String,
    /// 异议名称
    pub name: String,
    /// 客户提出该异议时的典型说法
    pub trigger_phrases: Vec<String>,
    /// 提出异议时的情绪
    pub emotion: String,
    /// 处理步骤
    pub response_playbook: Vec<String>,
    /// 可用于化解异议的事实依据
    pub evidence: Vec<String>,
    /// 推荐的魔法话术 ID
    pub magic_phrases: Vec<String>,
}

impl ObjectionPattern {
    /// 检查文本中是否出现了任一触发说法（不区分大小写）
    pub fn is_triggered_by(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.trigger_phrases
            .iter()
            .any(|phrase| !phrase.trim().is_empty() && lower.contains(&phrase.to_lowercase()))
    }
}

/// 语气属性
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Tone {
    /// 正式程度
    pub formality: String,
    /// 精力水平
    pub energy: String,
    /// 语速（每分钟词数）
    pub pace_wpm: u32,
    /// 直接程度
    pub directness: String,
}

/// 人设所处情境
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersonaContext {
    /// 市场
    pub market: String,
    /// 预算
    pub budget: String,
    /// 时间线
    pub timeline: String,
}

/// 升级规则
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EscalationRules {
    /// 出现这些话题时转交
    pub handoff_if: Vec<String>,
    /// 转交对象
    pub handoff_target: String,
}

impl EscalationRules {
    /// 检查文本是否触发转交（不区分大小写的包含匹配）
    pub fn is_triggered(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.handoff_if
            .iter()
            .any(|topic| !topic.trim().is_empty() && lower.contains(&topic.to_lowercase()))
    }
}

/// 客户人设
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Persona {
    /// 人设唯一标识
    pub id: String,
    /// 展示名称
    pub label: String,
    /// 语气
    pub tone: Tone,
    /// 性格特征
    pub persona_traits: Vec<String>,
    /// 情境（市场、预算、时间线）
    pub context: PersonaContext,
    /// 目标
    pub goals: Vec<String>,
    /// 异议模式（按提出顺序）
    pub objection_patterns: Vec<ObjectionPattern>,
    /// 人设掌握的知识
    pub knowledge_snippets: Vec<String>,
    /// 升级规则
    pub escalation_rules: EscalationRules,
    /// 会话开始时的配合度 (1-10)
    pub baseline_cooperation: u8,
}

impl Persona {
    /// 从 JSON 字符串解析并校验
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let persona: Persona = serde_json::from_str(raw)
            .map_err(|e| AppError::Configuration(format!("invalid persona: {}", e)))?;
        persona.validate()?;
        Ok(persona)
    }

    /// 从文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Configuration(format!("cannot read persona {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&raw).map_err(|e| match e {
            AppError::Configuration(msg) => {
                AppError::Configuration(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// 结构之外的语义校验
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(AppError::Configuration("persona id is empty".into()));
        }
        if self.label.trim().is_empty() {
            return Err(AppError::Configuration(format!(
                "persona '{}' has an empty label",
                self.id
            )));
        }
        if self.objection_patterns.is_empty() {
            return Err(AppError::Configuration(format!(
                "persona '{}' has no objection patterns",
                self.id
            )));
        }
        // 0 is the escalation level, a session cannot start there
        if !(1..=10).contains(&self.baseline_cooperation) {
            return Err(AppError::Configuration(format!(
                "persona '{}' baseline_cooperation {} is outside 1..=10",
                self.id, self.baseline_cooperation
            )));
        }
        if self.tone.pace_wpm == 0 {
            return Err(AppError::Configuration(format!(
                "persona '{}' pace_wpm must be positive",
                self.id
            )));
        }

        let mut seen = HashSet::new();
        for objection in &self.objection_patterns {
            if objection.id.trim().is_empty() {
                return Err(AppError::Configuration(format!(
                    "persona '{}' has an objection with an empty id",
                    self.id
                )));
            }
            if !seen.insert(objection.id.as_str()) {
                return Err(AppError::Configuration(format!(
                    "persona '{}' repeats objection id '{}'",
                    self.id, objection.id
                )));
            }
            if objection.trigger_phrases.iter().all(|p| p.trim().is_empty()) {
                return Err(AppError::Configuration(format!(
                    "objection '{}' of persona '{}' has no trigger phrases",
                    objection.id, self.id
                )));
            }
        }

        Ok(())
    }

    /// 根据 ID 查找异议
    pub fn objection(&self, objection_id: &str) -> Option<&ObjectionPattern> {
        self.objection_patterns.iter().find(|o| o.id == objection_id)
    }

    /// 找到第一个被客户发言触发的异议
    pub fn match_objection(&self, client_text: &str) -> Option<&ObjectionPattern> {
        self.objection_patterns
            .iter()
            .find(|o| o.is_triggered_by(client_text))
    }

    /// 某个异议推荐的魔法话术
    pub fn suggested_magic_phrases(&self, objection_id: &str) -> &[String] {
        self.objection(objection_id)
            .map(|o| o.magic_phrases.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn objection(id: &str, triggers: &[&str], evidence: &[&str]) -> ObjectionPattern {
        ObjectionPattern {
            id: id.to_string(),
            name: id.replace('_', " "),
            trigger_phrases: triggers.iter().map(|s| s.to_string()).collect(),
            emotion: "skeptical".into(),
            response_playbook: vec!["Acknowledge".into(), "Isolate".into()],
            evidence: evidence.iter().map(|s| s.to_string()).collect(),
            magic_phrases: vec![],
        }
    }

    pub fn persona_with(objections: Vec<ObjectionPattern>) -> Persona {
        Persona {
            id: "investor".into(),
            label: "Investor".into(),
            tone: Tone {
                formality: "business casual".into(),
                energy: "measured".into(),
                pace_wpm: 160,
                directness: "high".into(),
            },
            persona_traits: vec!["analytical".into()],
            context: PersonaContext {
                market: "Phoenix metro".into(),
                budget: "$450k".into(),
                timeline: "90 days".into(),
            },
            goals: vec!["Positive cash flow".into()],
            objection_patterns: objections,
            knowledge_snippets: vec!["Knows local rents".into()],
            escalation_rules: EscalationRules {
                handoff_if: vec!["1031 exchange".into(), "tax strategy".into()],
                handoff_target: "our investment specialist".into(),
            },
            baseline_cooperation: 5,
        }
    }

    pub fn investor() -> Persona {
        persona_with(vec![
            objection(
                "cap_rate_too_low",
                &["The cap rate is too low", "numbers don't work"],
                &["Rents in the area grew 6% last year"],
            ),
            objection("hoa_fees", &["HOA fees are too high"], &["HOA covers exterior maintenance"]),
        ])
    }
}
