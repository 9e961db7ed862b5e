//! Conversation scorer
//!
//! Scores a single agent utterance against the CFR framework
//! (Acknowledge, Isolate, Handle, Close), detects catalog techniques and
//! magic phrases, flags rapport breakers, and derives the cooperation delta
//! the persona state machine applies afterwards.
//!
//! The scorer holds no mutable state: the same utterance, session snapshot
//! and catalog always produce the same [`ScoreResult`].

pub mod keywords;
pub mod rules;
pub mod summary;

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::config::config::ScoringConfig;
use crate::error::{AppError, Result};
use crate::models::persona::ObjectionPattern;
use crate::models::score::{
    CooperationBreakdown, MAX_HANDLE, ScoreResult, StepScores, TriggeredBreaker,
    base_cooperation,
};
use crate::models::session::PersonaSessionState;

pub use summary::{ConversationScore, StepAverages, grade_for};

/// Scoring knobs that are not part of the rule tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringPolicy {
    /// Added to the cooperation delta when any magic phrase matched
    pub magic_phrase_bonus: i32,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            magic_phrase_bonus: 1,
        }
    }
}

impl From<&ScoringConfig> for ScoringPolicy {
    fn from(config: &ScoringConfig) -> Self {
        Self {
            magic_phrase_bonus: config.magic_phrase_bonus,
        }
    }
}

/// CFR conversation scorer
#[derive(Debug, Clone)]
pub struct ConversationScorer {
    catalog: Arc<Catalog>,
    policy: ScoringPolicy,
}

impl ConversationScorer {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self::with_policy(catalog, ScoringPolicy::default())
    }

    pub fn with_policy(catalog: Arc<Catalog>, policy: ScoringPolicy) -> Self {
        Self { catalog, policy }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Score an utterance against the session's active objection.
    ///
    /// Fails with [`AppError::StateInvariantViolation`] once the session has
    /// reached a terminal phase.
    pub fn score(&self, utterance: &str, state: &PersonaSessionState) -> Result<ScoreResult> {
        if state.is_terminal() {
            return Err(AppError::StateInvariantViolation(format!(
                "session {} is {:?}; no further turns can be scored",
                state.id, state.phase
            )));
        }
        Ok(self.score_utterance(utterance, state.active_objection()))
    }

    /// Score an utterance with an optional objection as context
    pub fn score_utterance(
        &self,
        utterance: &str,
        objection: Option<&ObjectionPattern>,
    ) -> ScoreResult {
        if utterance.trim().is_empty() {
            return ScoreResult::zero();
        }

        let text = keywords::normalize(utterance);
        let utterance_tokens = keywords::tokens(utterance);
        let mut feedback = Vec::new();

        let acknowledge = score_acknowledge(&text, &utterance_tokens, objection, &mut feedback);
        let isolate = score_isolate(&text, &mut feedback);

        let matches = self.catalog.find_matches(&text);
        let evidence_referenced = objection
            .map(|o| referenced_evidence(o, &utterance_tokens))
            .unwrap_or_default();
        let embedded_commands = rules::embedded_commands(utterance);
        let handle = self.score_handle(
            &matches.techniques,
            &evidence_referenced,
            &embedded_commands,
            &mut feedback,
        );

        let close = score_close(&text, &mut feedback);

        let rapport_breakers_triggered: Vec<TriggeredBreaker> = self
            .catalog
            .rapport_breakers()
            .iter()
            .filter_map(|rule| {
                rule.find(&text).map(|matched_text| TriggeredBreaker {
                    rule_id: rule.id.clone(),
                    matched_text,
                    penalty: rule.penalty,
                    suggested_alternative: rule.suggested_alternative.clone(),
                })
            })
            .collect();
        for breaker in &rapport_breakers_triggered {
            feedback.push(format!(
                "⚠️ Rapport breaker '{}': try \"{}\"",
                breaker.matched_text, breaker.suggested_alternative
            ));
        }

        let step_scores = StepScores {
            acknowledge,
            isolate,
            handle,
            close,
        };
        let total = step_scores.total();

        let cooperation = CooperationBreakdown {
            base: base_cooperation(total),
            rapport_penalty: rapport_breakers_triggered
                .iter()
                .map(|b| i32::from(b.penalty))
                .sum(),
            magic_phrase_bonus: if matches.magic_phrases.is_empty() {
                0
            } else {
                self.policy.magic_phrase_bonus
            },
        };

        ScoreResult {
            step_scores,
            total,
            detected_techniques: matches.techniques,
            detected_magic_phrases: matches.magic_phrases,
            rapport_breakers_triggered,
            evidence_referenced,
            embedded_commands,
            cooperation,
            cooperation_delta: cooperation.delta(),
            feedback,
        }
    }

    fn score_handle(
        &self,
        techniques: &BTreeSet<String>,
        evidence: &[String],
        embedded: &[String],
        feedback: &mut Vec<String>,
    ) -> u8 {
        let mut points: u32 = 0;

        for id in techniques {
            if let Some(technique) = self.catalog.technique(id) {
                points += u32::from(technique.point_value);
                feedback.push(format!("✓ Used {} technique", technique.name));
            }
        }

        if !evidence.is_empty() {
            points += evidence.len() as u32;
            feedback.push(format!(
                "✓ Addressed the objection with evidence ({} point{})",
                evidence.len(),
                if evidence.len() == 1 { "" } else { "s" }
            ));
        }

        if let Some(command) = embedded.first() {
            points += 1;
            feedback.push(format!("✓ Used embedded command: {}", command));
        }

        if points == 0 {
            feedback.push(
                "⚠️ Handle the objection - reference the facts or use Feel-Felt-Found".to_string(),
            );
        }

        points.min(u32::from(MAX_HANDLE)) as u8
    }
}

fn score_acknowledge(
    text: &str,
    utterance_tokens: &BTreeSet<String>,
    objection: Option<&ObjectionPattern>,
    feedback: &mut Vec<String>,
) -> u8 {
    let Some(rule) = rules::strongest(&rules::ACKNOWLEDGE_RULES, text) else {
        feedback.push(
            "⚠️ Missing acknowledgement - start with 'Perfect', 'I can appreciate that', etc."
                .to_string(),
        );
        return 0;
    };

    let on_topic = objection
        .map(|o| concern_keywords(o).iter().any(|k| utterance_tokens.contains(k)))
        .unwrap_or(false);

    if on_topic {
        feedback.push(format!(
            "✓ Acknowledged the client's specific concern with '{}'",
            rule.phrase
        ));
        rule.weight + 1
    } else {
        feedback.push(format!("✓ Acknowledged with '{}'", rule.phrase));
        rule.weight
    }
}

fn score_isolate(text: &str, feedback: &mut Vec<String>) -> u8 {
    let matched: Vec<_> = rules::ISOLATION_RULES
        .iter()
        .filter(|r| r.is_match(text))
        .collect();

    if matched.is_empty() {
        feedback.push(
            "⚠️ Missing isolation - ask 'Besides that, is there any other reason you wouldn't...?'"
                .to_string(),
        );
        return 0;
    }

    let asked: Vec<_> = matched.iter().filter(|r| r.is_asked(text)).collect();
    if asked.is_empty() {
        feedback.push(format!(
            "⚠️ Isolation attempt ('{}') without a question - ask it",
            matched[0].phrase
        ));
        return 1;
    }

    if asked.iter().any(|r| r.open) {
        feedback.push("✓ Excellent isolation: open 'anything else' question".to_string());
        3
    } else {
        feedback.push("✓ Good isolation: clarifying question".to_string());
        2
    }
}

fn score_close(text: &str, feedback: &mut Vec<String>) -> u8 {
    match rules::strongest(&rules::CLOSE_RULES, text) {
        Some(rule) if rule.weight >= 2 => {
            feedback.push(format!("✓ Strong close: '{}'", rule.phrase));
            rule.weight
        }
        Some(rule) => {
            feedback.push(format!("✓ Soft check-in: '{}'", rule.phrase));
            rule.weight
        }
        None => {
            feedback.push(
                "⚠️ Missing close - try 'Does that make sense?', 'Which works better for you?'"
                    .to_string(),
            );
            0
        }
    }
}

/// Keywords that identify the client's concern for this objection
pub fn concern_keywords(objection: &ObjectionPattern) -> BTreeSet<String> {
    let mut kws = keywords::keywords(&objection.name);
    for phrase in &objection.trigger_phrases {
        kws.extend(keywords::keywords(phrase));
    }
    kws
}

/// Evidence items the utterance refers to: at least two of an item's
/// keywords, or its only keyword
pub fn referenced_evidence(
    objection: &ObjectionPattern,
    utterance_tokens: &BTreeSet<String>,
) -> Vec<String> {
    objection
        .evidence
        .iter()
        .filter(|item| {
            let kws = keywords::keywords(item);
            let needed = kws.len().min(2);
            needed > 0 && kws.iter().filter(|k| utterance_tokens.contains(*k)).count() >= needed
        })
        .cloned()
        .collect()
}
