//! Persona state machine
//!
//! Applies a scored turn to a session: cooperation update, turn history and
//! the Presenting → Resolved / Escalated transitions. Terminal phases are
//! absorbing.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::config::ScoringConfig;
use crate::error::{AppError, Result};
use crate::models::score::ScoreResult;
use crate::models::session::{MAX_COOPERATION, PersonaSessionState, SessionPhase, TurnRecord};

/// When a turn counts as having resolved the active objection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionPolicy {
    /// Minimum total (0-11)
    pub min_total: u8,
    /// A turn with any rapport breaker never qualifies
    pub require_no_breakers: bool,
}

impl Default for ResolutionPolicy {
    fn default() -> Self {
        Self {
            min_total: 8,
            require_no_breakers: true,
        }
    }
}

impl From<&ScoringConfig> for ResolutionPolicy {
    fn from(config: &ScoringConfig) -> Self {
        Self {
            min_total: config.resolution_min_total,
            require_no_breakers: config.require_no_breakers,
        }
    }
}

impl ResolutionPolicy {
    pub fn qualifies(&self, score: &ScoreResult) -> bool {
        score.total >= self.min_total && !(self.require_no_breakers && score.has_rapport_breakers())
    }
}

/// Outcome of one applied turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: SessionPhase,
    pub to: SessionPhase,
    pub cooperation_before: u8,
    pub cooperation_after: u8,
    /// The active objection was resolved on this turn
    pub objection_resolved: bool,
}

impl Transition {
    pub fn changed_phase(&self) -> bool {
        self.from != self.to
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PersonaStateMachine {
    policy: ResolutionPolicy,
}

impl PersonaStateMachine {
    pub fn new(policy: ResolutionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ResolutionPolicy {
        self.policy
    }

    /// Apply a scored utterance to the session.
    ///
    /// Escalation is checked before resolution: an escalation signal or a
    /// cooperation level of zero ends the session even on a qualifying turn.
    pub fn apply(
        &self,
        state: &mut PersonaSessionState,
        utterance: &str,
        score: ScoreResult,
        escalation_signal: bool,
    ) -> Result<Transition> {
        let from = state.phase;
        let index = match from {
            SessionPhase::Presenting { objection_index } => objection_index,
            terminal => {
                return Err(AppError::StateInvariantViolation(format!(
                    "session {} is already {:?}",
                    state.id, terminal
                )));
            }
        };

        let cooperation_before = state.cooperation_level;
        let cooperation_after = (i32::from(cooperation_before) + score.cooperation_delta)
            .clamp(0, i32::from(MAX_COOPERATION)) as u8;
        let qualifies = self.policy.qualifies(&score);

        state.cooperation_level = cooperation_after;
        state.turn_count += 1;
        state.history.push(TurnRecord {
            utterance: utterance.to_string(),
            score,
            recorded_at: Utc::now(),
        });
        state.touch();

        let mut objection_resolved = false;
        let to = if escalation_signal || cooperation_after == 0 {
            warn!(
                session_id = %state.id,
                persona = %state.persona.id,
                signal = escalation_signal,
                cooperation = cooperation_after,
                "Session escalated"
            );
            SessionPhase::Escalated
        } else if qualifies {
            objection_resolved = true;
            state.objections_resolved += 1;
            if index + 1 >= state.objection_count() {
                info!(session_id = %state.id, turns = state.turn_count, "All objections resolved");
                SessionPhase::Resolved
            } else {
                debug!(session_id = %state.id, next = index + 1, "Objection resolved");
                SessionPhase::Presenting {
                    objection_index: index + 1,
                }
            }
        } else {
            from
        };
        state.phase = to;

        Ok(Transition {
            from,
            to,
            cooperation_before,
            cooperation_after,
            objection_resolved,
        })
    }

    /// Escalation signal for a turn: the caller's explicit flag, or a hand-off
    /// topic in either side's message
    pub fn escalation_signal(
        state: &PersonaSessionState,
        utterance: &str,
        client_message: Option<&str>,
        explicit: bool,
    ) -> bool {
        let rules = &state.persona.escalation_rules;
        explicit
            || rules.is_triggered(utterance)
            || client_message.is_some_and(|m| rules.is_triggered(m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::persona::fixtures;
    use crate::models::session::{Difficulty, TrainingMode};
    use crate::models::score::{StepScores, TriggeredBreaker};
    use std::sync::Arc;

    fn state() -> PersonaSessionState {
        PersonaSessionState::new(
            Arc::new(fixtures::investor()),
            Difficulty::Medium,
            TrainingMode::Scoring,
        )
    }

    fn score(total: u8, delta: i32) -> ScoreResult {
        let mut s = ScoreResult::zero();
        s.step_scores = StepScores {
            acknowledge: total.min(3),
            isolate: total.saturating_sub(3).min(3),
            handle: total.saturating_sub(6).min(3),
            close: total.saturating_sub(9).min(2),
        };
        s.total = s.step_scores.total();
        s.cooperation_delta = delta;
        s
    }

    #[test]
    fn test_qualifying_turn_advances() {
        let machine = PersonaStateMachine::default();
        let mut state = state();
        let t = machine.apply(&mut state, "good turn", score(9, 3), false).unwrap();
        assert_eq!(t.to, SessionPhase::Presenting { objection_index: 1 });
        assert!(t.objection_resolved);
        assert_eq!(state.cooperation_level, 8);
        assert_eq!(state.turn_count, 1);
        assert_eq!(state.objections_resolved, 1);
        assert_eq!(state.history.len(), 1);
    }

    #[test]
    fn test_last_objection_resolves_session() {
        let machine = PersonaStateMachine::default();
        let mut state = state();
        machine.apply(&mut state, "one", score(9, 1), false).unwrap();
        let t = machine.apply(&mut state, "two", score(10, 1), false).unwrap();
        assert_eq!(t.to, SessionPhase::Resolved);
        assert!(state.is_terminal());
    }

    #[test]
    fn test_non_qualifying_turn_stays() {
        let machine = PersonaStateMachine::default();
        let mut state = state();
        let t = machine.apply(&mut state, "weak", score(7, 0), false).unwrap();
        assert!(!t.changed_phase());
        assert_eq!(state.phase, SessionPhase::Presenting { objection_index: 0 });
    }

    #[test]
    fn test_breaker_blocks_resolution() {
        let machine = PersonaStateMachine::default();
        let mut state = state();
        let mut s = score(11, 3);
        s.rapport_breakers_triggered.push(TriggeredBreaker {
            rule_id: "actually".into(),
            matched_text: "actually".into(),
            penalty: 2,
            suggested_alternative: "drop it".into(),
        });
        let t = machine.apply(&mut state, "actually great", s, false).unwrap();
        assert!(!t.objection_resolved);
    }

    #[test]
    fn test_cooperation_clamped_and_zero_escalates() {
        let machine = PersonaStateMachine::default();
        let mut state = state();
        state.cooperation_level = 9;
        machine.apply(&mut state, "x", score(7, 5), false).unwrap();
        assert_eq!(state.cooperation_level, 10);

        let t = machine.apply(&mut state, "y", score(0, -20), false).unwrap();
        assert_eq!(state.cooperation_level, 0);
        assert_eq!(t.to, SessionPhase::Escalated);
    }

    #[test]
    fn test_escalation_beats_resolution() {
        let machine = PersonaStateMachine::default();
        let mut state = state();
        let t = machine.apply(&mut state, "great", score(11, 5), true).unwrap();
        assert_eq!(t.to, SessionPhase::Escalated);
        assert!(!t.objection_resolved);
        assert_eq!(state.objections_resolved, 0);
    }

    #[test]
    fn test_terminal_is_absorbing() {
        let machine = PersonaStateMachine::default();
        let mut state = state();
        state.phase = SessionPhase::Resolved;
        let err = machine.apply(&mut state, "more", score(11, 5), false).unwrap_err();
        assert!(matches!(err, AppError::StateInvariantViolation(_)));
        assert_eq!(state.turn_count, 0);
        assert!(state.history.is_empty());
    }

    #[test]
    fn test_escalation_signal_sources() {
        let state = state();
        assert!(PersonaStateMachine::escalation_signal(&state, "hi", None, true));
        assert!(PersonaStateMachine::escalation_signal(
            &state,
            "Let's talk about a 1031 Exchange",
            None,
            false
        ));
        assert!(PersonaStateMachine::escalation_signal(
            &state,
            "sure",
            Some("What's the TAX STRATEGY here?"),
            false
        ));
        assert!(!PersonaStateMachine::escalation_signal(&state, "sure", Some("ok"), false));
    }
}
