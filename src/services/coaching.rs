//! Coaching output for roleplay sessions: practice-mode technique hints and
//! the end-of-session summary.

use serde::{Deserialize, Serialize};

use crate::models::score::ScoreResult;
use crate::models::session::{PersonaSessionState, SessionPhase, TrainingMode};
use crate::scoring::ConversationScore;

/// Hints for the weak steps of one turn
pub fn suggested_techniques(score: &ScoreResult) -> Vec<String> {
    let steps = &score.step_scores;
    let mut hints = Vec::new();
    if steps.acknowledge < 2 {
        hints.push(
            "Acknowledge: 'Perfect! You're right to focus on that' or 'I can appreciate that'"
                .to_string(),
        );
    }
    if steps.isolate < 2 {
        hints.push(
            "Isolate: 'Besides that, is there any other reason you wouldn't move forward?'"
                .to_string(),
        );
    }
    if steps.handle < 2 {
        hints.push(
            "Handle: Feel-Felt-Found - 'I know how you feel, others felt the same, what they found was...'"
                .to_string(),
        );
    }
    if steps.close == 0 {
        hints.push("Close: 'Does that make sense?' or 'Which works better, Tuesday or Thursday?'".to_string());
    }
    hints
}

/// What a turn response reveals in each training mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnDisclosure {
    /// Score and its feedback lines
    pub score: bool,
    /// Technique hints for weak steps
    pub suggestions: bool,
}

impl From<TrainingMode> for TurnDisclosure {
    fn from(mode: TrainingMode) -> Self {
        match mode {
            TrainingMode::Practice => Self {
                score: true,
                suggestions: true,
            },
            TrainingMode::Scoring => Self {
                score: true,
                suggestions: false,
            },
            TrainingMode::Challenge => Self {
                score: false,
                suggestions: false,
            },
        }
    }
}

/// End-of-session summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub persona_id: String,
    pub phase: SessionPhase,
    pub turns: u32,
    pub final_cooperation: u8,
    pub objections_resolved: usize,
    pub objections_total: usize,
    pub score: ConversationScore,
}

impl SessionSummary {
    pub fn from_state(state: &PersonaSessionState) -> Self {
        Self {
            session_id: state.id.clone(),
            persona_id: state.persona.id.clone(),
            phase: state.phase,
            turns: state.turn_count,
            final_cooperation: state.cooperation_level,
            objections_resolved: state.objections_resolved,
            objections_total: state.objection_count(),
            score: ConversationScore::from_scores(state.history.iter().map(|t| &t.score)),
        }
    }
}
