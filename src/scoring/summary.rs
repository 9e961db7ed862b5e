//! Aggregate scores over several turns: totals, grade, per-step averages and
//! overall coaching feedback.

use serde::{Deserialize, Serialize};

use crate::models::score::{MAX_TURN_SCORE, ScoreResult};

/// Average score per CFR step
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StepAverages {
    pub acknowledge: f64,
    pub isolate: f64,
    pub handle: f64,
    pub close: f64,
}

/// Score of a whole conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationScore {
    pub turns: usize,
    pub total: u32,
    pub max: u32,
    pub percentage: f64,
    pub grade: char,
    pub averages: StepAverages,
    pub rapport_breakers: usize,
    pub techniques_used: Vec<String>,
    pub overall_feedback: Vec<String>,
}

/// Letter grade for a percentage
pub fn grade_for(percentage: f64) -> char {
    match percentage {
        p if p >= 90.0 => 'A',
        p if p >= 80.0 => 'B',
        p if p >= 70.0 => 'C',
        p if p >= 60.0 => 'D',
        _ => 'F',
    }
}

impl ConversationScore {
    pub fn from_scores<'a>(scores: impl IntoIterator<Item = &'a ScoreResult>) -> Self {
        let scores: Vec<&ScoreResult> = scores.into_iter().collect();
        let turns = scores.len();

        let total: u32 = scores.iter().map(|s| u32::from(s.total)).sum();
        let max = turns as u32 * u32::from(MAX_TURN_SCORE);
        let percentage = if max == 0 {
            0.0
        } else {
            f64::from(total) / f64::from(max) * 100.0
        };

        let averages = if turns == 0 {
            StepAverages::default()
        } else {
            let avg = |f: fn(&ScoreResult) -> u8| {
                scores.iter().map(|s| f64::from(f(s))).sum::<f64>() / turns as f64
            };
            StepAverages {
                acknowledge: avg(|s| s.step_scores.acknowledge),
                isolate: avg(|s| s.step_scores.isolate),
                handle: avg(|s| s.step_scores.handle),
                close: avg(|s| s.step_scores.close),
            }
        };

        let rapport_breakers = scores
            .iter()
            .map(|s| s.rapport_breakers_triggered.len())
            .sum();

        let mut techniques_used: Vec<String> = scores
            .iter()
            .flat_map(|s| s.detected_techniques.iter().cloned())
            .collect();
        techniques_used.sort();
        techniques_used.dedup();

        let mut score = Self {
            turns,
            total,
            max,
            percentage,
            grade: grade_for(percentage),
            averages,
            rapport_breakers,
            techniques_used,
            overall_feedback: Vec::new(),
        };
        score.overall_feedback = score.feedback();
        score
    }

    fn feedback(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.turns == 0 {
            out.push("No turns were scored".to_string());
            return out;
        }

        if self.averages.acknowledge >= 2.5 {
            out.push("✓ Strong acknowledgement: you consistently affirm the client's concern".into());
        }
        if self.averages.isolate >= 2.5 {
            out.push("✓ Excellent isolation: you find the real objection before handling it".into());
        }
        if self.averages.acknowledge < 2.0 {
            out.push("⚠️ Acknowledge first: open with 'Perfect', 'I can appreciate that', 'You're right'".into());
        }
        if self.averages.isolate < 2.0 {
            out.push("⚠️ Isolate more: ask 'Besides that, is there anything else?'".into());
        }
        if self.rapport_breakers > 0 {
            out.push(format!(
                "⚠️ {} rapport breaker{} used - avoid bare 'I understand' and 'actually'",
                self.rapport_breakers,
                if self.rapport_breakers == 1 { "" } else { "s" }
            ));
        }
        if self.techniques_used.is_empty() {
            out.push("💡 Try named techniques: Feel-Felt-Found, Level Shift, Magic Phrases".into());
        }
        out
    }
}
