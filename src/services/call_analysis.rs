//! Call analysis
//!
//! Scores the agent side of an already transcribed call with the same
//! scorer used for roleplay, and turns the per-turn scores into a coaching
//! report with timestamped feedback and missed opportunities.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::config::AnalysisConfig;
use crate::error::{AppError, Result};
use crate::models::persona::Persona;
use crate::models::score::{MAX_TURN_SCORE, ScoreResult};
use crate::models::transcript::{CallTranscript, Speaker};
use crate::scoring::{ConversationScorer, grade_for};

const STRONG_TURN_TOTAL: u8 = 9;
const CONSISTENT_TURN_TOTAL: u8 = 8;
const CONTEXT_PREVIEW_CHARS: usize = 50;
const MAX_TECHNIQUE_RECOMMENDATIONS: usize = 3;

/// Label speakers in place: the first segment is the agent only if it
/// contains an agent keyword; later segments are the agent on a keyword and
/// otherwise alternate with the previous speaker.
pub fn label_speakers(transcript: &mut CallTranscript, agent_keywords: &[String]) {
    let keywords: Vec<String> = agent_keywords.iter().map(|k| k.to_lowercase()).collect();
    let mut previous: Option<Speaker> = None;

    for segment in &mut transcript.segments {
        let text = segment.text.to_lowercase();
        let is_agent = keywords.iter().any(|k| !k.is_empty() && text.contains(k.as_str()));
        let speaker = match previous {
            _ if is_agent => Speaker::Agent,
            None => Speaker::Client,
            Some(Speaker::Agent) => Speaker::Client,
            Some(Speaker::Client) => Speaker::Agent,
        };
        segment.speaker = Some(speaker);
        previous = Some(speaker);
    }
}

/// An agent utterance with the client message it answers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallTurn {
    pub timestamp: f64,
    pub agent_text: String,
    pub client_text: Option<String>,
}

/// Pair each agent segment with the latest client segment that started
/// strictly before it
pub fn pair_turns(transcript: &CallTranscript) -> Vec<CallTurn> {
    let client_turns = transcript.client_turns();
    transcript
        .agent_turns()
        .into_iter()
        .map(|(agent_text, agent_start)| CallTurn {
            timestamp: agent_start,
            agent_text: agent_text.to_string(),
            client_text: client_turns
                .iter()
                .take_while(|(_, start)| *start < agent_start)
                .last()
                .map(|(text, _)| text.to_string()),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    Strength,
    Improvement,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimestampedFeedback {
    pub timestamp: f64,
    pub turn_number: usize,
    pub kind: FeedbackKind,
    pub message: String,
    pub suggested_technique: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissedOpportunity {
    pub timestamp: f64,
    pub context: String,
    pub suggestion: String,
    pub example: String,
}

/// One scored agent turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnAnalysis {
    pub turn_number: usize,
    #[serde(flatten)]
    pub turn: CallTurn,
    pub objection_id: Option<String>,
    pub score: ScoreResult,
}

/// Coaching report for a call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallAnalysisReport {
    pub turns: Vec<TurnAnalysis>,
    pub overall_score: u32,
    pub max_score: u32,
    pub percentage: f64,
    pub grade: char,
    pub timestamped_feedback: Vec<TimestampedFeedback>,
    pub key_wins: Vec<String>,
    pub improvement_areas: Vec<String>,
    pub technique_recommendations: Vec<String>,
    pub missed_opportunities: Vec<MissedOpportunity>,
}

impl fmt::Display for CallAnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(70);
        writeln!(f, "{}", rule)?;
        writeln!(f, " CALL COACHING REPORT")?;
        writeln!(f, "{}", rule)?;
        writeln!(
            f,
            "\nOverall Score: {}/{} ({:.1}%) - Grade: {}",
            self.overall_score, self.max_score, self.percentage, self.grade
        )?;

        let sections = [
            ("✓ KEY WINS", &self.key_wins),
            ("⚠️ AREAS FOR IMPROVEMENT", &self.improvement_areas),
            ("💡 TECHNIQUE RECOMMENDATIONS", &self.technique_recommendations),
        ];
        for (title, items) in sections {
            if items.is_empty() {
                continue;
            }
            writeln!(f, "\n{}:", title)?;
            for item in items {
                writeln!(f, "  • {}", item)?;
            }
        }

        if !self.missed_opportunities.is_empty() {
            writeln!(f, "\n🎯 MISSED OPPORTUNITIES:")?;
            for opp in &self.missed_opportunities {
                writeln!(f, "\n  [{:.1}s] {}", opp.timestamp, opp.context)?;
                writeln!(f, "    → Suggested: {}", opp.suggestion)?;
                writeln!(f, "    → Example: {}", opp.example)?;
            }
        }

        write!(f, "\n{}", rule)
    }
}

pub struct CallAnalyzer {
    scorer: ConversationScorer,
    config: AnalysisConfig,
}

impl CallAnalyzer {
    pub fn new(scorer: ConversationScorer, config: AnalysisConfig) -> Self {
        Self { scorer, config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Label speakers with the configured agent keywords
    pub fn label_speakers(&self, transcript: &mut CallTranscript) {
        label_speakers(transcript, &self.config.agent_keywords);
    }

    /// Score every agent turn of a labelled transcript.
    ///
    /// With a persona, each turn is scored against the first objection the
    /// preceding client message triggers.
    pub fn analyze(
        &self,
        transcript: &CallTranscript,
        persona: Option<&Persona>,
    ) -> Result<CallAnalysisReport> {
        if !transcript.is_labelled() {
            return Err(AppError::Validation(
                "transcript has segments without a speaker label".to_string(),
            ));
        }

        let turns: Vec<TurnAnalysis> = pair_turns(transcript)
            .into_iter()
            .enumerate()
            .map(|(i, turn)| {
                let objection = match (persona, turn.client_text.as_deref()) {
                    (Some(p), Some(client)) => p.match_objection(client),
                    _ => None,
                };
                let score = self.scorer.score_utterance(&turn.agent_text, objection);
                debug!(turn = i + 1, total = score.total, "Scored call turn");
                TurnAnalysis {
                    turn_number: i + 1,
                    objection_id: objection.map(|o| o.id.clone()),
                    turn,
                    score,
                }
            })
            .collect();

        let overall_score: u32 = turns.iter().map(|t| u32::from(t.score.total)).sum();
        let max_score = turns.len() as u32 * u32::from(MAX_TURN_SCORE);
        let percentage = if max_score == 0 {
            0.0
        } else {
            f64::from(overall_score) / f64::from(max_score) * 100.0
        };

        let mut missed_opportunities = missed_opportunities(&turns);
        missed_opportunities.truncate(self.config.max_missed_opportunities);

        let report = CallAnalysisReport {
            timestamped_feedback: timestamped_feedback(&turns),
            key_wins: key_wins(&turns, &self.scorer),
            improvement_areas: improvement_areas(&turns),
            technique_recommendations: self.technique_recommendations(&turns),
            missed_opportunities,
            overall_score,
            max_score,
            percentage,
            grade: grade_for(percentage),
            turns,
        };

        info!(
            turns = report.turns.len(),
            score = report.overall_score,
            max = report.max_score,
            grade = %report.grade,
            "Call analysis complete"
        );
        Ok(report)
    }

    fn technique_recommendations(&self, turns: &[TurnAnalysis]) -> Vec<String> {
        let used = techniques_used(turns);
        let mut out: Vec<String> = self
            .scorer
            .catalog()
            .techniques()
            .iter()
            .filter(|t| !used.contains(&t.id))
            .take(MAX_TECHNIQUE_RECOMMENDATIONS)
            .map(|t| format!("Try {} on your next call", t.name))
            .collect();

        let low_isolation = turns.iter().filter(|t| t.score.step_scores.isolate < 2).count();
        if low_isolation * 2 > turns.len() {
            out.push(
                "Practice isolation: 'Besides X, is there any other reason you wouldn't Y?'"
                    .to_string(),
            );
        }
        out
    }
}

fn techniques_used(turns: &[TurnAnalysis]) -> BTreeSet<String> {
    turns
        .iter()
        .flat_map(|t| t.score.detected_techniques.iter().cloned())
        .collect()
}

fn average(turns: &[TurnAnalysis], step: fn(&ScoreResult) -> u8) -> f64 {
    if turns.is_empty() {
        return 0.0;
    }
    turns.iter().map(|t| f64::from(step(&t.score))).sum::<f64>() / turns.len() as f64
}

fn timestamped_feedback(turns: &[TurnAnalysis]) -> Vec<TimestampedFeedback> {
    let mut out = Vec::new();
    for t in turns {
        let at = |kind, message: String, suggested_technique: Option<String>| TimestampedFeedback {
            timestamp: t.turn.timestamp,
            turn_number: t.turn_number,
            kind,
            message,
            suggested_technique,
        };

        for breaker in &t.score.rapport_breakers_triggered {
            out.push(at(
                FeedbackKind::Critical,
                format!("Rapport breaker: '{}'", breaker.matched_text),
                Some(breaker.suggested_alternative.clone()),
            ));
        }
        if t.score.step_scores.isolate < 2 {
            out.push(at(
                FeedbackKind::Improvement,
                "Client raised a concern but you didn't isolate it".to_string(),
                Some("Ask: 'Besides that, is there any other reason you wouldn't...?'".to_string()),
            ));
        }
        if t.score.total >= STRONG_TURN_TOTAL {
            out.push(at(
                FeedbackKind::Strength,
                format!(
                    "Excellent CFR technique usage! Score: {}/{}",
                    t.score.total, MAX_TURN_SCORE
                ),
                None,
            ));
        }
    }
    out
}

fn key_wins(turns: &[TurnAnalysis], scorer: &ConversationScorer) -> Vec<String> {
    let mut wins = Vec::new();
    if turns.is_empty() {
        return wins;
    }

    let strong = turns
        .iter()
        .filter(|t| t.score.total >= CONSISTENT_TURN_TOTAL)
        .count();
    if strong * 2 > turns.len() {
        wins.push("Consistent use of CFR framework throughout call".to_string());
    }
    if average(turns, |s| s.step_scores.acknowledge) >= 2.5 {
        wins.push("Excellent acknowledgement and affirmation skills".to_string());
    }
    if average(turns, |s| s.step_scores.isolate) >= 2.5 {
        wins.push("Strong objection isolation".to_string());
    }

    let used = techniques_used(turns);
    for id in &used {
        if let Some(technique) = scorer.catalog().technique(id) {
            wins.push(format!("Used the {} technique", technique.name));
        }
    }
    if used.len() >= 3 {
        wins.push(format!(
            "Demonstrated variety of techniques ({} different)",
            used.len()
        ));
    }
    wins
}

fn improvement_areas(turns: &[TurnAnalysis]) -> Vec<String> {
    let mut out = Vec::new();
    if turns.is_empty() {
        return out;
    }

    if average(turns, |s| s.step_scores.acknowledge) < 2.0 {
        out.push("Start responses with acknowledgement ('Perfect', 'I can appreciate that')".to_string());
    }
    if average(turns, |s| s.step_scores.isolate) < 2.0 {
        out.push("Practice isolation questions ('Besides that, any other concerns?')".to_string());
    }
    if average(turns, |s| s.step_scores.handle) < 2.0 {
        out.push("Use more advanced techniques (Feel-Felt-Found, Level Shift)".to_string());
    }
    if average(turns, |s| s.step_scores.close) < 1.0 {
        out.push("Add closing questions ('Does that make sense?', 'Which works better?')".to_string());
    }

    let breakers: usize = turns
        .iter()
        .map(|t| t.score.rapport_breakers_triggered.len())
        .sum();
    if breakers > 0 {
        out.push(format!("Avoid rapport breakers ({} instances detected)", breakers));
    }
    out
}

fn missed_opportunities(turns: &[TurnAnalysis]) -> Vec<MissedOpportunity> {
    let mut out = Vec::new();
    for t in turns {
        let steps = &t.score.step_scores;
        if let (0, Some(client)) = (steps.isolate, t.turn.client_text.as_deref()) {
            let preview: String = client.chars().take(CONTEXT_PREVIEW_CHARS).collect();
            out.push(MissedOpportunity {
                timestamp: t.turn.timestamp,
                context: format!("Client said: '{}...'", preview),
                suggestion: "Isolate the objection".to_string(),
                example: "Besides that, is there any other reason you wouldn't move forward?"
                    .to_string(),
            });
        }
        if steps.acknowledge == 0 {
            out.push(MissedOpportunity {
                timestamp: t.turn.timestamp,
                context: "Response started without acknowledgement".to_string(),
                suggestion: "Start with an acknowledgement term".to_string(),
                example: "Perfect! I can appreciate that concern...".to_string(),
            });
        }
        for breaker in &t.score.rapport_breakers_triggered {
            out.push(MissedOpportunity {
                timestamp: t.turn.timestamp,
                context: format!("You said '{}'", breaker.matched_text),
                suggestion: "Replace the rapport breaker".to_string(),
                example: breaker.suggested_alternative.clone(),
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::catalog;
    use crate::models::persona::fixtures;
    use crate::models::transcript::TranscriptSegment;
    use std::sync::Arc;

    fn analyzer() -> CallAnalyzer {
        CallAnalyzer::new(
            ConversationScorer::new(Arc::new(catalog())),
            AnalysisConfig::default(),
        )
    }

    fn labelled(parts: &[(f64, Speaker, &str)]) -> CallTranscript {
        let segments = parts
            .iter()
            .map(|(start, speaker, text)| TranscriptSegment::new(*start, start + 2.0, text, Some(*speaker)))
            .collect();
        CallTranscript::new(segments, 60.0)
    }

    #[test]
    fn test_label_speakers_keyword_then_alternate() {
        let mut transcript = CallTranscript::new(
            vec![
                TranscriptSegment::new(0.0, 1.0, "Hello?", None),
                TranscriptSegment::new(1.0, 2.0, "Hi, I can help with your search", None),
                TranscriptSegment::new(2.0, 3.0, "Thanks", None),
                TranscriptSegment::new(3.0, 4.0, "Sure thing", None),
            ],
            4.0,
        );
        label_speakers(&mut transcript, &AnalysisConfig::default().agent_keywords);
        let speakers: Vec<_> = transcript.segments.iter().map(|s| s.speaker).collect();
        assert_eq!(
            speakers,
            vec![
                Some(Speaker::Client),
                Some(Speaker::Agent),
                Some(Speaker::Client),
                Some(Speaker::Agent)
            ]
        );
    }

    #[test]
    fn test_first_segment_agent_on_keyword() {
        let mut transcript = CallTranscript::new(
            vec![TranscriptSegment::new(0.0, 1.0, "PERFECT, let's begin", None)],
            1.0,
        );
        label_speakers(&mut transcript, &AnalysisConfig::default().agent_keywords);
        assert_eq!(transcript.segments[0].speaker, Some(Speaker::Agent));
    }

    #[test]
    fn test_pair_turns_uses_latest_prior_client() {
        let transcript = labelled(&[
            (0.0, Speaker::Agent, "Hi there"),
            (2.0, Speaker::Client, "First"),
            (4.0, Speaker::Client, "Second"),
            (6.0, Speaker::Agent, "Reply"),
        ]);
        let turns = pair_turns(&transcript);
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].client_text, None);
        assert_eq!(turns[1].client_text.as_deref(), Some("Second"));
    }

    #[test]
    fn test_unlabelled_transcript_rejected() {
        let transcript = CallTranscript::new(vec![TranscriptSegment::new(0.0, 1.0, "Hi", None)], 1.0);
        assert!(matches!(
            analyzer().analyze(&transcript, None),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_analyze_with_persona_matches_objection() {
        let persona = fixtures::investor();
        let transcript = labelled(&[
            (0.0, Speaker::Client, "Honestly the cap rate is too low for me"),
            (3.0, Speaker::Agent, "I understand. Actually it's fine."),
        ]);
        let report = analyzer().analyze(&transcript, Some(&persona)).unwrap();
        assert_eq!(report.turns.len(), 1);
        assert_eq!(report.turns[0].objection_id.as_deref(), Some("cap_rate_too_low"));
        assert_eq!(report.max_score, 11);
        assert_eq!(report.grade, 'F');
        assert!(report
            .timestamped_feedback
            .iter()
            .any(|f| f.kind == FeedbackKind::Critical));
        assert!(report.missed_opportunities.len() <= 5);
        assert!(!report.improvement_areas.is_empty());
    }

    #[test]
    fn test_missed_opportunities_capped() {
        let mut parts = Vec::new();
        for i in 0..6 {
            parts.push((i as f64 * 10.0, Speaker::Client, "That's too expensive"));
            parts.push((i as f64 * 10.0 + 5.0, Speaker::Agent, "I understand."));
        }
        let report = analyzer().analyze(&labelled(&parts), None).unwrap();
        assert_eq!(report.missed_opportunities.len(), 5);
        assert!(report.to_string().contains("CALL COACHING REPORT"));
    }

    #[test]
    fn test_empty_call() {
        let report = analyzer().analyze(&labelled(&[]), None).unwrap();
        assert_eq!(report.max_score, 0);
        assert_eq!(report.percentage, 0.0);
        assert!(report.key_wins.is_empty());
    }
}
