// Scenario tests for scoring and the persona state machine against the
// shipped catalog and personas.
//
// Tests cover:
// - Per-step scoring and the cooperation formula
// - Resolution through the whole objection queue
// - Escalation, clamping and terminal phases

mod common;

use std::sync::Arc;

use cfr_coach::error::AppError;
use cfr_coach::models::{Difficulty, PersonaSessionState, SessionPhase, TrainingMode};
use cfr_coach::scoring::ConversationScorer;
use cfr_coach::services::{PersonaRegistry, PersonaStateMachine};
use common::STRONG_TURN;
use rstest::rstest;

fn session(registry: &PersonaRegistry, persona: &str, difficulty: Difficulty) -> PersonaSessionState {
    PersonaSessionState::new(
        registry.require(persona).unwrap(),
        difficulty,
        TrainingMode::Scoring,
    )
}

fn play(
    scorer: &ConversationScorer,
    state: &mut PersonaSessionState,
    utterance: &str,
    client_message: Option<&str>,
) -> cfr_coach::services::Transition {
    let score = scorer.score(utterance, state).unwrap();
    let escalate = PersonaStateMachine::escalation_signal(state, utterance, client_message, false);
    PersonaStateMachine::default()
        .apply(state, utterance, score, escalate)
        .unwrap()
}

// ============ Scoring ============

#[test]
fn test_strong_turn_scores_full_marks() {
    let (scorer, registry) = common::scorer();
    let state = session(&registry, "investor", Difficulty::Medium);

    let score = scorer.score(STRONG_TURN, &state).unwrap();
    assert_eq!(score.step_scores.acknowledge, 3);
    assert_eq!(score.step_scores.isolate, 3);
    assert_eq!(score.step_scores.handle, 3);
    assert_eq!(score.step_scores.close, 2);
    assert_eq!(score.total, 11);
    assert!(score.detected_techniques.contains("feel_felt_found"));
    assert!(score.detected_techniques.contains("social_proof"));
    assert!(score.detected_magic_phrases.contains("right_to_focus"));
    assert!(score.rapport_breakers_triggered.is_empty());
    // base 5 plus the magic phrase bonus
    assert_eq!(score.cooperation_delta, 6);
}

#[test]
fn test_cap_rate_acknowledge_and_isolate() {
    let (scorer, registry) = common::scorer();
    let state = session(&registry, "investor", Difficulty::Medium);
    assert_eq!(
        state.active_objection().map(|o| o.id.as_str()),
        Some("cap_rate_too_low")
    );

    let score = scorer
        .score(
            "Perfect! You're right to focus on cap rate \u{2014} besides that, is there anything else holding you back?",
            &state,
        )
        .unwrap();
    assert_eq!(score.step_scores.acknowledge, 3);
    assert_eq!(score.step_scores.isolate, 3);
    assert_eq!(score.step_scores.close, 0);
    assert!((6..=9).contains(&score.total));
    assert!(score.detected_magic_phrases.contains("right_to_focus"));
    assert!(score.rapport_breakers_triggered.is_empty());
}

#[test]
fn test_bare_i_understand_is_penalised() {
    let (scorer, _) = common::scorer();
    let score = scorer.score_utterance("I understand.", None);
    assert_eq!(score.total, 0);
    assert_eq!(score.rapport_breakers_triggered.len(), 1);
    assert_eq!(score.rapport_breakers_triggered[0].rule_id, "bare_i_understand");
    assert_eq!(score.cooperation_delta, -7);

    let exempt = scorer.score_utterance("I understand your concern.", None);
    assert!(exempt.rapport_breakers_triggered.is_empty());
    assert_eq!(exempt.step_scores.acknowledge, 2);
}

#[rstest]
#[case("", 0, -5)]
#[case("   ", 0, -5)]
#[case("Okay.", 1, -4)]
#[case("Hello there.", 0, -5)]
fn test_low_totals_map_to_negative_delta(
    #[case] utterance: &str,
    #[case] total: u8,
    #[case] delta: i32,
) {
    let (scorer, _) = common::scorer();
    let score = scorer.score_utterance(utterance, None);
    assert_eq!(score.total, total);
    assert_eq!(score.cooperation_delta, delta);
}

#[test]
fn test_evidence_reference_counts_toward_handle() {
    let (scorer, registry) = common::scorer();
    let investor = registry.require("investor").unwrap();
    let objection = investor.objection("vacancy_risk").unwrap();

    let score = scorer.score_utterance(
        "Occupancy in this submarket is 96 percent.",
        Some(objection),
    );
    assert_eq!(score.evidence_referenced.len(), 1);
    assert_eq!(score.step_scores.handle, 1);
}

#[test]
fn test_scoring_is_deterministic() {
    let (scorer, registry) = common::scorer();
    let state = session(&registry, "seller", Difficulty::Advanced);
    let first = scorer.score(STRONG_TURN, &state).unwrap();
    let second = scorer.score(STRONG_TURN, &state).unwrap();
    assert_eq!(first, second);
}

// ============ State machine ============

#[test]
fn test_four_qualifying_turns_resolve_medium_investor() {
    let (scorer, registry) = common::scorer();
    let mut state = session(&registry, "investor", Difficulty::Medium);
    assert_eq!(state.objection_count(), 4);

    for i in 0..3 {
        let t = play(&scorer, &mut state, STRONG_TURN, None);
        assert!(t.objection_resolved);
        assert_eq!(t.to, SessionPhase::Presenting { objection_index: i + 1 });
    }
    let last = play(&scorer, &mut state, STRONG_TURN, None);
    assert_eq!(last.to, SessionPhase::Resolved);
    assert_eq!(state.objections_resolved, 4);
    assert_eq!(state.turn_count, 4);
    assert!(state.active_objection().is_none());
}

#[test]
fn test_beginner_resolves_after_two() {
    let (scorer, registry) = common::scorer();
    let mut state = session(&registry, "seller", Difficulty::Beginner);
    assert_eq!(state.objection_count(), 2);

    play(&scorer, &mut state, STRONG_TURN, None);
    let t = play(&scorer, &mut state, STRONG_TURN, None);
    assert_eq!(t.to, SessionPhase::Resolved);
}

#[test]
fn test_cooperation_clamps_at_ten() {
    let (scorer, registry) = common::scorer();
    let mut state = session(&registry, "investor", Difficulty::Medium);
    let t = play(&scorer, &mut state, STRONG_TURN, None);
    assert_eq!(t.cooperation_before, 5);
    assert_eq!(t.cooperation_after, 10);
}

#[test]
fn test_weak_turn_keeps_objection() {
    let (scorer, registry) = common::scorer();
    let mut state = session(&registry, "first_time_buyer", Difficulty::Medium);
    let t = play(&scorer, &mut state, "Okay.", None);
    assert_eq!(t.from, t.to);
    assert!(!t.objection_resolved);
    assert_eq!(state.cooperation_level, 2);
    assert_eq!(
        state.active_objection().map(|o| o.id.as_str()),
        Some("down_payment")
    );
}

#[test]
fn test_rapport_breaker_blocks_resolution() {
    let (scorer, registry) = common::scorer();
    let mut state = session(&registry, "investor", Difficulty::Medium);
    let utterance = format!("{} Actually, it's a great deal.", STRONG_TURN);
    let t = play(&scorer, &mut state, &utterance, None);
    assert_eq!(t.to, SessionPhase::Presenting { objection_index: 0 });
    assert!(!t.objection_resolved);
}

#[test]
fn test_cooperation_reaching_zero_escalates() {
    let (scorer, registry) = common::scorer();
    let mut state = session(&registry, "investor", Difficulty::Medium);
    let t = play(&scorer, &mut state, "I understand.", None);
    assert_eq!(t.cooperation_after, 0);
    assert_eq!(t.to, SessionPhase::Escalated);
}

#[rstest]
#[case(STRONG_TURN, Some("Can we talk about a 1031 exchange first?"))]
#[case("Perfect, our tax strategy team can walk you through it.", None)]
fn test_handoff_topic_escalates_even_on_strong_turn(
    #[case] utterance: &str,
    #[case] client_message: Option<&str>,
) {
    let (scorer, registry) = common::scorer();
    let mut state = session(&registry, "investor", Difficulty::Medium);
    let t = play(&scorer, &mut state, utterance, client_message);
    assert_eq!(t.to, SessionPhase::Escalated);
    assert!(!t.objection_resolved);
}

#[test]
fn test_terminal_phase_is_absorbing() {
    let (scorer, registry) = common::scorer();
    let mut state = session(&registry, "seller", Difficulty::Beginner);
    play(&scorer, &mut state, STRONG_TURN, None);
    play(&scorer, &mut state, STRONG_TURN, None);
    assert_eq!(state.phase, SessionPhase::Resolved);

    assert!(matches!(
        scorer.score(STRONG_TURN, &state),
        Err(AppError::StateInvariantViolation(_))
    ));
    let score = scorer.score_utterance(STRONG_TURN, None);
    assert!(matches!(
        PersonaStateMachine::default().apply(&mut state, STRONG_TURN, score, false),
        Err(AppError::StateInvariantViolation(_))
    ));
    assert_eq!(state.turn_count, 2);
}

#[test]
fn test_objection_index_never_decreases() {
    let (scorer, registry) = common::scorer();
    let mut state = session(&registry, "seller", Difficulty::Advanced);
    let turns = [STRONG_TURN, "Okay.", STRONG_TURN, "Sure.", STRONG_TURN, "Got it."];
    let mut last_index = 0;
    for utterance in turns {
        let t = play(&scorer, &mut state, utterance, None);
        if let Some(index) = state.active_objection_index() {
            assert!(index >= last_index);
            last_index = index;
        }
        assert!(t.cooperation_after <= 10);
        if state.is_terminal() {
            break;
        }
    }
    assert_eq!(state.objections_resolved, 3);
}

#[test]
fn test_shipped_personas_load() {
    let catalog = common::catalog();
    let registry: Arc<PersonaRegistry> = common::registry(&catalog);
    let ids: Vec<String> = registry.list().iter().map(|p| p.id.clone()).collect();
    assert_eq!(ids, vec!["first_time_buyer", "investor", "seller"]);
}
