//! 会话服务
//!
//! 管理内存中的角色扮演会话：创建、查询、删除，以及逐轮评分和状态推进。
//! 同一会话的轮次在条目锁内串行执行，不同会话互不阻塞。

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::models::score::ScoreResult;
use crate::models::session::{Difficulty, PersonaSessionState, SessionSnapshot, TrainingMode};
use crate::observability::AppMetrics;
use crate::scoring::ConversationScorer;
use crate::services::coaching::{SessionSummary, TurnDisclosure, suggested_techniques};
use crate::services::persona_prompt::render_persona_prompt;
use crate::services::persona_registry::PersonaRegistry;
use crate::services::persona_state::{PersonaStateMachine, Transition};

/// 提交一轮发言
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnInput {
    /// 销售方发言
    pub utterance: String,
    /// 客户上一句（用于转交检测）
    #[serde(default)]
    pub client_message: Option<String>,
    /// 调用方显式要求转交
    #[serde(default)]
    pub escalate: bool,
}

impl TurnInput {
    pub fn new(utterance: &str) -> Self {
        Self {
            utterance: utterance.to_string(),
            ..Default::default()
        }
    }
}

/// 一轮的结果，按训练模式裁剪
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub session: SessionSnapshot,
    pub transition: Transition,
    /// 挑战模式下为空
    pub score: Option<ScoreResult>,
    /// 仅练习模式
    pub suggestions: Vec<String>,
}

/// 会话服务 trait
#[async_trait]
pub trait SessionService: Send + Sync {
    /// 创建会话
    async fn create(
        &self,
        persona_id: &str,
        difficulty: Difficulty,
        mode: TrainingMode,
    ) -> Result<SessionSnapshot>;

    /// 根据 ID 获取会话
    async fn get(&self, id: &str) -> Result<SessionSnapshot>;

    /// 列出会话（按创建时间）
    async fn list(&self) -> Result<Vec<SessionSnapshot>>;

    /// 删除会话
    async fn delete(&self, id: &str) -> Result<()>;

    /// 评分并推进一轮
    async fn submit_turn(&self, id: &str, input: TurnInput) -> Result<TurnOutcome>;

    /// 会话总结
    async fn summary(&self, id: &str) -> Result<SessionSummary>;

    /// 当前人设提示词
    async fn prompt(&self, id: &str) -> Result<String>;
}

/// 内存会话服务
pub struct InMemorySessionService {
    sessions: DashMap<String, PersonaSessionState>,
    registry: Arc<PersonaRegistry>,
    scorer: Arc<ConversationScorer>,
    machine: PersonaStateMachine,
    metrics: Arc<AppMetrics>,
}

impl InMemorySessionService {
    /// 创建新的服务实例
    pub fn new(
        registry: Arc<PersonaRegistry>,
        scorer: Arc<ConversationScorer>,
        machine: PersonaStateMachine,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            registry,
            scorer,
            machine,
            metrics,
        }
    }

    fn not_found(id: &str) -> AppError {
        AppError::NotFound(format!("Session not found: {}", id))
    }

    fn with_session<T>(&self, id: &str, f: impl FnOnce(&PersonaSessionState) -> T) -> Result<T> {
        self.sessions
            .get(id)
            .map(|entry| f(entry.value()))
            .ok_or_else(|| Self::not_found(id))
    }
}

#[async_trait]
impl SessionService for InMemorySessionService {
    async fn create(
        &self,
        persona_id: &str,
        difficulty: Difficulty,
        mode: TrainingMode,
    ) -> Result<SessionSnapshot> {
        let persona = self.registry.require(persona_id)?;
        let state = PersonaSessionState::new(persona, difficulty, mode);
        let snapshot = SessionSnapshot::from(&state);

        info!(
            session_id = %state.id,
            persona = %persona_id,
            ?difficulty,
            ?mode,
            objections = state.objection_count(),
            "Session created"
        );
        self.sessions.insert(state.id.clone(), state);
        self.metrics.record_session_started();
        Ok(snapshot)
    }

    async fn get(&self, id: &str) -> Result<SessionSnapshot> {
        self.with_session(id, |state| SessionSnapshot::from(state))
    }

    async fn list(&self) -> Result<Vec<SessionSnapshot>> {
        let mut sessions: Vec<SessionSnapshot> = self
            .sessions
            .iter()
            .map(|entry| SessionSnapshot::from(entry.value()))
            .collect();
        sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(sessions)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let (_, state) = self.sessions.remove(id).ok_or_else(|| Self::not_found(id))?;
        if !state.is_terminal() {
            self.metrics.record_session_closed();
        }
        info!(session_id = %id, turns = state.turn_count, "Session deleted");
        Ok(())
    }

    async fn submit_turn(&self, id: &str, input: TurnInput) -> Result<TurnOutcome> {
        // 条目写锁覆盖评分与状态推进，同一会话的轮次严格串行
        let mut entry = self.sessions.get_mut(id).ok_or_else(|| Self::not_found(id))?;
        let state = entry.value_mut();

        let score = self.scorer.score(&input.utterance, state)?;
        let escalation = PersonaStateMachine::escalation_signal(
            state,
            &input.utterance,
            input.client_message.as_deref(),
            input.escalate,
        );
        let breakers = score.rapport_breakers_triggered.len();
        let transition = self
            .machine
            .apply(state, &input.utterance, score.clone(), escalation)?;

        debug!(
            session_id = %id,
            turn = state.turn_count,
            total = score.total,
            delta = score.cooperation_delta,
            cooperation = state.cooperation_level,
            "Turn scored"
        );
        self.metrics.record_turn(
            breakers,
            transition.changed_phase().then_some(transition.to).filter(|p| p.is_terminal()),
        );

        let disclosure = TurnDisclosure::from(state.mode);
        let suggestions = if disclosure.suggestions {
            suggested_techniques(&score)
        } else {
            Vec::new()
        };

        Ok(TurnOutcome {
            session: SessionSnapshot::from(&*state),
            transition,
            score: disclosure.score.then_some(score),
            suggestions,
        })
    }

    async fn summary(&self, id: &str) -> Result<SessionSummary> {
        self.with_session(id, SessionSummary::from_state)
    }

    async fn prompt(&self, id: &str) -> Result<String> {
        self.with_session(id, render_persona_prompt)
    }
}

/// 创建会话服务
pub fn create_session_service(
    registry: Arc<PersonaRegistry>,
    scorer: Arc<ConversationScorer>,
    machine: PersonaStateMachine,
    metrics: Arc<AppMetrics>,
) -> Arc<dyn SessionService> {
    Arc::new(InMemorySessionService::new(registry, scorer, machine, metrics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::catalog;
    use crate::models::persona::fixtures;
    use crate::models::session::SessionPhase;

    fn service() -> InMemorySessionService {
        let catalog = catalog();
        let registry = PersonaRegistry::from_personas(vec![fixtures::investor()], &catalog).unwrap();
        InMemorySessionService::new(
            Arc::new(registry),
            Arc::new(ConversationScorer::new(Arc::new(catalog))),
            PersonaStateMachine::default(),
            Arc::new(AppMetrics::default()),
        )
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let svc = service();
        let created = svc
            .create("investor", Difficulty::Medium, TrainingMode::Scoring)
            .await
            .unwrap();
        let fetched = svc.get(&created.id).await.unwrap();
        assert_eq!(created, fetched);
        assert_eq!(fetched.cooperation_level, 5);
        assert_eq!(svc.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_persona_and_session() {
        let svc = service();
        assert!(matches!(
            svc.create("nobody", Difficulty::Medium, TrainingMode::Scoring).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(svc.get("missing").await, Err(AppError::NotFound(_))));
        assert!(matches!(svc.delete("missing").await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_challenge_mode_hides_score() {
        let svc = service();
        let s = svc
            .create("investor", Difficulty::Medium, TrainingMode::Challenge)
            .await
            .unwrap();
        let outcome = svc.submit_turn(&s.id, TurnInput::new("Perfect!")).await.unwrap();
        assert!(outcome.score.is_none());
        assert_eq!(outcome.session.turn_count, 1);

        let summary = svc.summary(&s.id).await.unwrap();
        assert_eq!(summary.turns, 1);
    }

    #[tokio::test]
    async fn test_practice_mode_suggests() {
        let svc = service();
        let s = svc
            .create("investor", Difficulty::Medium, TrainingMode::Practice)
            .await
            .unwrap();
        let outcome = svc.submit_turn(&s.id, TurnInput::new("I understand.")).await.unwrap();
        assert!(outcome.score.is_some());
        assert!(!outcome.suggestions.is_empty());
    }

    #[tokio::test]
    async fn test_escalated_session_rejects_turns() {
        let svc = service();
        let s = svc
            .create("investor", Difficulty::Medium, TrainingMode::Scoring)
            .await
            .unwrap();
        let input = TurnInput {
            utterance: "Perfect!".into(),
            client_message: Some("What about a 1031 exchange?".into()),
            escalate: false,
        };
        let outcome = svc.submit_turn(&s.id, input).await.unwrap();
        assert_eq!(outcome.transition.to, SessionPhase::Escalated);

        let err = svc.submit_turn(&s.id, TurnInput::new("Perfect!")).await.unwrap_err();
        assert!(matches!(err, AppError::StateInvariantViolation(_)));
        assert_eq!(svc.get(&s.id).await.unwrap().turn_count, 1);
    }

    #[tokio::test]
    async fn test_prompt_and_delete() {
        let svc = service();
        let s = svc
            .create("investor", Difficulty::Beginner, TrainingMode::Scoring)
            .await
            .unwrap();
        assert!(svc.prompt(&s.id).await.unwrap().contains("Investor"));
        svc.delete(&s.id).await.unwrap();
        assert!(svc.list().await.unwrap().is_empty());
    }
}
