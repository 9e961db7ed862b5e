//! 服务模块

pub mod call_analysis;
pub mod coaching;
pub mod persona_prompt;
pub mod persona_registry;
pub mod persona_state;
pub mod session;

pub use call_analysis::{CallAnalysisReport, CallAnalyzer, CallTurn, label_speakers, pair_turns};
pub use coaching::{SessionSummary, TurnDisclosure, suggested_techniques};
pub use persona_prompt::render_persona_prompt;
pub use persona_registry::PersonaRegistry;
pub use persona_state::{PersonaStateMachine, ResolutionPolicy, Transition};
pub use session::{
    InMemorySessionService, SessionService, TurnInput, TurnOutcome, create_session_service,
};
