// src/core/mod.rs — Channel lifecycle engine

pub mod flags;
pub mod orchestrator;
pub mod session;
pub mod types;

pub use orchestrator::{LifecycleOrchestrator, OrchestratorSettings, PollReport, Snapshot};
pub use session::{Session, SessionContext, SessionOutcome, SessionSettings, SessionState};
