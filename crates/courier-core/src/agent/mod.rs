//! Agent orchestration: the bounded decide/act loop and the LLM-backed
//! reasoning engine.

pub mod llm_engine;
pub mod orchestrator;

pub use llm_engine::LlmReasoningEngine;
pub use orchestrator::{
    ConversationState, Decision, Entry, Orchestrator, OrchestratorConfig, ReasoningEngine,
};
