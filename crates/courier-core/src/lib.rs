//! # courier-core
//!
//! Core engine for the courier mail and web assistant.
//!
//! Contains the tool registry with its schema validation, the built-in mail
//! and web tools, the agent orchestrator, the chat entry point, and the
//! bootstrap that wires everything from a [`Config`](courier_types::config::Config).

pub mod agent;
pub mod bootstrap;
pub mod chat;
pub mod tools;
