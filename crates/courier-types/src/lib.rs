//! # courier-types
//!
//! Core type definitions for the courier mail and web assistant.
//!
//! This crate is the foundation of the dependency graph -- all other
//! courier crates depend on it. It contains:
//!
//! - **[`error`]** -- [`CourierError`], the shared error taxonomy
//! - **[`config`]** -- Configuration schema and file discovery
//! - **[`mail`]** -- Email messages, summaries, and details
//! - **[`tool`]** -- Tool calls and tool results exchanged with the registry
//! - **[`conversation`]** -- Conversation turns and final answer formats
//! - **[`secret`]** -- [`SecretString`] for values that must never be logged

pub mod config;
pub mod conversation;
pub mod error;
pub mod mail;
pub mod secret;
pub mod tool;

pub use error::{CourierError, Result};
pub use secret::SecretString;
