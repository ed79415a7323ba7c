//! Reasoning engine transport for courier.
//!
//! The orchestrator talks to a language model through the [`Provider`]
//! trait. [`OpenAiCompatProvider`] implements it for any endpoint that
//! speaks the OpenAI chat completion format with function calling.
//!
//! ```rust,ignore
//! use courier_llm::{ChatMessage, ChatRequest, OpenAiCompatProvider, Provider};
//!
//! let provider = OpenAiCompatProvider::with_api_key(config, key);
//! let request = ChatRequest::new("gpt-4o-mini", vec![
//!     ChatMessage::system("You are an email assistant."),
//!     ChatMessage::user("List my recent emails"),
//! ]);
//! let response = provider.complete(&request).await?;
//! ```

pub mod config;
pub mod error;
pub mod openai_compat;
pub mod provider;
pub mod types;

pub use config::LlmProviderConfig;
pub use error::{ProviderError, Result};
pub use openai_compat::OpenAiCompatProvider;
pub use provider::Provider;
pub use types::{ChatMessage, ChatRequest, ChatResponse, Choice, FunctionCall, ToolCall, Usage};
