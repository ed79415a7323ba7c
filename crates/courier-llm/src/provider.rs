//! The [`Provider`] trait for chat completions.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ChatRequest, ChatResponse};

/// A backend that can answer chat completion requests.
///
/// [`OpenAiCompatProvider`](crate::openai_compat::OpenAiCompatProvider) is the
/// production implementation; tests script responses with in-memory fakes.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name for logs (e.g. "openai", "groq").
    fn name(&self) -> &str;

    /// Execute one chat completion request.
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse>;
}
