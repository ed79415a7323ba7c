//! Chat entry point: one user message in, one reply out.

use tracing::error;

use courier_types::conversation::Turn;

use crate::agent::Orchestrator;

/// Answer `text` given the earlier `history`.
///
/// Never fails: a failed run is logged with its typed cause and the user
/// gets a plain-language description instead.
pub async fn respond(orchestrator: &Orchestrator, text: &str, history: &[Turn]) -> String {
    match orchestrator.run(text, history).await {
        Ok(answer) => answer.to_string(),
        Err(e) => {
            error!(error = %e, cause = ?e, "request failed");
            e.user_message()
        }
    }
}
