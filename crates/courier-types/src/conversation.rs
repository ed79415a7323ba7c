//! Conversation turns and final answer formats.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Who produced a prior turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A prior turn supplied by the chat surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Shape the final answer must take.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerFormat {
    /// Free text.
    #[default]
    Plain,
    /// JSON object `{"answer": .., "source": ..}`.
    Sourced,
}

/// The answer returned by one orchestrated run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FinalAnswer {
    Plain(String),
    Sourced { answer: String, source: String },
}

#[derive(Deserialize)]
struct SourcedWire {
    answer: String,
    source: String,
}

impl AnswerFormat {
    /// Validate engine output against this format.
    ///
    /// The error string is fed back to the engine as a correction note.
    pub fn parse(self, text: &str) -> Result<FinalAnswer, String> {
        let text = text.trim();
        if text.is_empty() {
            return Err("the final answer was empty".into());
        }
        match self {
            Self::Plain => Ok(FinalAnswer::Plain(text.to_string())),
            Self::Sourced => {
                let body = strip_code_fence(text);
                let wire: SourcedWire = serde_json::from_str(body).map_err(|e| {
                    format!(
                        "the final answer must be a JSON object with string fields \
                         \"answer\" and \"source\" ({e})"
                    )
                })?;
                if wire.answer.trim().is_empty() {
                    return Err("\"answer\" must not be empty".into());
                }
                if wire.source.trim().is_empty() {
                    return Err("\"source\" must name where the answer came from".into());
                }
                Ok(FinalAnswer::Sourced {
                    answer: wire.answer,
                    source: wire.source,
                })
            }
        }
    }
}

/// Models often wrap JSON in a ```json fence.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

impl FinalAnswer {
    pub fn answer(&self) -> &str {
        match self {
            Self::Plain(text) => text,
            Self::Sourced { answer, .. } => answer,
        }
    }

    pub fn source(&self) -> Option<&str> {
        match self {
            Self::Plain(_) => None,
            Self::Sourced { source, .. } => Some(source),
        }
    }
}

impl fmt::Display for FinalAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(text) => f.write_str(text),
            Self::Sourced { answer, source } => write!(f, "{answer}\n\nSource: {source}"),
        }
    }
}
