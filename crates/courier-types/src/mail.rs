//! Mail domain types shared by the mail adapter and the mail tools.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The mail adapter operation that failed, carried by
/// [`CourierError::MailOperationFailed`](crate::CourierError::MailOperationFailed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailOperation {
    Send,
    List,
    Read,
    Search,
}

impl MailOperation {
    /// Verb phrase used in user-facing messages ("could not send the message").
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Send => "send the message",
            Self::List => "list your messages",
            Self::Read => "read that message",
            Self::Search => "search your mailbox",
        }
    }
}

impl fmt::Display for MailOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Send => "send",
            Self::List => "list",
            Self::Read => "read",
            Self::Search => "search",
        })
    }
}

/// Why an [`EmailMessage`] could not be built.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecipientError {
    #[error("recipient address is empty")]
    Empty,
    #[error("recipient address '{0}' is not a valid email address")]
    Malformed(String),
}

/// An outgoing message.
///
/// Immutable once built; `MailClient::send` takes it by value so a
/// message can only be handed to the provider once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    to: String,
    subject: String,
    body: String,
}

impl EmailMessage {
    /// Build a message. The recipient must be a non-empty `local@domain` address.
    pub fn new(
        to: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<Self, RecipientError> {
        let to = to.into().trim().to_string();
        if to.is_empty() {
            return Err(RecipientError::Empty);
        }
        match to.split_once('@') {
            Some((local, domain))
                if !local.is_empty() && !domain.is_empty() && !to.contains(char::is_whitespace) => {}
            _ => return Err(RecipientError::Malformed(to)),
        }
        Ok(Self {
            to,
            subject: subject.into(),
            body: body.into(),
        })
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Render the message as an RFC 2822 plain-text document.
    pub fn to_rfc2822(&self) -> String {
        format!(
            "To: {}\r\nSubject: {}\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{}",
            self.to,
            self.subject.replace(['\r', '\n'], " "),
            self.body
        )
    }
}

/// Upper bound the Gmail API accepts for a single page of results.
pub const MAX_RESULTS_LIMIT: u32 = 500;

/// A bounded, positive result count for list and search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MaxResults(u32);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("max_results must be between 1 and {MAX_RESULTS_LIMIT}, got {0}")]
pub struct MaxResultsOutOfRange(pub u32);

impl MaxResults {
    pub fn new(n: u32) -> Result<Self, MaxResultsOutOfRange> {
        if n == 0 || n > MAX_RESULTS_LIMIT {
            return Err(MaxResultsOutOfRange(n));
        }
        Ok(Self(n))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for MaxResults {
    type Error = MaxResultsOutOfRange;

    fn try_from(n: u32) -> Result<Self, Self::Error> {
        Self::new(n)
    }
}

/// Lightweight reference returned by list operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailSummary {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

/// Normalized view of a single message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailDetail {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub snippet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub label_ids: Vec<String>,
}

/// Provider acknowledgement of a sent message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentReceipt {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub label_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_recipient() {
        assert_eq!(EmailMessage::new("   ", "s", "b"), Err(RecipientError::Empty));
    }

    #[test]
    fn rejects_malformed_recipient() {
        for bad in ["alice", "@example.com", "alice@", "a b@example.com"] {
            assert!(
                matches!(EmailMessage::new(bad, "s", "b"), Err(RecipientError::Malformed(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn trims_recipient() {
        let msg = EmailMessage::new(" alice@example.com ", "Hi", "Body").unwrap();
        assert_eq!(msg.to(), "alice@example.com");
    }

    #[test]
    fn rfc2822_layout() {
        let msg = EmailMessage::new("alice@example.com", "Lunch", "See you at noon").unwrap();
        assert_eq!(
            msg.to_rfc2822(),
            "To: alice@example.com\r\nSubject: Lunch\r\n\
             Content-Type: text/plain; charset=utf-8\r\n\r\nSee you at noon"
        );
    }

    #[test]
    fn subject_newlines_cannot_inject_headers() {
        let msg = EmailMessage::new("a@b.c", "Hi\r\nBcc: evil@x.y", "").unwrap();
        let raw = msg.to_rfc2822();
        assert!(!raw.contains("\r\nBcc:"));
    }

    #[test]
    fn max_results_bounds() {
        assert!(MaxResults::new(0).is_err());
        assert_eq!(MaxResults::new(1).unwrap().get(), 1);
        assert_eq!(MaxResults::new(MAX_RESULTS_LIMIT).unwrap().get(), 500);
        assert_eq!(MaxResults::try_from(501), Err(MaxResultsOutOfRange(501)));
    }

    #[test]
    fn operation_display() {
        assert_eq!(MailOperation::Search.to_string(), "search");
        assert_eq!(
            serde_json::to_string(&MailOperation::Send).unwrap(),
            "\"send\""
        );
    }
}
