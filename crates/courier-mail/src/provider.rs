//! The mail provider seam.

use async_trait::async_trait;
use courier_oauth2::Credential;
use courier_types::mail::{EmailDetail, EmailSummary, MaxResults, SentReceipt};

/// Raw access to a mailbox API.
///
/// Implementations do no retries and report failures as a cause string;
/// [`MailClient`](crate::MailClient) attaches the operation.
#[async_trait]
pub trait MailProvider: Send + Sync {
    /// Message ids, newest first, optionally filtered by a provider query.
    async fn list_ids(
        &self,
        credential: &Credential,
        query: Option<&str>,
        max_results: MaxResults,
    ) -> Result<Vec<EmailSummary>, String>;

    /// One message with headers and plain-text body.
    async fn get(&self, credential: &Credential, id: &str) -> Result<EmailDetail, String>;

    /// Submit an RFC 2822 document.
    async fn send_raw(&self, credential: &Credential, rfc2822: &str)
    -> Result<SentReceipt, String>;
}
