//! [`MailClient`]: credential-aware mail operations.

use std::sync::Arc;

use courier_oauth2::{Credential, CredentialStore};
use courier_types::CourierError;
use courier_types::mail::{
    EmailDetail, EmailMessage, EmailSummary, MailOperation, MaxResults, SentReceipt,
};
use tracing::{error, info};

use crate::provider::MailProvider;

/// Mail operations against one provider, authorized by the shared
/// credential store.
///
/// Each operation obtains the credential first (refreshing if needed), so
/// credential errors surface unchanged before any mailbox request is made.
/// Provider failures become [`CourierError::MailOperationFailed`]. Nothing is
/// retried.
#[derive(Clone)]
pub struct MailClient {
    credentials: Arc<CredentialStore>,
    provider: Arc<dyn MailProvider>,
}

impl MailClient {
    pub fn new(credentials: Arc<CredentialStore>, provider: Arc<dyn MailProvider>) -> Self {
        Self {
            credentials,
            provider,
        }
    }

    pub async fn send(&self, message: EmailMessage) -> Result<SentReceipt, CourierError> {
        let credential = self.credentials.obtain().await?;
        let receipt = self
            .provider
            .send_raw(&credential, &message.to_rfc2822())
            .await
            .map_err(|cause| failed(MailOperation::Send, cause))?;

        info!(id = %receipt.id, to = %message.to(), "email sent");
        Ok(receipt)
    }

    /// Most recent messages, at most `max_results`.
    pub async fn list(&self, max_results: MaxResults) -> Result<Vec<EmailSummary>, CourierError> {
        let credential = self.credentials.obtain().await?;
        let ids = self
            .provider
            .list_ids(&credential, None, max_results)
            .await
            .map_err(|cause| failed(MailOperation::List, cause))?;

        info!(count = ids.len(), "emails listed");
        Ok(ids)
    }

    pub async fn read(&self, id: &str) -> Result<EmailDetail, CourierError> {
        let credential = self.credentials.obtain().await?;
        self.read_with(&credential, id)
            .await
            .map_err(|cause| failed(MailOperation::Read, cause))
    }

    /// Messages matching `query`, each read in full, in provider order.
    ///
    /// All-or-nothing: one failed read fails the whole search.
    pub async fn search(
        &self,
        query: &str,
        max_results: MaxResults,
    ) -> Result<Vec<EmailDetail>, CourierError> {
        let credential = self.credentials.obtain().await?;
        let ids = self
            .provider
            .list_ids(&credential, Some(query), max_results)
            .await
            .map_err(|cause| failed(MailOperation::Search, format!("query '{query}': {cause}")))?;

        let mut details = Vec::with_capacity(ids.len());
        for summary in &ids {
            let detail = self.read_with(&credential, &summary.id).await.map_err(|cause| {
                failed(
                    MailOperation::Search,
                    format!("query '{query}': reading message {}: {cause}", summary.id),
                )
            })?;
            details.push(detail);
        }

        info!(query, count = details.len(), "emails searched");
        Ok(details)
    }

    async fn read_with(&self, credential: &Credential, id: &str) -> Result<EmailDetail, String> {
        self.provider.get(credential, id).await
    }
}

fn failed(operation: MailOperation, cause: String) -> CourierError {
    error!(%operation, %cause, "mail operation failed");
    CourierError::MailOperationFailed { operation, cause }
}

impl std::fmt::Debug for MailClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailClient")
            .field("provider", &self.credentials.provider())
            .finish()
    }
}
