//! Gmail REST v1 implementation of [`MailProvider`].
//!
//! Endpoints, relative to `base_url` (`.../gmail/v1/users/me` by default):
//!
//! - `GET  messages?maxResults=N[&q=...]`
//! - `GET  messages/{id}?format=full`
//! - `POST messages/send` with `{"raw": base64url(rfc2822)}`

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use courier_oauth2::Credential;
use courier_types::config::MailConfig;
use courier_types::mail::{EmailDetail, EmailSummary, MaxResults, SentReceipt};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::provider::MailProvider;

pub struct GmailProvider {
    http: reqwest::Client,
    base_url: String,
}

impl GmailProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(cfg: &MailConfig) -> Self {
        Self::new(cfg.base_url.clone(), Duration::from_secs(cfg.timeout_secs))
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, String> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(format!("Gmail API returned {status}: {detail}"));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| format!("unexpected Gmail response: {e}"))
    }
}

#[async_trait]
impl MailProvider for GmailProvider {
    async fn list_ids(
        &self,
        credential: &Credential,
        query: Option<&str>,
        max_results: MaxResults,
    ) -> Result<Vec<EmailSummary>, String> {
        let mut params = vec![("maxResults", max_results.get().to_string())];
        if let Some(q) = query {
            params.push(("q", q.to_string()));
        }

        debug!(query = ?query, max_results = max_results.get(), "gmail list");
        let response = self
            .http
            .get(format!("{}/messages", self.base_url))
            .header("Authorization", credential.authorization_header())
            .query(&params)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let list: ListResponse = Self::decode(response).await?;
        let mut ids: Vec<EmailSummary> = list
            .messages
            .into_iter()
            .map(|m| EmailSummary {
                id: m.id,
                thread_id: m.thread_id,
            })
            .collect();
        ids.truncate(max_results.get() as usize);
        Ok(ids)
    }

    async fn get(&self, credential: &Credential, id: &str) -> Result<EmailDetail, String> {
        let response = self
            .http
            .get(format!("{}/messages/{id}", self.base_url))
            .header("Authorization", credential.authorization_header())
            .query(&[("format", "full")])
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let message: GmailMessage = Self::decode(response).await?;
        Ok(message.into_detail())
    }

    async fn send_raw(
        &self,
        credential: &Credential,
        rfc2822: &str,
    ) -> Result<SentReceipt, String> {
        let raw = URL_SAFE_NO_PAD.encode(rfc2822.as_bytes());
        let response = self
            .http
            .post(format!("{}/messages/send", self.base_url))
            .header("Authorization", credential.authorization_header())
            .json(&serde_json::json!({ "raw": raw }))
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let sent: SentResponse = Self::decode(response).await?;
        Ok(SentReceipt {
            id: sent.id,
            thread_id: sent.thread_id,
            label_ids: sent.label_ids,
        })
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Deserialize)]
struct ListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageRef {
    id: String,
    #[serde(default)]
    thread_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SentResponse {
    id: String,
    #[serde(default)]
    thread_id: Option<String>,
    #[serde(default)]
    label_ids: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailMessage {
    id: String,
    #[serde(default)]
    thread_id: Option<String>,
    #[serde(default)]
    label_ids: Vec<String>,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    payload: Option<Part>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    headers: Vec<Header>,
    #[serde(default)]
    body: Option<PartBody>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Header {
    name: String,
    value: String,
}

#[derive(Deserialize)]
struct PartBody {
    #[serde(default)]
    data: Option<String>,
}

impl GmailMessage {
    fn into_detail(self) -> EmailDetail {
        let payload = self.payload.unwrap_or_default();
        let header = |name: &str| {
            payload
                .headers
                .iter()
                .find(|h| h.name.eq_ignore_ascii_case(name))
                .map(|h| h.value.clone())
        };

        EmailDetail {
            subject: header("Subject"),
            from: header("From"),
            to: header("To"),
            date: header("Date"),
            body: plain_text_body(&payload).unwrap_or_default(),
            id: self.id,
            thread_id: self.thread_id,
            snippet: self.snippet,
            label_ids: self.label_ids,
        }
    }
}

/// The part's own body when it is text/plain (or the root single-part
/// message), else the first text/plain descendant.
fn plain_text_body(part: &Part) -> Option<String> {
    let own = part
        .body
        .as_ref()
        .and_then(|b| b.data.as_deref())
        .and_then(decode_body);
    if part.parts.is_empty() {
        return own;
    }
    if part.mime_type.eq_ignore_ascii_case("text/plain") && own.is_some() {
        return own;
    }
    part.parts.iter().find_map(|p| {
        if p.parts.is_empty() && !p.mime_type.eq_ignore_ascii_case("text/plain") {
            return None;
        }
        plain_text_body(p)
    })
}

/// Gmail emits base64url, sometimes padded.
fn decode_body(data: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(data.trim_end_matches('=')).ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn encode(s: &str) -> String {
        URL_SAFE_NO_PAD.encode(s)
    }

    #[test]
    fn single_part_body_and_headers() {
        let msg: GmailMessage = serde_json::from_value(json!({
            "id": "m1",
            "threadId": "t1",
            "labelIds": ["INBOX", "UNREAD"],
            "snippet": "Hello there",
            "payload": {
                "mimeType": "text/plain",
                "headers": [
                    {"name": "Subject", "value": "Greetings"},
                    {"name": "from", "value": "Bob <bob@example.com>"}
                ],
                "body": {"size": 11, "data": encode("Hello there")}
            }
        }))
        .unwrap();

        let detail = msg.into_detail();
        assert_eq!(detail.id, "m1");
        assert_eq!(detail.thread_id.as_deref(), Some("t1"));
        assert_eq!(detail.subject.as_deref(), Some("Greetings"));
        assert_eq!(detail.from.as_deref(), Some("Bob <bob@example.com>"));
        assert_eq!(detail.to, None);
        assert_eq!(detail.body, "Hello there");
        assert_eq!(detail.label_ids, vec!["INBOX", "UNREAD"]);
    }

    #[test]
    fn multipart_prefers_nested_plain_text() {
        let msg: GmailMessage = serde_json::from_value(json!({
            "id": "m2",
            "payload": {
                "mimeType": "multipart/mixed",
                "body": {"size": 0},
                "parts": [
                    {
                        "mimeType": "multipart/alternative",
                        "parts": [
                            {"mimeType": "text/html", "body": {"data": encode("<p>hi</p>")}},
                            {"mimeType": "text/plain", "body": {"data": encode("hi")}}
                        ]
                    },
                    {"mimeType": "application/pdf", "body": {"attachmentId": "a1"}}
                ]
            }
        }))
        .unwrap();

        assert_eq!(msg.into_detail().body, "hi");
    }

    #[test]
    fn missing_payload_yields_empty_body() {
        let msg: GmailMessage = serde_json::from_value(json!({"id": "m3"})).unwrap();
        let detail = msg.into_detail();
        assert_eq!(detail.body, "");
        assert_eq!(detail.subject, None);
    }

    #[test]
    fn decode_body_accepts_padding() {
        let padded = base64::engine::general_purpose::URL_SAFE.encode("ab");
        assert!(padded.ends_with('='));
        assert_eq!(decode_body(&padded).as_deref(), Some("ab"));
        assert_eq!(decode_body("!!!"), None);
    }
}
