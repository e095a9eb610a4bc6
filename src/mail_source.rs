use async_trait::async_trait;
use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine as _,
};
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use scraper::Html;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::models::{RawContent, RawSubmission};

const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

/// What to pull from a mailbox in one fetch.
#[derive(Debug, Clone)]
pub struct RetrievalQuery {
    /// Restrict to messages from this sender address.
    pub from_sender: Option<String>,
    pub max_results: usize,
    /// When set, messages without attachments are skipped entirely.
    pub attachments_only: bool,
}

impl Default for RetrievalQuery {
    fn default() -> Self {
        Self {
            from_sender: None,
            max_results: 25,
            attachments_only: false,
        }
    }
}

/// A mailbox the pipeline can ingest from. One submission per message body,
/// plus one per attachment.
#[async_trait]
pub trait MailSource: Send + Sync {
    async fn fetch(&self, query: &RetrievalQuery) -> Result<Vec<RawSubmission>>;
}

/// Gmail REST connector using a pre-obtained OAuth access token. Token
/// refresh is the operator's concern, not the pipeline's.
pub struct GmailConnector {
    client: Client,
    access_token: String,
}

#[derive(Deserialize)]
struct MessageList {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Message {
    id: String,
    internal_date: Option<String>,
    payload: Option<MessagePart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessagePart {
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    filename: String,
    #[serde(default)]
    headers: Vec<Header>,
    body: Option<PartBody>,
    #[serde(default)]
    parts: Vec<MessagePart>,
}

#[derive(Deserialize)]
struct Header {
    name: String,
    value: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartBody {
    data: Option<String>,
    attachment_id: Option<String>,
}

#[derive(Deserialize)]
struct AttachmentBody {
    data: Option<String>,
}

impl GmailConnector {
    pub fn new(access_token: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            access_token,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| PipelineError::ServiceUnavailable(format!("Gmail request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::ServiceUnavailable(format!(
                "Gmail returned {status}: {body}"
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| PipelineError::InvalidResponse(format!("Gmail response: {e}")))
    }

    async fn fetch_attachment(&self, message_id: &str, attachment_id: &str) -> Result<Vec<u8>> {
        let url = format!("{GMAIL_API_BASE}/messages/{message_id}/attachments/{attachment_id}");
        let body: AttachmentBody = self.get_json(&url).await?;
        let data = body.data.ok_or_else(|| {
            PipelineError::InvalidResponse("attachment body carried no data".to_string())
        })?;
        decode_gmail_base64(&data)
    }

    /// Collects one submission for the message body (plain text preferred,
    /// HTML stripped to text as a fallback) and one per attachment.
    async fn message_submissions(&self, message: &Message) -> Result<Vec<RawSubmission>> {
        let Some(payload) = &message.payload else {
            return Ok(Vec::new());
        };

        let received_at = message
            .internal_date
            .as_deref()
            .and_then(parse_internal_date)
            .unwrap_or_else(Utc::now);
        let sender = header_value(payload, "From").map(extract_address);

        let mut flattened = Vec::new();
        flatten_parts(payload, &mut flattened);

        let mut submissions = Vec::new();

        if let Some(text) = body_text(&flattened)? {
            submissions.push(submission_at(
                RawContent::Text(text),
                sender.clone(),
                received_at,
            ));
        }

        for part in &flattened {
            let Some(body) = &part.body else { continue };
            let Some(attachment_id) = &body.attachment_id else {
                continue;
            };
            if part.filename.is_empty() {
                continue;
            }

            let bytes = self.fetch_attachment(&message.id, attachment_id).await?;
            debug!(
                "Fetched attachment '{}' ({} bytes, {})",
                part.filename,
                bytes.len(),
                part.mime_type
            );
            submissions.push(submission_at(
                RawContent::Document {
                    data: STANDARD.encode(&bytes),
                    mime_type: part.mime_type.clone(),
                },
                sender.clone(),
                received_at,
            ));
        }

        Ok(submissions)
    }
}

#[async_trait]
impl MailSource for GmailConnector {
    async fn fetch(&self, query: &RetrievalQuery) -> Result<Vec<RawSubmission>> {
        let mut url = format!(
            "{GMAIL_API_BASE}/messages?maxResults={}",
            query.max_results
        );
        if let Some(sender) = &query.from_sender {
            url.push_str(&format!("&q=from:{sender}"));
        }

        let list: MessageList = self.get_json(&url).await?;
        info!("Gmail listed {} messages", list.messages.len());

        let mut submissions = Vec::new();
        for message_ref in &list.messages {
            let url = format!("{GMAIL_API_BASE}/messages/{}?format=full", message_ref.id);
            let message: Message = match self.get_json(&url).await {
                Ok(message) => message,
                Err(e) => {
                    // One unreadable message should not sink the whole fetch.
                    warn!("Skipping Gmail message {}: {}", message_ref.id, e);
                    continue;
                }
            };

            let mut from_message = self.message_submissions(&message).await?;
            if query.attachments_only {
                from_message.retain(|s| matches!(s.content, RawContent::Document { .. }));
            }
            submissions.append(&mut from_message);
        }

        Ok(submissions)
    }
}

fn submission_at(
    content: RawContent,
    source_email: Option<String>,
    received_at: DateTime<Utc>,
) -> RawSubmission {
    let mut submission = RawSubmission::new(content, source_email);
    submission.received_at = received_at;
    submission
}

/// Gmail encodes bodies as URL-safe base64, sometimes with padding.
fn decode_gmail_base64(data: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(data.trim_end_matches('='))
        .map_err(|e| PipelineError::Decode(format!("invalid Gmail base64 payload: {e}")))
}

fn parse_internal_date(millis: &str) -> Option<DateTime<Utc>> {
    let millis: i64 = millis.parse().ok()?;
    Utc.timestamp_millis_opt(millis).single()
}

fn header_value(part: &MessagePart, name: &str) -> Option<String> {
    part.headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.clone())
}

/// `"Jane Doe <jane@example.com>"` -> `jane@example.com`.
fn extract_address(from: String) -> String {
    match (from.find('<'), from.rfind('>')) {
        (Some(start), Some(end)) if start < end => from[start + 1..end].to_string(),
        _ => from.trim().to_string(),
    }
}

fn flatten_parts<'a>(part: &'a MessagePart, out: &mut Vec<&'a MessagePart>) {
    out.push(part);
    for child in &part.parts {
        flatten_parts(child, out);
    }
}

/// Plain-text body when present, otherwise HTML reduced to its text content.
fn body_text(parts: &[&MessagePart]) -> Result<Option<String>> {
    let decode_part = |part: &MessagePart| -> Result<Option<String>> {
        let Some(data) = part.body.as_ref().and_then(|b| b.data.as_deref()) else {
            return Ok(None);
        };
        let bytes = decode_gmail_base64(data)?;
        let text = String::from_utf8(bytes)
            .map_err(|e| PipelineError::Decode(format!("message body is not UTF-8: {e}")))?;
        Ok(Some(text))
    };

    for part in parts {
        if part.mime_type == "text/plain" {
            if let Some(text) = decode_part(part)? {
                if !text.trim().is_empty() {
                    return Ok(Some(text));
                }
            }
        }
    }

    for part in parts {
        if part.mime_type == "text/html" {
            if let Some(html) = decode_part(part)? {
                let text = html_to_text(&html);
                if !text.trim().is_empty() {
                    return Ok(Some(text));
                }
            }
        }
    }

    Ok(None)
}

fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    document
        .root_element()
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
