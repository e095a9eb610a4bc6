use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::config::ServiceEndpoint;
use crate::error::{PipelineError, Result};
use crate::models::ContactFields;

/// Text-understanding backend: turns documents into text and text into the
/// fixed six-field contact schema. A backend must leave a field `None` when
/// the text gives no evidence for it; extraction accuracy depends on this
/// non-guessing contract.
#[async_trait]
pub trait TextUnderstanding: Send + Sync {
    async fn document_text(&self, data: &[u8], mime_type: &str) -> Result<String>;
    async fn extract_fields(&self, text: &str) -> Result<ContactFields>;
}

/// Hosted extraction service client. One attempt per call, no retries; the
/// orchestrator decides disposition of failures.
pub struct HttpExtractionService {
    client: Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct ExtractFieldsResponse {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    company: Option<String>,
    #[serde(default)]
    designation: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    linkedin_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DocumentTextResponse {
    text: String,
}

impl HttpExtractionService {
    pub fn new(endpoint: ServiceEndpoint, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: endpoint.base_url.trim_end_matches('/').to_string(),
            token: endpoint.token,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl TextUnderstanding for HttpExtractionService {
    async fn document_text(&self, data: &[u8], mime_type: &str) -> Result<String> {
        use base64::{engine::general_purpose::STANDARD, Engine as _};

        let response = self
            .client
            .post(format!("{}/v1/document-text", self.base_url))
            .bearer_auth(&self.token)
            .json(&json!({
                "data": STANDARD.encode(data),
                "mime_type": mime_type,
            }))
            .send()
            .await
            .map_err(|e| PipelineError::ServiceUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PipelineError::ServiceUnavailable(format!(
                "document-text returned HTTP {}",
                response.status()
            )));
        }

        let body: DocumentTextResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::InvalidResponse(e.to_string()))?;
        Ok(body.text)
    }

    async fn extract_fields(&self, text: &str) -> Result<ContactFields> {
        debug!("Requesting field extraction ({} chars)", text.len());

        let response = self
            .client
            .post(format!("{}/v1/extract", self.base_url))
            .bearer_auth(&self.token)
            .json(&json!({
                "text": text,
                "schema": ["name", "company", "designation", "phone", "email", "linkedin_url"],
                "instructions": "Return null for any field the text does not support. Never guess.",
            }))
            .send()
            .await
            .map_err(|e| PipelineError::ServiceUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PipelineError::ServiceUnavailable(format!(
                "extract returned HTTP {}",
                response.status()
            )));
        }

        let body: ExtractFieldsResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::InvalidResponse(e.to_string()))?;

        // Any extra field the backend returns is dropped at this boundary by
        // the fixed response shape; empty strings collapse to None.
        Ok(ContactFields {
            name: non_empty(body.name),
            company: non_empty(body.company),
            designation: non_empty(body.designation),
            phone: non_empty(body.phone),
            email: non_empty(body.email),
            linkedin_url: non_empty(body.linkedin_url),
        })
    }
}

/// Offline extraction backend over label-prefixed lines
/// (`Name: ...`, `Company: ...`). Used when no extraction service is
/// configured, and as the deterministic backend in tests. It honors the
/// non-guessing contract by construction: no label, no value.
pub struct RegexExtractor {
    name: Regex,
    company: Regex,
    designation: Regex,
    phone: Regex,
    labelled_email: Regex,
    email: Regex,
    linkedin: Regex,
}

impl RegexExtractor {
    pub fn new() -> Self {
        Self {
            name: Regex::new(r"(?im)(?:full name|full_name|name)[: \t]+([A-Za-z .'\-]+)").unwrap(),
            company: Regex::new(r"(?im)(?:company|organization)[: \t]+([A-Za-z0-9 .,'\-]+)")
                .unwrap(),
            designation: Regex::new(
                r"(?im)(?:designation|job title|job_title|title)[: \t]+([A-Za-z \-]+)",
            )
            .unwrap(),
            phone: Regex::new(r"(?im)(?:phone|mobile|tel)[: \t]*([0-9 ().+\-]+)").unwrap(),
            labelled_email: Regex::new(
                r"(?im)(?:e-?mail)[: \t]+([A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,})",
            )
            .unwrap(),
            email: Regex::new(r"\b[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}\b").unwrap(),
            linkedin: Regex::new(r"(?i)https?://(?:www\.)?linkedin\.com/in/[A-Za-z0-9_\-]+")
                .unwrap(),
        }
    }

    fn capture(&self, regex: &Regex, text: &str) -> Option<String> {
        regex
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

impl Default for RegexExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextUnderstanding for RegexExtractor {
    async fn document_text(&self, _data: &[u8], mime_type: &str) -> Result<String> {
        Err(PipelineError::ServiceUnavailable(format!(
            "document text extraction for {mime_type} requires a configured extraction service"
        )))
    }

    async fn extract_fields(&self, text: &str) -> Result<ContactFields> {
        // Prefer an explicitly labelled address; a bare address anywhere in
        // the body (e.g. a From header) is only a fallback.
        let email = self
            .capture(&self.labelled_email, text)
            .map(|e| e.to_lowercase())
            .or_else(|| self.email.find(text).map(|m| m.as_str().to_lowercase()));
        let linkedin_url = self.linkedin.find(text).map(|m| m.as_str().to_string());

        Ok(ContactFields {
            name: self.capture(&self.name, text),
            company: self.capture(&self.company, text),
            designation: self.capture(&self.designation, text),
            phone: self
                .capture(&self.phone, text)
                .filter(|p| p.chars().filter(char::is_ascii_digit).count() >= 7),
            email,
            linkedin_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_EMAIL: &str = "From: test@example.com\n\
        Subject: Portfolio Submission\n\n\
        Name: Jane Doe\n\
        Email: jane.doe@example.com\n\
        Company: ExampleCorp\n\
        Designation: Staff Engineer\n\
        Phone: +1 (415) 555-0100\n\
        LinkedIn: https://linkedin.com/in/janedoe";

    #[tokio::test]
    async fn regex_extractor_reads_labelled_fields() {
        let extractor = RegexExtractor::new();
        let fields = extractor.extract_fields(SAMPLE_EMAIL).await.unwrap();

        assert_eq!(fields.name.as_deref(), Some("Jane Doe"));
        assert_eq!(fields.company.as_deref(), Some("ExampleCorp"));
        assert_eq!(fields.designation.as_deref(), Some("Staff Engineer"));
        assert_eq!(fields.email.as_deref(), Some("jane.doe@example.com"));
        assert_eq!(
            fields.linkedin_url.as_deref(),
            Some("https://linkedin.com/in/janedoe")
        );
        assert!(fields.phone.is_some());
    }

    #[tokio::test]
    async fn regex_extractor_leaves_absent_fields_null() {
        let extractor = RegexExtractor::new();
        let fields = extractor
            .extract_fields("Just a short note with nothing in it.")
            .await
            .unwrap();

        assert!(fields.name.is_none());
        assert!(fields.company.is_none());
        assert!(fields.designation.is_none());
        assert!(fields.phone.is_none());
        assert!(fields.email.is_none());
        assert!(fields.linkedin_url.is_none());
    }

    #[tokio::test]
    async fn regex_extractor_cannot_read_documents() {
        let extractor = RegexExtractor::new();
        let err = extractor
            .document_text(b"%PDF-1.4", "application/pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::ServiceUnavailable(_)));
    }
}
