use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::models::RawContent;
use crate::services::TextUnderstanding;

/// Well-formed but empty input normalizes to this sentinel rather than
/// failing; downstream stages treat it as a valid-but-empty target.
pub const EMPTY_CONTENT_SENTINEL: &str = "No content provided.";

/// Binary document types the pipeline accepts. Text extraction for these is
/// delegated to the text-understanding backend.
const SUPPORTED_DOCUMENT_TYPES: [&str; 3] = [
    "application/pdf",
    "application/msword",
    "application/vnd.ms-excel",
];

/// Converts a raw submission body into a single plain-text string.
pub struct ContentNormalizer {
    backend: Arc<dyn TextUnderstanding>,
}

impl ContentNormalizer {
    pub fn new(backend: Arc<dyn TextUnderstanding>) -> Self {
        Self { backend }
    }

    pub async fn normalize(&self, content: &RawContent) -> Result<String> {
        match content {
            RawContent::Text(text) => Ok(sentinel_if_empty(text)),
            RawContent::Document { data, mime_type } => {
                let bytes = STANDARD
                    .decode(data.trim())
                    .map_err(|e| PipelineError::Decode(format!("invalid base64 payload: {e}")))?;

                // Parameters like "; charset=utf-8" are not part of the type.
                let media_type = mime_type
                    .split(';')
                    .next()
                    .unwrap_or(mime_type)
                    .trim()
                    .to_ascii_lowercase();

                if media_type.starts_with("text/") {
                    let text = String::from_utf8(bytes).map_err(|e| {
                        PipelineError::Decode(format!("{media_type} payload is not UTF-8: {e}"))
                    })?;
                    return Ok(sentinel_if_empty(&text));
                }

                if SUPPORTED_DOCUMENT_TYPES.contains(&media_type.as_str()) {
                    debug!("Delegating {} document to extraction backend", media_type);
                    let text = self.backend.document_text(&bytes, &media_type).await?;
                    return Ok(sentinel_if_empty(&text));
                }

                // Never silently drop content: name the offending type.
                Err(PipelineError::UnsupportedFormat(mime_type.clone()))
            }
        }
    }
}

fn sentinel_if_empty(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        EMPTY_CONTENT_SENTINEL.to_string()
    } else {
        trimmed.to_string()
    }
}
