use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::models::ExtractedProfile;
use crate::services::TextUnderstanding;

/// Turns normalized text into an `ExtractedProfile` via the configured
/// text-understanding backend. Pure transformation: persistence is the
/// orchestrator's job. One attempt per call; the orchestrator decides what
/// to do with a failure.
pub struct FieldExtractor {
    backend: Arc<dyn TextUnderstanding>,
}

impl FieldExtractor {
    pub fn new(backend: Arc<dyn TextUnderstanding>) -> Self {
        Self { backend }
    }

    pub async fn extract(&self, submission_id: &str, text: &str) -> Result<ExtractedProfile> {
        let fields = self.backend.extract_fields(text).await?;
        let profile = ExtractedProfile::new(submission_id, fields, Some(text.to_string()));
        debug!(
            "Extracted profile {} for submission {} ({})",
            profile.id,
            submission_id,
            profile.extraction_status.as_str()
        );
        Ok(profile)
    }
}
