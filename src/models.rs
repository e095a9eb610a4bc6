use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One unit of raw input: an email body as plain text, or an encoded
/// document (attachment) tagged with its MIME type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawContent {
    Text(String),
    Document {
        /// Standard base64-encoded bytes.
        data: String,
        mime_type: String,
    },
}

/// Unprocessed submission as received from a caller or a mail source.
/// Immutable once created; downstream records reference it by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSubmission {
    pub id: String,
    pub content: RawContent,
    pub source_email: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl RawSubmission {
    pub fn new(content: RawContent, source_email: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content,
            source_email,
            received_at: Utc::now(),
        }
    }
}

/// The six contact fields the extraction backend targets.
/// Every field is independently optional; a backend must leave a field
/// empty rather than invent a value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactFields {
    pub name: Option<String>,
    pub company: Option<String>,
    pub designation: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub linkedin_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    Complete,
    Partial,
}

impl ExtractionStatus {
    /// Pure function of the fields: `Complete` iff name, company, and at
    /// least one contact handle (phone, email, or LinkedIn) are present.
    pub fn for_fields(fields: &ContactFields) -> Self {
        let has_handle =
            fields.phone.is_some() || fields.email.is_some() || fields.linkedin_url.is_some();
        if fields.name.is_some() && fields.company.is_some() && has_handle {
            ExtractionStatus::Complete
        } else {
            ExtractionStatus::Partial
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionStatus::Complete => "complete",
            ExtractionStatus::Partial => "partial",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "complete" => Some(ExtractionStatus::Complete),
            "partial" => Some(ExtractionStatus::Partial),
            _ => None,
        }
    }
}

/// Structured result of running the field extractor over one submission.
/// Created once; a re-extraction creates a new record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedProfile {
    pub id: String,
    pub submission_id: String,
    #[serde(flatten)]
    pub fields: ContactFields,
    pub extraction_status: ExtractionStatus,
    /// Normalized input text, kept for manual inspection of partial results.
    pub raw_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ExtractedProfile {
    /// The only constructor: `extraction_status` is always recomputed from
    /// the fields, never hand-set.
    pub fn new(submission_id: &str, fields: ContactFields, raw_text: Option<String>) -> Self {
        let extraction_status = ExtractionStatus::for_fields(&fields);
        Self {
            id: Uuid::new_v4().to_string(),
            submission_id: submission_id.to_string(),
            fields,
            extraction_status,
            raw_text,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Deliverability {
    Deliverable,
    Undeliverable,
    Risky,
}

impl Deliverability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Deliverability::Deliverable => "DELIVERABLE",
            Deliverability::Undeliverable => "UNDELIVERABLE",
            Deliverability::Risky => "RISKY",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DELIVERABLE" => Some(Deliverability::Deliverable),
            "UNDELIVERABLE" => Some(Deliverability::Undeliverable),
            "RISKY" => Some(Deliverability::Risky),
            _ => None,
        }
    }
}

/// Heuristic deliverability and domain-match score for one profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub id: String,
    pub profile_id: String,
    /// Clamped to [0.0, 1.0].
    pub score: f64,
    pub domain_match: bool,
    pub deliverability: Deliverability,
    /// Ordered, append-only trail of every sub-step's explanation.
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl VerificationResult {
    pub fn new(
        profile_id: &str,
        score: f64,
        domain_match: bool,
        deliverability: Deliverability,
        reason: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            profile_id: profile_id.to_string(),
            score: score.clamp(0.0, 1.0),
            domain_match,
            deliverability,
            reason,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkedInStatus {
    Verified,
    CompanyMismatch,
    ProfileNotFound,
    ApiLimitReached,
    Error,
}

impl LinkedInStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkedInStatus::Verified => "verified",
            LinkedInStatus::CompanyMismatch => "company_mismatch",
            LinkedInStatus::ProfileNotFound => "profile_not_found",
            LinkedInStatus::ApiLimitReached => "api_limit_reached",
            LinkedInStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "verified" => Some(LinkedInStatus::Verified),
            "company_mismatch" => Some(LinkedInStatus::CompanyMismatch),
            "profile_not_found" => Some(LinkedInStatus::ProfileNotFound),
            "api_limit_reached" => Some(LinkedInStatus::ApiLimitReached),
            "error" => Some(LinkedInStatus::Error),
            _ => None,
        }
    }
}

/// Outcome of checking a claimed company against an external profile's
/// employment history. A retry creates a new record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedInVerification {
    pub id: String,
    pub profile_id: String,
    pub status: LinkedInStatus,
    pub message: String,
    pub resolved_profile_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LinkedInVerification {
    pub fn new(
        profile_id: &str,
        status: LinkedInStatus,
        message: String,
        resolved_profile_url: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            profile_id: profile_id.to_string(),
            status,
            message,
            resolved_profile_url,
            created_at: Utc::now(),
        }
    }
}

/// A profile promoted as trustworthy, either by the automatic threshold or
/// by a reviewer. Never mutated, never deleted by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedProfile {
    pub id: String,
    pub profile_id: String,
    #[serde(flatten)]
    pub fields: ContactFields,
    pub verified: bool,
    pub verification_details: String,
    pub promoted_at: DateTime<Utc>,
}

impl VerifiedProfile {
    pub fn from_profile(profile: &ExtractedProfile, verification_details: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            profile_id: profile.id.clone(),
            fields: profile.fields.clone(),
            verified: true,
            verification_details,
            promoted_at: Utc::now(),
        }
    }
}

/// One recorded pipeline failure, shown on the admin surface until the
/// failure report clears it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationFailure {
    pub id: String,
    /// What the failure relates to: a sender address or a submission id.
    pub source: String,
    pub error: String,
    pub created_at: DateTime<Utc>,
}

impl ValidationFailure {
    pub fn new(source: String, error: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source,
            error,
            created_at: Utc::now(),
        }
    }
}
