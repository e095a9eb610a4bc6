use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use tracing::debug;

use crate::database::DbPool;
use crate::error::Result;
use crate::models::{
    ContactFields, Deliverability, ExtractedProfile, ExtractionStatus, LinkedInStatus,
    LinkedInVerification, RawContent, RawSubmission, ValidationFailure, VerificationResult,
    VerifiedProfile,
};

/// Append-and-read storage boundary for every pipeline record.
///
/// No record created through this trait is ever updated in place; a retry or
/// a re-extraction appends a new row. `clear_validation_failures` is the one
/// destructive operation, tied to the failure report (failures not archived
/// before a report are permanently gone).
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn insert_submission(&self, submission: &RawSubmission) -> Result<()>;
    async fn list_submissions(&self, limit: usize, offset: usize) -> Result<Vec<RawSubmission>>;

    async fn insert_profile(&self, profile: &ExtractedProfile) -> Result<()>;
    async fn get_profile(&self, id: &str) -> Result<Option<ExtractedProfile>>;
    async fn list_profiles(&self, status: Option<ExtractionStatus>)
        -> Result<Vec<ExtractedProfile>>;

    async fn insert_verification(&self, result: &VerificationResult) -> Result<()>;
    async fn list_verifications(&self) -> Result<Vec<VerificationResult>>;

    async fn insert_linkedin_verification(&self, verification: &LinkedInVerification)
        -> Result<()>;
    async fn list_linkedin_verifications(&self) -> Result<Vec<LinkedInVerification>>;

    async fn insert_verified_profile(&self, profile: &VerifiedProfile) -> Result<()>;
    async fn find_verified_by_profile(&self, profile_id: &str) -> Result<Option<VerifiedProfile>>;
    async fn list_verified_profiles(&self) -> Result<Vec<VerifiedProfile>>;

    async fn insert_validation_failure(&self, failure: &ValidationFailure) -> Result<()>;
    async fn list_validation_failures(&self) -> Result<Vec<ValidationFailure>>;
    async fn clear_validation_failures(&self) -> Result<()>;
}

/// SQLite-backed store over the shared connection pool.
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_timestamp(idx: usize, value: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            rusqlite::Error::InvalidColumnType(idx, value, rusqlite::types::Type::Text)
        })
}

fn get_optional_string(row: &Row<'_>, idx: usize) -> Option<String> {
    match row.get::<_, Option<String>>(idx) {
        Ok(Some(s)) if !s.is_empty() => Some(s),
        _ => None,
    }
}

fn submission_from_row(row: &Row<'_>) -> rusqlite::Result<RawSubmission> {
    let content_kind: String = row.get(1)?;
    let content_value: String = row.get(2)?;
    let content = if content_kind == "document" {
        RawContent::Document {
            data: content_value,
            mime_type: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        }
    } else {
        RawContent::Text(content_value)
    };

    Ok(RawSubmission {
        id: row.get(0)?,
        content,
        source_email: get_optional_string(row, 4),
        received_at: parse_timestamp(5, row.get(5)?)?,
    })
}

fn fields_from_row(row: &Row<'_>, start: usize) -> ContactFields {
    ContactFields {
        name: get_optional_string(row, start),
        company: get_optional_string(row, start + 1),
        designation: get_optional_string(row, start + 2),
        phone: get_optional_string(row, start + 3),
        email: get_optional_string(row, start + 4),
        linkedin_url: get_optional_string(row, start + 5),
    }
}

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<ExtractedProfile> {
    let status_str: String = row.get(8)?;
    let extraction_status = ExtractionStatus::parse(&status_str).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(8, status_str, rusqlite::types::Type::Text)
    })?;

    Ok(ExtractedProfile {
        id: row.get(0)?,
        submission_id: row.get(1)?,
        fields: fields_from_row(row, 2),
        extraction_status,
        raw_text: get_optional_string(row, 9),
        created_at: parse_timestamp(10, row.get(10)?)?,
    })
}

fn verification_from_row(row: &Row<'_>) -> rusqlite::Result<VerificationResult> {
    let deliverability_str: String = row.get(4)?;
    let deliverability = Deliverability::parse(&deliverability_str).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(4, deliverability_str, rusqlite::types::Type::Text)
    })?;

    Ok(VerificationResult {
        id: row.get(0)?,
        profile_id: row.get(1)?,
        score: row.get(2)?,
        domain_match: row.get(3)?,
        deliverability,
        reason: row.get(5)?,
        created_at: parse_timestamp(6, row.get(6)?)?,
    })
}

fn linkedin_from_row(row: &Row<'_>) -> rusqlite::Result<LinkedInVerification> {
    let status_str: String = row.get(2)?;
    let status = LinkedInStatus::parse(&status_str).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(2, status_str, rusqlite::types::Type::Text)
    })?;

    Ok(LinkedInVerification {
        id: row.get(0)?,
        profile_id: row.get(1)?,
        status,
        message: row.get(3)?,
        resolved_profile_url: get_optional_string(row, 4),
        created_at: parse_timestamp(5, row.get(5)?)?,
    })
}

fn verified_from_row(row: &Row<'_>) -> rusqlite::Result<VerifiedProfile> {
    Ok(VerifiedProfile {
        id: row.get(0)?,
        profile_id: row.get(1)?,
        fields: fields_from_row(row, 2),
        verified: true,
        verification_details: row.get(8)?,
        promoted_at: parse_timestamp(9, row.get(9)?)?,
    })
}

fn failure_from_row(row: &Row<'_>) -> rusqlite::Result<ValidationFailure> {
    Ok(ValidationFailure {
        id: row.get(0)?,
        source: row.get(1)?,
        error: row.get(2)?,
        created_at: parse_timestamp(3, row.get(3)?)?,
    })
}

#[async_trait]
impl ProfileStore for SqliteStore {
    async fn insert_submission(&self, submission: &RawSubmission) -> Result<()> {
        debug!("Storing submission {}", submission.id);
        let conn = self.pool.get().await?;

        let (kind, content, mime_type) = match &submission.content {
            RawContent::Text(text) => ("text", text.clone(), None),
            RawContent::Document { data, mime_type } => {
                ("document", data.clone(), Some(mime_type.clone()))
            }
        };

        conn.execute(
            r#"
            INSERT INTO submissions (id, content_kind, content, mime_type, source_email, received_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                submission.id,
                kind,
                content,
                mime_type,
                submission.source_email,
                submission.received_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn list_submissions(&self, limit: usize, offset: usize) -> Result<Vec<RawSubmission>> {
        let conn = self.pool.get().await?;
        let mut stmt = conn.prepare(
            "SELECT id, content_kind, content, mime_type, source_email, received_at
             FROM submissions ORDER BY received_at DESC LIMIT ?1 OFFSET ?2",
        )?;
        let rows = stmt.query_map(params![limit as i64, offset as i64], submission_from_row)?;

        let mut submissions = Vec::new();
        for row in rows {
            submissions.push(row?);
        }
        Ok(submissions)
    }

    async fn insert_profile(&self, profile: &ExtractedProfile) -> Result<()> {
        debug!("Storing extracted profile {}", profile.id);
        let conn = self.pool.get().await?;
        conn.execute(
            r#"
            INSERT INTO extracted_profiles (
                id, submission_id, name, company, designation, phone, email,
                linkedin_url, extraction_status, raw_text, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                profile.id,
                profile.submission_id,
                profile.fields.name,
                profile.fields.company,
                profile.fields.designation,
                profile.fields.phone,
                profile.fields.email,
                profile.fields.linkedin_url,
                profile.extraction_status.as_str(),
                profile.raw_text,
                profile.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn get_profile(&self, id: &str) -> Result<Option<ExtractedProfile>> {
        let conn = self.pool.get().await?;
        let mut stmt = conn.prepare(
            "SELECT id, submission_id, name, company, designation, phone, email,
                    linkedin_url, extraction_status, raw_text, created_at
             FROM extracted_profiles WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map([id], profile_from_row)?;
        match rows.next() {
            Some(profile) => Ok(Some(profile?)),
            None => Ok(None),
        }
    }

    async fn list_profiles(
        &self,
        status: Option<ExtractionStatus>,
    ) -> Result<Vec<ExtractedProfile>> {
        let conn = self.pool.get().await?;
        let base = "SELECT id, submission_id, name, company, designation, phone, email,
                           linkedin_url, extraction_status, raw_text, created_at
                    FROM extracted_profiles";

        let mut profiles = Vec::new();
        match status {
            Some(status) => {
                let query = format!("{base} WHERE extraction_status = ?1 ORDER BY created_at DESC");
                let mut stmt = conn.prepare(&query)?;
                let rows = stmt.query_map([status.as_str()], profile_from_row)?;
                for row in rows {
                    profiles.push(row?);
                }
            }
            None => {
                let query = format!("{base} ORDER BY created_at DESC");
                let mut stmt = conn.prepare(&query)?;
                let rows = stmt.query_map([], profile_from_row)?;
                for row in rows {
                    profiles.push(row?);
                }
            }
        }
        Ok(profiles)
    }

    async fn insert_verification(&self, result: &VerificationResult) -> Result<()> {
        debug!("Storing verification result for profile {}", result.profile_id);
        let conn = self.pool.get().await?;
        conn.execute(
            r#"
            INSERT INTO verification_results (
                id, profile_id, score, domain_match, deliverability, reason, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                result.id,
                result.profile_id,
                result.score,
                result.domain_match,
                result.deliverability.as_str(),
                result.reason,
                result.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn list_verifications(&self) -> Result<Vec<VerificationResult>> {
        let conn = self.pool.get().await?;
        let mut stmt = conn.prepare(
            "SELECT id, profile_id, score, domain_match, deliverability, reason, created_at
             FROM verification_results ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map([], verification_from_row)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    async fn insert_linkedin_verification(
        &self,
        verification: &LinkedInVerification,
    ) -> Result<()> {
        debug!(
            "Storing LinkedIn verification for profile {}",
            verification.profile_id
        );
        let conn = self.pool.get().await?;
        conn.execute(
            r#"
            INSERT INTO linkedin_verifications (
                id, profile_id, status, message, resolved_profile_url, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                verification.id,
                verification.profile_id,
                verification.status.as_str(),
                verification.message,
                verification.resolved_profile_url,
                verification.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn list_linkedin_verifications(&self) -> Result<Vec<LinkedInVerification>> {
        let conn = self.pool.get().await?;
        let mut stmt = conn.prepare(
            "SELECT id, profile_id, status, message, resolved_profile_url, created_at
             FROM linkedin_verifications ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map([], linkedin_from_row)?;

        let mut verifications = Vec::new();
        for row in rows {
            verifications.push(row?);
        }
        Ok(verifications)
    }

    async fn insert_verified_profile(&self, profile: &VerifiedProfile) -> Result<()> {
        debug!("Storing verified profile for {}", profile.profile_id);
        let conn = self.pool.get().await?;
        conn.execute(
            r#"
            INSERT INTO verified_profiles (
                id, profile_id, name, company, designation, phone, email,
                linkedin_url, verification_details, promoted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                profile.id,
                profile.profile_id,
                profile.fields.name,
                profile.fields.company,
                profile.fields.designation,
                profile.fields.phone,
                profile.fields.email,
                profile.fields.linkedin_url,
                profile.verification_details,
                profile.promoted_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn find_verified_by_profile(&self, profile_id: &str) -> Result<Option<VerifiedProfile>> {
        let conn = self.pool.get().await?;
        let mut stmt = conn.prepare(
            "SELECT id, profile_id, name, company, designation, phone, email,
                    linkedin_url, verification_details, promoted_at
             FROM verified_profiles WHERE profile_id = ?1",
        )?;
        let mut rows = stmt.query_map([profile_id], verified_from_row)?;
        match rows.next() {
            Some(profile) => Ok(Some(profile?)),
            None => Ok(None),
        }
    }

    async fn list_verified_profiles(&self) -> Result<Vec<VerifiedProfile>> {
        let conn = self.pool.get().await?;
        let mut stmt = conn.prepare(
            "SELECT id, profile_id, name, company, designation, phone, email,
                    linkedin_url, verification_details, promoted_at
             FROM verified_profiles ORDER BY promoted_at DESC",
        )?;
        let rows = stmt.query_map([], verified_from_row)?;

        let mut profiles = Vec::new();
        for row in rows {
            profiles.push(row?);
        }
        Ok(profiles)
    }

    async fn insert_validation_failure(&self, failure: &ValidationFailure) -> Result<()> {
        let conn = self.pool.get().await?;
        conn.execute(
            "INSERT INTO validation_failures (id, source, error, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                failure.id,
                failure.source,
                failure.error,
                failure.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn list_validation_failures(&self) -> Result<Vec<ValidationFailure>> {
        let conn = self.pool.get().await?;
        let mut stmt = conn.prepare(
            "SELECT id, source, error, created_at
             FROM validation_failures ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map([], failure_from_row)?;

        let mut failures = Vec::new();
        for row in rows {
            failures.push(row?);
        }
        Ok(failures)
    }

    async fn clear_validation_failures(&self) -> Result<()> {
        let conn = self.pool.get().await?;
        conn.execute("DELETE FROM validation_failures", [])?;
        Ok(())
    }
}

/// In-memory store used by pipeline tests; same append-only contract.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    submissions: std::sync::Mutex<Vec<RawSubmission>>,
    profiles: std::sync::Mutex<Vec<ExtractedProfile>>,
    verifications: std::sync::Mutex<Vec<VerificationResult>>,
    linkedin: std::sync::Mutex<Vec<LinkedInVerification>>,
    verified: std::sync::Mutex<Vec<VerifiedProfile>>,
    failures: std::sync::Mutex<Vec<ValidationFailure>>,
}

#[cfg(test)]
#[async_trait]
impl ProfileStore for MemoryStore {
    async fn insert_submission(&self, submission: &RawSubmission) -> Result<()> {
        self.submissions.lock().unwrap().push(submission.clone());
        Ok(())
    }

    async fn list_submissions(&self, limit: usize, offset: usize) -> Result<Vec<RawSubmission>> {
        Ok(self
            .submissions
            .lock()
            .unwrap()
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn insert_profile(&self, profile: &ExtractedProfile) -> Result<()> {
        self.profiles.lock().unwrap().push(profile.clone());
        Ok(())
    }

    async fn get_profile(&self, id: &str) -> Result<Option<ExtractedProfile>> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn list_profiles(
        &self,
        status: Option<ExtractionStatus>,
    ) -> Result<Vec<ExtractedProfile>> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .filter(|p| status.map_or(true, |s| p.extraction_status == s))
            .cloned()
            .collect())
    }

    async fn insert_verification(&self, result: &VerificationResult) -> Result<()> {
        self.verifications.lock().unwrap().push(result.clone());
        Ok(())
    }

    async fn list_verifications(&self) -> Result<Vec<VerificationResult>> {
        Ok(self.verifications.lock().unwrap().clone())
    }

    async fn insert_linkedin_verification(
        &self,
        verification: &LinkedInVerification,
    ) -> Result<()> {
        self.linkedin.lock().unwrap().push(verification.clone());
        Ok(())
    }

    async fn list_linkedin_verifications(&self) -> Result<Vec<LinkedInVerification>> {
        Ok(self.linkedin.lock().unwrap().clone())
    }

    async fn insert_verified_profile(&self, profile: &VerifiedProfile) -> Result<()> {
        let mut verified = self.verified.lock().unwrap();
        if verified.iter().any(|v| v.profile_id == profile.profile_id) {
            return Err(crate::error::PipelineError::Storage(format!(
                "profile {} already promoted",
                profile.profile_id
            )));
        }
        verified.push(profile.clone());
        Ok(())
    }

    async fn find_verified_by_profile(&self, profile_id: &str) -> Result<Option<VerifiedProfile>> {
        Ok(self
            .verified
            .lock()
            .unwrap()
            .iter()
            .find(|v| v.profile_id == profile_id)
            .cloned())
    }

    async fn list_verified_profiles(&self) -> Result<Vec<VerifiedProfile>> {
        Ok(self.verified.lock().unwrap().clone())
    }

    async fn insert_validation_failure(&self, failure: &ValidationFailure) -> Result<()> {
        self.failures.lock().unwrap().push(failure.clone());
        Ok(())
    }

    async fn list_validation_failures(&self) -> Result<Vec<ValidationFailure>> {
        Ok(self.failures.lock().unwrap().clone())
    }

    async fn clear_validation_failures(&self) -> Result<()> {
        self.failures.lock().unwrap().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::create_db_pool;
    use crate::models::RawContent;

    async fn temp_store() -> SqliteStore {
        let path = std::env::temp_dir().join(format!("pipeline-test-{}.db", uuid::Uuid::new_v4()));
        let pool = create_db_pool(path.to_str().unwrap()).await.unwrap();
        SqliteStore::new(pool)
    }

    #[tokio::test]
    async fn submission_round_trip() {
        let store = temp_store().await;
        let submission = RawSubmission::new(
            RawContent::Text("Name: Jane Doe".into()),
            Some("jane@example.com".into()),
        );
        store.insert_submission(&submission).await.unwrap();

        let listed = store.list_submissions(10, 0).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, submission.id);
        assert_eq!(listed[0].source_email.as_deref(), Some("jane@example.com"));
    }

    #[tokio::test]
    async fn profile_filter_by_status() {
        let store = temp_store().await;
        let complete = ExtractedProfile::new(
            "sub-1",
            ContactFields {
                name: Some("Jane Doe".into()),
                company: Some("ExampleCorp".into()),
                email: Some("jane@example.com".into()),
                ..Default::default()
            },
            None,
        );
        let partial = ExtractedProfile::new("sub-2", ContactFields::default(), None);
        store.insert_profile(&complete).await.unwrap();
        store.insert_profile(&partial).await.unwrap();

        let all = store.list_profiles(None).await.unwrap();
        assert_eq!(all.len(), 2);

        let only_partial = store
            .list_profiles(Some(ExtractionStatus::Partial))
            .await
            .unwrap();
        assert_eq!(only_partial.len(), 1);
        assert_eq!(only_partial[0].id, partial.id);

        let fetched = store.get_profile(&complete.id).await.unwrap().unwrap();
        assert_eq!(fetched.extraction_status, ExtractionStatus::Complete);
    }

    #[tokio::test]
    async fn verified_profile_unique_per_source_profile() {
        let store = temp_store().await;
        let profile = ExtractedProfile::new("sub-1", ContactFields::default(), None);
        let first = VerifiedProfile::from_profile(&profile, "approved".into());
        store.insert_verified_profile(&first).await.unwrap();

        let duplicate = VerifiedProfile::from_profile(&profile, "approved again".into());
        assert!(store.insert_verified_profile(&duplicate).await.is_err());

        let found = store
            .find_verified_by_profile(&profile.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, first.id);
    }

    #[tokio::test]
    async fn clearing_failures_is_destructive() {
        let store = temp_store().await;
        store
            .insert_validation_failure(&ValidationFailure::new(
                "jane@example.com".into(),
                "Service unavailable: timeout".into(),
            ))
            .await
            .unwrap();
        assert_eq!(store.list_validation_failures().await.unwrap().len(), 1);

        store.clear_validation_failures().await.unwrap();
        assert!(store.list_validation_failures().await.unwrap().is_empty());
    }
}
