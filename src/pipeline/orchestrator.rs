use std::sync::Arc;
use tracing::{error, info};

use crate::config::PromotionRule;
use crate::error::{PipelineError, Result};
use crate::models::{ExtractedProfile, RawSubmission, ValidationFailure, VerifiedProfile};
use crate::pipeline::{ContentNormalizer, DeliverabilityScorer, FieldExtractor, SocialProfileVerifier};
use crate::store::ProfileStore;

/// Sequences the pipeline for one submission: persist, normalize, extract,
/// return the profile to the caller, then verify and score in a detached
/// task. Each stage hands off an immutable record; nothing here is shared
/// for mutation across concurrent submissions.
pub struct Orchestrator {
    store: Arc<dyn ProfileStore>,
    normalizer: ContentNormalizer,
    extractor: FieldExtractor,
    /// None when no profile-lookup service is configured.
    verifier: Option<SocialProfileVerifier>,
    scorer: DeliverabilityScorer,
    promotion_rule: PromotionRule,
    linkedin_enabled: bool,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn ProfileStore>,
        normalizer: ContentNormalizer,
        extractor: FieldExtractor,
        verifier: Option<SocialProfileVerifier>,
        scorer: DeliverabilityScorer,
        promotion_rule: PromotionRule,
        linkedin_enabled: bool,
    ) -> Self {
        Self {
            store,
            normalizer,
            extractor,
            verifier,
            scorer,
            promotion_rule,
            linkedin_enabled,
        }
    }

    /// Runs the synchronous half of the pipeline and kicks off the
    /// verification continuation. The returned profile is already persisted;
    /// the caller does not wait on scoring or LinkedIn verification.
    pub async fn process(self: &Arc<Self>, raw: RawSubmission) -> Result<ExtractedProfile> {
        self.store.insert_submission(&raw).await?;

        let source = raw
            .source_email
            .clone()
            .unwrap_or_else(|| raw.id.clone());

        let text = match self.normalizer.normalize(&raw.content).await {
            Ok(text) => text,
            Err(e) => {
                self.record_failure(&source, &e).await;
                return Err(e);
            }
        };

        let profile = match self.extractor.extract(&raw.id, &text).await {
            Ok(profile) => profile,
            Err(e) => {
                // Extraction failure still surfaces a partial profile with
                // the raw text preserved for manual inspection; the failure
                // itself is recorded for the admin surface.
                self.record_failure(&source, &e).await;
                ExtractedProfile::new(&raw.id, Default::default(), Some(text))
            }
        };

        self.store.insert_profile(&profile).await?;
        info!(
            "Extracted profile {} from submission {} ({})",
            profile.id,
            raw.id,
            profile.extraction_status.as_str()
        );

        // Fire-and-forget continuation with its own error channel: failures
        // are logged and recorded, never lost in an unobserved task.
        let this = Arc::clone(self);
        let spawned = profile.clone();
        tokio::spawn(async move {
            this.run_verification(spawned).await;
        });

        Ok(profile)
    }

    pub(crate) async fn run_verification(&self, profile: ExtractedProfile) {
        let profile_id = profile.id.clone();
        if let Err(e) = self.verify_and_promote(&profile).await {
            error!("Verification stage failed for profile {}: {}", profile_id, e);
            let source = profile
                .fields
                .email
                .clone()
                .unwrap_or_else(|| profile_id.clone());
            self.record_failure(&source, &e).await;
        }
    }

    /// Internally sequential: score first, then (optionally) LinkedIn, then
    /// the promotion decision.
    pub(crate) async fn verify_and_promote(&self, profile: &ExtractedProfile) -> Result<()> {
        let result = self
            .scorer
            .score(
                &profile.id,
                profile.fields.email.as_deref(),
                profile.fields.company.as_deref(),
            )
            .await;
        self.store.insert_verification(&result).await?;

        if self.linkedin_enabled {
            if let (Some(verifier), Some(url), Some(company)) = (
                self.verifier.as_ref(),
                profile.fields.linkedin_url.as_deref(),
                profile.fields.company.as_deref(),
            ) {
                let verification = verifier.verify(&profile.id, url, company).await;
                self.store
                    .insert_linkedin_verification(&verification)
                    .await?;
            }
        }

        if self
            .promotion_rule
            .satisfied_by(result.domain_match, result.deliverability)
        {
            let details = format!(
                "Auto-promoted (score {:.2}). {}",
                result.score, result.reason
            );
            let verified = self.promote(profile, details).await?;
            info!(
                "Profile {} auto-promoted to verified profile {}",
                profile.id, verified.id
            );
        }

        Ok(())
    }

    /// Manual approval path. Idempotent: approving an already-verified
    /// profile returns the existing record and creates nothing.
    pub async fn approve(&self, profile_id: &str) -> Result<VerifiedProfile> {
        let profile = self
            .store
            .get_profile(profile_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("profile {profile_id}")))?;

        self.promote(&profile, "Manually approved by reviewer.".to_string())
            .await
    }

    async fn promote(
        &self,
        profile: &ExtractedProfile,
        verification_details: String,
    ) -> Result<VerifiedProfile> {
        if let Some(existing) = self.store.find_verified_by_profile(&profile.id).await? {
            return Ok(existing);
        }

        let verified = VerifiedProfile::from_profile(profile, verification_details);
        self.store.insert_verified_profile(&verified).await?;
        Ok(verified)
    }

    async fn record_failure(&self, source: &str, error: &PipelineError) {
        let failure = ValidationFailure::new(source.to_string(), error.to_string());
        if let Err(store_err) = self.store.insert_validation_failure(&failure).await {
            error!("Failed to record validation failure: {}", store_err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PromotionRule;
    use crate::models::{Deliverability, ExtractionStatus, LinkedInStatus, RawContent};
    use crate::services::{RegexExtractor, SandboxDeliverability};
    use crate::services::{Employment, LookupProfile, ProfileLookup};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::time::Duration;

    struct AcmeLookup;

    #[async_trait]
    impl ProfileLookup for AcmeLookup {
        async fn lookup(&self, username: &str) -> crate::error::Result<Vec<LookupProfile>> {
            Ok(vec![LookupProfile {
                profile_url: format!("https://www.linkedin.com/in/{username}"),
                employment: vec![Employment {
                    company: "Acme Corp".to_string(),
                    title: None,
                }],
            }])
        }
    }

    fn orchestrator(
        store: Arc<MemoryStore>,
        rule: PromotionRule,
        linkedin: bool,
    ) -> Arc<Orchestrator> {
        let backend = Arc::new(RegexExtractor::new());
        Arc::new(Orchestrator::new(
            store,
            ContentNormalizer::new(backend.clone()),
            FieldExtractor::new(backend),
            Some(SocialProfileVerifier::new(Arc::new(AcmeLookup))),
            DeliverabilityScorer::new(Arc::new(SandboxDeliverability)),
            rule,
            linkedin,
        ))
    }

    async fn wait_for_verification(store: &MemoryStore) {
        for _ in 0..100 {
            if !store.list_verifications().await.unwrap().is_empty() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("verification continuation never ran");
    }

    #[tokio::test]
    async fn process_persists_submission_and_profile_before_returning() {
        let store = Arc::new(MemoryStore::default());
        let orch = orchestrator(store.clone(), PromotionRule::Disabled, false);

        let raw = RawSubmission::new(
            RawContent::Text(
                "Name: Jane Doe\nCompany: Acme Corp\nEmail: jane@acmecorp.com".into(),
            ),
            Some("jane@acmecorp.com".into()),
        );
        let profile = orch.process(raw.clone()).await.unwrap();

        assert_eq!(profile.extraction_status, ExtractionStatus::Complete);
        assert_eq!(store.list_submissions(10, 0).await.unwrap().len(), 1);
        assert_eq!(store.list_profiles(None).await.unwrap().len(), 1);

        wait_for_verification(&store).await;
        let verifications = store.list_verifications().await.unwrap();
        assert_eq!(verifications[0].profile_id, profile.id);
    }

    #[tokio::test]
    async fn continuation_scores_verifies_and_promotes() {
        let store = Arc::new(MemoryStore::default());
        let orch = orchestrator(store.clone(), PromotionRule::AnySignal, true);

        let profile = ExtractedProfile::new(
            "sub-1",
            crate::models::ContactFields {
                name: Some("Jane Doe".into()),
                company: Some("Acme Corp".into()),
                email: Some("jane@acmecorp.com".into()),
                linkedin_url: Some("https://linkedin.com/in/janedoe".into()),
                ..Default::default()
            },
            None,
        );
        store.insert_profile(&profile).await.unwrap();

        orch.verify_and_promote(&profile).await.unwrap();

        let verifications = store.list_verifications().await.unwrap();
        assert_eq!(verifications.len(), 1);
        assert!(verifications[0].domain_match);
        assert_eq!(verifications[0].deliverability, Deliverability::Deliverable);

        let linkedin = store.list_linkedin_verifications().await.unwrap();
        assert_eq!(linkedin.len(), 1);
        assert_eq!(linkedin[0].status, LinkedInStatus::Verified);

        let verified = store.list_verified_profiles().await.unwrap();
        assert_eq!(verified.len(), 1);
        assert_eq!(verified[0].profile_id, profile.id);
        assert!(verified[0].verification_details.starts_with("Auto-promoted"));
    }

    #[tokio::test]
    async fn linkedin_skipped_when_flag_disabled_or_fields_missing() {
        let store = Arc::new(MemoryStore::default());
        let orch = orchestrator(store.clone(), PromotionRule::Disabled, false);

        let profile = ExtractedProfile::new(
            "sub-1",
            crate::models::ContactFields {
                company: Some("Acme Corp".into()),
                linkedin_url: Some("https://linkedin.com/in/janedoe".into()),
                ..Default::default()
            },
            None,
        );
        orch.verify_and_promote(&profile).await.unwrap();
        assert!(store.list_linkedin_verifications().await.unwrap().is_empty());

        // Flag on, but no LinkedIn URL on the profile.
        let orch = orchestrator(store.clone(), PromotionRule::Disabled, true);
        let no_url = ExtractedProfile::new(
            "sub-2",
            crate::models::ContactFields {
                company: Some("Acme Corp".into()),
                email: Some("jane@acmecorp.com".into()),
                ..Default::default()
            },
            None,
        );
        orch.verify_and_promote(&no_url).await.unwrap();
        assert!(store.list_linkedin_verifications().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn approve_is_idempotent() {
        let store = Arc::new(MemoryStore::default());
        let orch = orchestrator(store.clone(), PromotionRule::Disabled, false);

        let profile = ExtractedProfile::new("sub-1", Default::default(), None);
        store.insert_profile(&profile).await.unwrap();

        let first = orch.approve(&profile.id).await.unwrap();
        let second = orch.approve(&profile.id).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.list_verified_profiles().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn approve_unknown_profile_is_not_found() {
        let store = Arc::new(MemoryStore::default());
        let orch = orchestrator(store, PromotionRule::Disabled, false);

        assert!(matches!(
            orch.approve("missing").await.unwrap_err(),
            PipelineError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn unsupported_content_records_a_failure() {
        let store = Arc::new(MemoryStore::default());
        let orch = orchestrator(store.clone(), PromotionRule::Disabled, false);

        let raw = RawSubmission::new(
            RawContent::Document {
                data: "R0lGODlh".into(),
                mime_type: "image/gif".into(),
            },
            Some("jane@acmecorp.com".into()),
        );
        assert!(orch.process(raw).await.is_err());

        let failures = store.list_validation_failures().await.unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].source, "jane@acmecorp.com");
        assert!(failures[0].error.contains("image/gif"));
        // The submission itself is still persisted for inspection.
        assert_eq!(store.list_submissions(10, 0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn auto_promotion_does_not_double_promote() {
        let store = Arc::new(MemoryStore::default());
        let orch = orchestrator(store.clone(), PromotionRule::AnySignal, false);

        let profile = ExtractedProfile::new(
            "sub-1",
            crate::models::ContactFields {
                email: Some("jane@acmecorp.com".into()),
                company: Some("Acme Corp".into()),
                ..Default::default()
            },
            None,
        );
        store.insert_profile(&profile).await.unwrap();

        // Manual approval first, then the automatic path runs: still one
        // verified record.
        orch.approve(&profile.id).await.unwrap();
        orch.verify_and_promote(&profile).await.unwrap();

        assert_eq!(store.list_verified_profiles().await.unwrap().len(), 1);
    }
}
