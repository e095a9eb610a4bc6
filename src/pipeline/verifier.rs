use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

use crate::error::PipelineError;
use crate::models::{LinkedInStatus, LinkedInVerification};
use crate::services::ProfileLookup;

/// Checks a claimed LinkedIn URL + company against the profile-lookup
/// service. Every outcome is terminal for the call; a retry creates a new
/// record. This function never returns an error: failures become
/// `error`-status verifications so the rest of the pipeline keeps going.
pub struct SocialProfileVerifier {
    lookup: Arc<dyn ProfileLookup>,
}

/// The path segment following `/in/`, e.g.
/// `https://www.linkedin.com/in/jane-doe-8397072b4/` -> `jane-doe-8397072b4`.
pub fn username_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let mut segments = parsed.path_segments()?;
    while let Some(segment) = segments.next() {
        if segment == "in" {
            return segments
                .next()
                .filter(|s| !s.is_empty())
                .map(str::to_string);
        }
    }
    None
}

impl SocialProfileVerifier {
    pub fn new(lookup: Arc<dyn ProfileLookup>) -> Self {
        Self { lookup }
    }

    pub async fn verify(
        &self,
        profile_id: &str,
        claimed_url: &str,
        claimed_company: &str,
    ) -> LinkedInVerification {
        let Some(username) = username_from_url(claimed_url) else {
            return LinkedInVerification::new(
                profile_id,
                LinkedInStatus::Error,
                format!("Could not extract a username from LinkedIn URL: {claimed_url}"),
                None,
            );
        };

        let profiles = match self.lookup.lookup(&username).await {
            Ok(profiles) => profiles,
            Err(PipelineError::RateLimited(message)) => {
                warn!("LinkedIn lookup rate-limited for {}: {}", username, message);
                return LinkedInVerification::new(
                    profile_id,
                    LinkedInStatus::ApiLimitReached,
                    message,
                    None,
                );
            }
            Err(e) => {
                warn!("LinkedIn lookup failed for {}: {}", username, e);
                return LinkedInVerification::new(
                    profile_id,
                    LinkedInStatus::Error,
                    e.to_string(),
                    None,
                );
            }
        };

        let Some(found) = profiles.first() else {
            return LinkedInVerification::new(
                profile_id,
                LinkedInStatus::ProfileNotFound,
                format!("No LinkedIn profile found for {username}."),
                None,
            );
        };

        // Match direction is fixed: the claimed company must appear inside
        // an employer name (case-insensitive), across every entry in the
        // history, not just the current one.
        let claimed = claimed_company.to_lowercase();
        let matched = found
            .employment
            .iter()
            .any(|e| e.company.to_lowercase().contains(&claimed));

        if matched {
            info!(
                "LinkedIn verification matched company '{}' for {}",
                claimed_company, username
            );
            return LinkedInVerification::new(
                profile_id,
                LinkedInStatus::Verified,
                "Company name matched on LinkedIn profile.".to_string(),
                Some(found.profile_url.clone()),
            );
        }

        // The profile was found, just the employer didn't match; keep the
        // resolved URL so a reviewer can inspect it.
        let latest_employer = found
            .employment
            .first()
            .map(|e| e.company.as_str())
            .unwrap_or("none listed");
        LinkedInVerification::new(
            profile_id,
            LinkedInStatus::CompanyMismatch,
            format!("Company mismatch. Claimed: {claimed_company}, LinkedIn: {latest_employer}."),
            Some(found.profile_url.clone()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::services::{Employment, LookupProfile};
    use async_trait::async_trait;

    /// Lookup fake: usernames containing "unknown" resolve to nothing,
    /// "limited" hits the quota, "down" errors; anything else returns a
    /// profile with an Acme Corp -> OldCo history.
    struct FakeLookup;

    #[async_trait]
    impl ProfileLookup for FakeLookup {
        async fn lookup(&self, username: &str) -> Result<Vec<LookupProfile>> {
            if username.contains("unknown") {
                return Ok(Vec::new());
            }
            if username.contains("limited") {
                return Err(PipelineError::RateLimited(
                    "Monthly usage hard limit exceeded".to_string(),
                ));
            }
            if username.contains("down") {
                return Err(PipelineError::ServiceUnavailable("connect timeout".into()));
            }
            Ok(vec![LookupProfile {
                profile_url: format!("https://www.linkedin.com/in/{username}"),
                employment: vec![
                    Employment {
                        company: "Acme Corp".to_string(),
                        title: Some("Engineer".to_string()),
                    },
                    Employment {
                        company: "OldCo".to_string(),
                        title: None,
                    },
                ],
            }])
        }
    }

    fn verifier() -> SocialProfileVerifier {
        SocialProfileVerifier::new(Arc::new(FakeLookup))
    }

    #[test]
    fn username_parsing() {
        assert_eq!(
            username_from_url("https://www.linkedin.com/in/jane-doe-8397072b4/"),
            Some("jane-doe-8397072b4".to_string())
        );
        assert_eq!(
            username_from_url("https://linkedin.com/in/janedoe"),
            Some("janedoe".to_string())
        );
        assert_eq!(username_from_url("https://linkedin.com/company/acme"), None);
        assert_eq!(username_from_url("not a url"), None);
        assert_eq!(username_from_url("https://linkedin.com/in/"), None);
    }

    #[tokio::test]
    async fn unresolvable_url_is_an_error_status() {
        let result = verifier()
            .verify("p1", "https://linkedin.com/company/acme", "Acme")
            .await;
        assert_eq!(result.status, LinkedInStatus::Error);
        assert!(result.resolved_profile_url.is_none());
    }

    #[tokio::test]
    async fn zero_results_is_profile_not_found() {
        let result = verifier()
            .verify("p1", "https://linkedin.com/in/totally-unknown", "Acme")
            .await;
        assert_eq!(result.status, LinkedInStatus::ProfileNotFound);
    }

    #[tokio::test]
    async fn case_insensitive_match_on_any_history_entry() {
        let result = verifier()
            .verify("p1", "https://linkedin.com/in/janedoe", "acme")
            .await;
        assert_eq!(result.status, LinkedInStatus::Verified);
        assert_eq!(
            result.resolved_profile_url.as_deref(),
            Some("https://www.linkedin.com/in/janedoe")
        );

        // Older entries count too.
        let older = verifier()
            .verify("p1", "https://linkedin.com/in/janedoe", "oldco")
            .await;
        assert_eq!(older.status, LinkedInStatus::Verified);
    }

    #[tokio::test]
    async fn mismatch_names_claim_and_latest_employer() {
        let result = verifier()
            .verify("p1", "https://linkedin.com/in/janedoe", "Initech")
            .await;
        assert_eq!(result.status, LinkedInStatus::CompanyMismatch);
        assert!(result.message.contains("Initech"));
        assert!(result.message.contains("Acme Corp"));
        // A mismatch is not a lookup failure: the URL is still resolved.
        assert!(result.resolved_profile_url.is_some());
    }

    #[tokio::test]
    async fn quota_condition_maps_to_api_limit_reached() {
        let result = verifier()
            .verify("p1", "https://linkedin.com/in/rate-limited", "Acme")
            .await;
        assert_eq!(result.status, LinkedInStatus::ApiLimitReached);
        assert!(result.message.contains("hard limit"));
    }

    #[tokio::test]
    async fn transport_failure_maps_to_error() {
        let result = verifier()
            .verify("p1", "https://linkedin.com/in/service-down", "Acme")
            .await;
        assert_eq!(result.status, LinkedInStatus::Error);
    }
}
