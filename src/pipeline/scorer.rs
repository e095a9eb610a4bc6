use std::sync::Arc;
use tracing::warn;

use crate::models::{Deliverability, VerificationResult};
use crate::services::MailDeliverability;

const DOMAIN_MATCH_WEIGHT: f64 = 0.4;
const DELIVERABLE_WEIGHT: f64 = 0.6;
const RISKY_WEIGHT: f64 = 0.2;

/// Derives a heuristic confidence score from the email/company domain
/// relationship and an external deliverability verdict. Never fails: a
/// deliverability backend failure degrades to a risky verdict with zero
/// contribution, and missing inputs are scored absences, not errors.
pub struct DeliverabilityScorer {
    backend: Arc<dyn MailDeliverability>,
}

/// Company name as a hostname candidate: whitespace stripped, lowercased,
/// leading `www.` removed.
pub fn company_slug(company: &str) -> String {
    let slug: String = company.split_whitespace().collect::<String>().to_lowercase();
    slug.strip_prefix("www.").unwrap_or(&slug).to_string()
}

impl DeliverabilityScorer {
    pub fn new(backend: Arc<dyn MailDeliverability>) -> Self {
        Self { backend }
    }

    pub async fn score(
        &self,
        profile_id: &str,
        email: Option<&str>,
        company: Option<&str>,
    ) -> VerificationResult {
        let mut score = 0.0;
        let mut reasons: Vec<String> = Vec::new();

        // 1. Domain-company match.
        let mut domain_match = false;
        match (email, company) {
            (Some(email), Some(company)) => match email.split_once('@') {
                Some((_, domain)) => {
                    let domain = domain.to_lowercase();
                    let slug = company_slug(company);
                    if !slug.is_empty() && domain.contains(&slug) {
                        domain_match = true;
                        score += DOMAIN_MATCH_WEIGHT;
                        reasons.push("Email domain matches company name.".to_string());
                    } else {
                        reasons.push(format!(
                            "Email domain ({domain}) does not match company domain ({slug})."
                        ));
                    }
                }
                None => {
                    reasons.push(format!("Could not parse a domain from email address {email}."));
                }
            },
            _ => {
                reasons.push("Missing email or company for domain match check.".to_string());
            }
        }

        // 2. Deliverability verdict.
        let mut deliverability = Deliverability::Risky;
        match email {
            Some(email) => match self.backend.check(email).await {
                Ok(report) => {
                    deliverability = report.verdict;
                    score += match report.verdict {
                        Deliverability::Deliverable => DELIVERABLE_WEIGHT,
                        Deliverability::Risky => RISKY_WEIGHT,
                        Deliverability::Undeliverable => 0.0,
                    };
                    reasons.push(report.reason);
                }
                Err(e) => {
                    warn!("Deliverability check failed for {}: {}", email, e);
                    reasons.push(format!("Deliverability check failed, treated as risky: {e}"));
                }
            },
            None => {
                reasons.push("Missing email for deliverability check.".to_string());
            }
        }

        VerificationResult::new(profile_id, score, domain_match, deliverability, reasons.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PipelineError, Result};
    use crate::services::{DeliverabilityReport, SandboxDeliverability};
    use async_trait::async_trait;

    struct FixedVerdict(Deliverability);

    #[async_trait]
    impl MailDeliverability for FixedVerdict {
        async fn check(&self, _email: &str) -> Result<DeliverabilityReport> {
            Ok(DeliverabilityReport {
                verdict: self.0,
                reason: format!("fixed verdict {}", self.0.as_str()),
            })
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl MailDeliverability for FailingBackend {
        async fn check(&self, _email: &str) -> Result<DeliverabilityReport> {
            Err(PipelineError::ServiceUnavailable("boom".into()))
        }
    }

    fn sandbox_scorer() -> DeliverabilityScorer {
        DeliverabilityScorer::new(Arc::new(SandboxDeliverability))
    }

    #[test]
    fn company_slugs() {
        assert_eq!(company_slug("Example"), "example");
        assert_eq!(company_slug("Acme Corp"), "acmecorp");
        assert_eq!(company_slug("www.Example"), "example");
    }

    #[tokio::test]
    async fn matching_domain_and_deliverable_address_scores_full() {
        // jane@example.com vs "Example": domain "example.com" contains the
        // slug "example", and the sandbox says deliverable.
        let result = sandbox_scorer()
            .score("p1", Some("jane@example.com"), Some("Example"))
            .await;

        assert!(result.domain_match);
        assert_eq!(result.deliverability, Deliverability::Deliverable);
        assert!((result.score - 1.0).abs() < f64::EPSILON);
        assert!(result.reason.contains("matches company name"));
    }

    #[tokio::test]
    async fn undeliverable_address_without_domain_match_scores_zero() {
        let result = sandbox_scorer()
            .score("p1", Some("test.undeliverable@x.com"), Some("Example"))
            .await;

        assert!(!result.domain_match);
        assert_eq!(result.deliverability, Deliverability::Undeliverable);
        assert_eq!(result.score, 0.0);
    }

    #[tokio::test]
    async fn missing_inputs_are_scored_absences() {
        let no_email = sandbox_scorer().score("p1", None, Some("Example")).await;
        assert!(!no_email.domain_match);
        assert_eq!(no_email.deliverability, Deliverability::Risky);
        assert_eq!(no_email.score, 0.0);
        assert!(no_email.reason.contains("Missing email or company"));
        assert!(no_email.reason.contains("Missing email for deliverability"));

        let no_company = sandbox_scorer()
            .score("p1", Some("jane@example.com"), None)
            .await;
        assert!(!no_company.domain_match);
        // Deliverability still runs with just the email.
        assert_eq!(no_company.deliverability, Deliverability::Deliverable);
        assert!((no_company.score - 0.6).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn backend_failure_degrades_instead_of_aborting() {
        let scorer = DeliverabilityScorer::new(Arc::new(FailingBackend));
        let result = scorer
            .score("p1", Some("jane@example.com"), Some("Example"))
            .await;

        // Domain match still contributes; deliverability degrades to risky
        // with zero contribution.
        assert!(result.domain_match);
        assert_eq!(result.deliverability, Deliverability::Risky);
        assert!((result.score - 0.4).abs() < f64::EPSILON);
        assert!(result.reason.contains("treated as risky"));
    }

    #[tokio::test]
    async fn score_is_monotonic_in_both_signals() {
        // Deliverability fixed, domain flips false -> true.
        for verdict in [
            Deliverability::Undeliverable,
            Deliverability::Risky,
            Deliverability::Deliverable,
        ] {
            let scorer = DeliverabilityScorer::new(Arc::new(FixedVerdict(verdict)));
            let without = scorer
                .score("p1", Some("jane@other.org"), Some("Example"))
                .await;
            let with = scorer
                .score("p1", Some("jane@example.com"), Some("Example"))
                .await;
            assert!(with.score > without.score, "verdict {verdict:?}");
        }

        // Domain fixed, deliverability climbs.
        let mut last = -1.0;
        for verdict in [
            Deliverability::Undeliverable,
            Deliverability::Risky,
            Deliverability::Deliverable,
        ] {
            let scorer = DeliverabilityScorer::new(Arc::new(FixedVerdict(verdict)));
            let result = scorer
                .score("p1", Some("jane@other.org"), Some("Example"))
                .await;
            assert!(result.score > last, "verdict {verdict:?}");
            last = result.score;
        }
    }

    #[tokio::test]
    async fn reason_trail_is_ordered_and_append_only() {
        let result = sandbox_scorer()
            .score("p1", Some("jane@other.org"), Some("Example"))
            .await;

        let domain_part = result.reason.find("does not match").unwrap();
        let deliverability_part = result.reason.find("can receive mail").unwrap();
        assert!(domain_part < deliverability_part);
    }
}
