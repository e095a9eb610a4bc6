use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::ServiceEndpoint;
use crate::error::{PipelineError, Result};
use crate::models::Deliverability;

#[derive(Debug, Clone)]
pub struct DeliverabilityReport {
    pub verdict: Deliverability,
    pub reason: String,
}

/// Mail-deliverability backend. Callers never abort on a failure here: the
/// scorer degrades to a risky verdict with zero contribution instead.
#[async_trait]
pub trait MailDeliverability: Send + Sync {
    async fn check(&self, email: &str) -> Result<DeliverabilityReport>;
}

pub struct HttpDeliverability {
    client: Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    deliverability: Deliverability,
    #[serde(default)]
    reason: String,
}

impl HttpDeliverability {
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

#[async_trait]
impl MailDeliverability for HttpDeliverability {
    async fn check(&self, email: &str) -> Result<DeliverabilityReport> {
        debug!("Checking deliverability for {}", email);

        let response = self
            .client
            .get(format!("{}/v1/verify", self.base_url))
            .query(&[("email", email)])
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| PipelineError::ServiceUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PipelineError::ServiceUnavailable(format!(
                "deliverability check returned HTTP {}",
                response.status()
            )));
        }

        let body: VerifyResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::InvalidResponse(e.to_string()))?;

        Ok(DeliverabilityReport {
            verdict: body.deliverability,
            reason: body.reason,
        })
    }
}

/// Sandbox backend used when no deliverability service is configured.
/// Verdicts are keyed off the address itself, so local runs and tests get
/// predictable outcomes.
pub struct SandboxDeliverability;

#[async_trait]
impl MailDeliverability for SandboxDeliverability {
    async fn check(&self, email: &str) -> Result<DeliverabilityReport> {
        if email.contains("undeliverable") {
            return Ok(DeliverabilityReport {
                verdict: Deliverability::Undeliverable,
                reason: "Email address does not exist.".to_string(),
            });
        }
        if email.contains("risky") {
            return Ok(DeliverabilityReport {
                verdict: Deliverability::Risky,
                reason: "Accept-all domain, cannot confirm validity.".to_string(),
            });
        }
        Ok(DeliverabilityReport {
            verdict: Deliverability::Deliverable,
            reason: "Email address is valid and can receive mail.".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sandbox_verdicts_follow_address_markers() {
        let sandbox = SandboxDeliverability;

        let bad = sandbox.check("test.undeliverable@x.com").await.unwrap();
        assert_eq!(bad.verdict, Deliverability::Undeliverable);

        let risky = sandbox.check("maybe.risky@x.com").await.unwrap();
        assert_eq!(risky.verdict, Deliverability::Risky);

        let good = sandbox.check("jane@example.com").await.unwrap();
        assert_eq!(good.verdict, Deliverability::Deliverable);
        assert!(!good.reason.is_empty());
    }
}
