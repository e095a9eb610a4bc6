use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::config::ServiceEndpoint;
use crate::error::{PipelineError, Result};

/// One employment entry from a looked-up profile.
#[derive(Debug, Clone)]
pub struct Employment {
    pub company: String,
    pub title: Option<String>,
}

/// One profile record returned by the lookup service.
#[derive(Debug, Clone)]
pub struct LookupProfile {
    pub profile_url: String,
    /// Most recent entry first, as the service returns them.
    pub employment: Vec<Employment>,
}

/// Profile-lookup backend keyed by a LinkedIn username. A rate/quota
/// condition is reported as `PipelineError::RateLimited` so the verifier can
/// map it to its own outcome instead of a generic error.
#[async_trait]
pub trait ProfileLookup: Send + Sync {
    async fn lookup(&self, username: &str) -> Result<Vec<LookupProfile>>;
}

/// Client for an actor-style scraping service: POST the username batch, get
/// the dataset items back in one call.
pub struct HttpProfileLookup {
    client: Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct ActorItem {
    #[serde(default)]
    profile_url: Option<String>,
    #[serde(default)]
    experiences: Vec<ActorExperience>,
}

#[derive(Debug, Deserialize)]
struct ActorExperience {
    #[serde(default)]
    company: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

impl HttpProfileLookup {
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
impl ProfileLookup for HttpProfileLookup {
    async fn lookup(&self, username: &str) -> Result<Vec<LookupProfile>> {
        debug!("Looking up LinkedIn profile for username: {}", username);

        let response = self
            .client
            .post(format!(
                "{}/run-sync-get-dataset-items?token={}",
                self.base_url, self.token
            ))
            .json(&json!({ "usernames": [username] }))
            .send()
            .await
            .map_err(|e| PipelineError::ServiceUnavailable(e.to_string()))?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::RateLimited(format!(
                "profile lookup quota exhausted: {body}"
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            // Some actor platforms report quota exhaustion in the error body
            // with a 4xx status rather than 429.
            let lowered = body.to_lowercase();
            if lowered.contains("limit") || lowered.contains("quota") {
                return Err(PipelineError::RateLimited(body));
            }
            return Err(PipelineError::ServiceUnavailable(format!(
                "profile lookup returned HTTP {status}: {body}"
            )));
        }

        let items: Vec<ActorItem> = response
            .json()
            .await
            .map_err(|e| PipelineError::InvalidResponse(e.to_string()))?;

        Ok(items
            .into_iter()
            .map(|item| LookupProfile {
                profile_url: item
                    .profile_url
                    .unwrap_or_else(|| format!("https://www.linkedin.com/in/{username}")),
                employment: item
                    .experiences
                    .into_iter()
                    .filter_map(|e| {
                        e.company.map(|company| Employment {
                            company,
                            title: e.title,
                        })
                    })
                    .collect(),
            })
            .collect())
    }
}
