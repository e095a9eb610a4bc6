use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod database;
mod error;
mod mail_source;
mod models;
mod pipeline;
mod server;
mod services;
mod store;

use config::{load_config, Config, ServiceCredentials};
use database::create_db_pool;
use error::Result;
use mail_source::{GmailConnector, MailSource};
use pipeline::{
    ContentNormalizer, DeliverabilityScorer, FieldExtractor, Orchestrator, SocialProfileVerifier,
};
use services::{
    HttpDeliverability, HttpExtractionService, HttpProfileLookup, MailDeliverability,
    RegexExtractor, SandboxDeliverability, TextUnderstanding,
};
use store::{ProfileStore, SqliteStore};
use tokio::signal;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let config = match load_config("config.yml").await {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to load config.yml: {}. Using defaults.", e);
            Config::default()
        }
    };

    // Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                format!("contact_pipeline={}", config.logging.level)
                    .parse()
                    .unwrap(),
            ),
        )
        .init();

    // Initialize database
    info!("Initializing database...");
    let db_pool = create_db_pool(&config.database.path).await?;
    let store: Arc<dyn ProfileStore> = Arc::new(SqliteStore::new(db_pool));

    let credentials = ServiceCredentials::from_env();
    let timeout = Duration::from_secs(config.services.request_timeout_seconds);

    // External backends, with built-in fallbacks for anything unconfigured.
    let extraction: Arc<dyn TextUnderstanding> = match credentials.extraction {
        Some(endpoint) => {
            info!("Using extraction service at {}", endpoint.base_url);
            Arc::new(HttpExtractionService::new(endpoint, timeout))
        }
        None => {
            warn!("EXTRACTION_API_URL not set; using the built-in regex extractor");
            Arc::new(RegexExtractor::new())
        }
    };

    let verifier = match credentials.profile_lookup {
        Some(endpoint) => {
            info!("Using profile-lookup service at {}", endpoint.base_url);
            Some(SocialProfileVerifier::new(Arc::new(HttpProfileLookup::new(
                endpoint, timeout,
            ))))
        }
        None => {
            warn!("PROFILE_LOOKUP_API_URL not set; LinkedIn verification disabled");
            None
        }
    };

    let deliverability: Arc<dyn MailDeliverability> = match credentials.deliverability {
        Some(endpoint) => {
            info!("Using deliverability service at {}", endpoint.base_url);
            Arc::new(HttpDeliverability::new(endpoint, timeout))
        }
        None => {
            warn!("DELIVERABILITY_API_URL not set; using the sandbox backend");
            Arc::new(SandboxDeliverability)
        }
    };

    let mail_source: Option<Arc<dyn MailSource>> = match credentials.gmail_access_token {
        Some(token) => Some(Arc::new(GmailConnector::new(token, timeout)?)),
        None => None,
    };

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&store),
        ContentNormalizer::new(Arc::clone(&extraction)),
        FieldExtractor::new(extraction),
        verifier,
        DeliverabilityScorer::new(deliverability),
        config.pipeline.promotion_rule,
        config.services.linkedin_verification,
    ));

    let state = server::ServerState {
        config,
        orchestrator,
        store,
        mail_source,
    };

    // Add graceful shutdown
    tokio::select! {
        result = server::build_rocket(state).launch() => {
            result?;
        }
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
