use crate::api::*;
use crate::config::Config;
use crate::mail_source::MailSource;
use crate::pipeline::Orchestrator;
use crate::store::ProfileStore;
use rocket::{routes, Build, Rocket};
use std::sync::Arc;

pub mod routes;

pub struct ServerState {
    pub config: Config,
    pub orchestrator: Arc<Orchestrator>,
    pub store: Arc<dyn ProfileStore>,
    pub mail_source: Option<Arc<dyn MailSource>>,
}

pub fn build_rocket(state: ServerState) -> Rocket<Build> {
    rocket::build().manage(state).mount(
        "/api",
        routes![
            // Health and info endpoints
            routes::health::health_check,
            routes::health::index,
            // Submission endpoints
            submit,
            list_submissions,
            ingest,
            // Profile endpoints
            list_profiles,
            get_profile,
            approve_profile,
            // Verification endpoints
            list_verifications,
            list_linkedin_verifications,
            list_verified_profiles,
            // Failure endpoints
            list_failures,
            report_failures,
        ],
    )
}
