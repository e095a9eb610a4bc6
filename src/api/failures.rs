use rocket::{get, post, serde::json::Json, State};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use crate::api::ApiResponse;
use crate::models::ValidationFailure;
use crate::server::ServerState;

#[derive(Serialize)]
pub struct FailureReport {
    pub total: usize,
    /// Failure counts keyed by source (sender address or submission id).
    pub by_source: BTreeMap<String, usize>,
    pub failures: Vec<ValidationFailure>,
}

#[get("/failures")]
pub async fn list_failures(
    state: &State<ServerState>,
) -> Json<ApiResponse<Vec<ValidationFailure>>> {
    match state.store.list_validation_failures().await {
        Ok(failures) => Json(ApiResponse::success(failures)),
        Err(e) => Json(ApiResponse::error(e.to_string())),
    }
}

/// Summarizes the accumulated failures, then clears the log. Destructive:
/// failures not archived from this response are gone.
#[post("/failures/report")]
pub async fn report_failures(state: &State<ServerState>) -> Json<ApiResponse<FailureReport>> {
    let failures = match state.store.list_validation_failures().await {
        Ok(failures) => failures,
        Err(e) => return Json(ApiResponse::error(e.to_string())),
    };

    let mut by_source: BTreeMap<String, usize> = BTreeMap::new();
    for failure in &failures {
        *by_source.entry(failure.source.clone()).or_insert(0) += 1;
    }

    let report = FailureReport {
        total: failures.len(),
        by_source,
        failures,
    };

    if let Err(e) = state.store.clear_validation_failures().await {
        return Json(ApiResponse::error(e.to_string()));
    }
    info!("Failure report generated; {} entries cleared", report.total);

    Json(ApiResponse::success(report))
}
