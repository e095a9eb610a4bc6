use rocket::{get, post, serde::json::Json, State};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::ApiResponse;
use crate::mail_source::RetrievalQuery;
use crate::models::{ExtractedProfile, RawContent, RawSubmission};
use crate::server::ServerState;

#[derive(Deserialize)]
pub struct SubmissionRequest {
    pub content: RawContent,
    pub source_email: Option<String>,
}

#[derive(Deserialize)]
pub struct IngestRequest {
    pub from_sender: Option<String>,
    pub max_results: Option<usize>,
    #[serde(default)]
    pub attachments_only: bool,
}

#[derive(Serialize)]
pub struct IngestSummary {
    pub fetched: usize,
    pub processed: usize,
    pub failed: usize,
}

#[post("/submissions", data = "<request>")]
pub async fn submit(
    state: &State<ServerState>,
    request: Json<SubmissionRequest>,
) -> Json<ApiResponse<ExtractedProfile>> {
    let request = request.into_inner();
    let submission = RawSubmission::new(request.content, request.source_email);

    match state.orchestrator.process(submission).await {
        Ok(profile) => Json(ApiResponse::success(profile)),
        Err(e) => Json(ApiResponse::error(e.to_string())),
    }
}

#[get("/submissions?<limit>&<offset>")]
pub async fn list_submissions(
    state: &State<ServerState>,
    limit: Option<usize>,
    offset: Option<usize>,
) -> Json<ApiResponse<Vec<RawSubmission>>> {
    let limit = limit.unwrap_or(50).min(500);
    let offset = offset.unwrap_or(0);

    match state.store.list_submissions(limit, offset).await {
        Ok(submissions) => Json(ApiResponse::success(submissions)),
        Err(e) => Json(ApiResponse::error(e.to_string())),
    }
}

/// Pulls messages from the configured mail source and runs each one through
/// the pipeline. Per-message failures are counted, not fatal; they land in
/// the validation-failure log like any other pipeline failure.
#[post("/ingest", data = "<request>")]
pub async fn ingest(
    state: &State<ServerState>,
    request: Json<IngestRequest>,
) -> Json<ApiResponse<IngestSummary>> {
    let Some(mail_source) = &state.mail_source else {
        return Json(ApiResponse::error(
            "No mail source configured; set GMAIL_ACCESS_TOKEN".to_string(),
        ));
    };

    let request = request.into_inner();
    let query = RetrievalQuery {
        from_sender: request.from_sender,
        max_results: request.max_results.unwrap_or(25).min(100),
        attachments_only: request.attachments_only,
    };

    let submissions = match mail_source.fetch(&query).await {
        Ok(submissions) => submissions,
        Err(e) => return Json(ApiResponse::error(e.to_string())),
    };

    let fetched = submissions.len();
    let mut processed = 0;
    let mut failed = 0;
    for submission in submissions {
        let submission_id = submission.id.clone();
        match state.orchestrator.process(submission).await {
            Ok(_) => processed += 1,
            Err(e) => {
                warn!("Ingested submission {} failed: {}", submission_id, e);
                failed += 1;
            }
        }
    }

    info!(
        "Mail ingest finished: {} fetched, {} processed, {} failed",
        fetched, processed, failed
    );
    Json(ApiResponse::success(IngestSummary {
        fetched,
        processed,
        failed,
    }))
}
