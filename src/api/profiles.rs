use rocket::{get, post, serde::json::Json, State};

use crate::api::ApiResponse;
use crate::models::{ExtractedProfile, ExtractionStatus, VerifiedProfile};
use crate::server::ServerState;

#[get("/profiles?<status>")]
pub async fn list_profiles(
    state: &State<ServerState>,
    status: Option<String>,
) -> Json<ApiResponse<Vec<ExtractedProfile>>> {
    let filter = match status.as_deref() {
        Some(value) => match ExtractionStatus::parse(value) {
            Some(status) => Some(status),
            None => {
                return Json(ApiResponse::error(format!(
                    "Unknown extraction status '{value}'; expected 'complete' or 'partial'"
                )))
            }
        },
        None => None,
    };

    match state.store.list_profiles(filter).await {
        Ok(profiles) => Json(ApiResponse::success(profiles)),
        Err(e) => Json(ApiResponse::error(e.to_string())),
    }
}

#[get("/profiles/<id>")]
pub async fn get_profile(
    state: &State<ServerState>,
    id: &str,
) -> Json<ApiResponse<ExtractedProfile>> {
    match state.store.get_profile(id).await {
        Ok(Some(profile)) => Json(ApiResponse::success(profile)),
        Ok(None) => Json(ApiResponse::error(format!("Profile {id} not found"))),
        Err(e) => Json(ApiResponse::error(e.to_string())),
    }
}

/// Manual promotion. Approving an already-verified profile returns the
/// existing record unchanged.
#[post("/profiles/<id>/approve")]
pub async fn approve_profile(
    state: &State<ServerState>,
    id: &str,
) -> Json<ApiResponse<VerifiedProfile>> {
    match state.orchestrator.approve(id).await {
        Ok(verified) => Json(ApiResponse::success(verified)),
        Err(e) => Json(ApiResponse::error(e.to_string())),
    }
}
