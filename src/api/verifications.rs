use rocket::{get, serde::json::Json, State};

use crate::api::ApiResponse;
use crate::models::{LinkedInVerification, VerificationResult, VerifiedProfile};
use crate::server::ServerState;

#[get("/verifications")]
pub async fn list_verifications(
    state: &State<ServerState>,
) -> Json<ApiResponse<Vec<VerificationResult>>> {
    match state.store.list_verifications().await {
        Ok(results) => Json(ApiResponse::success(results)),
        Err(e) => Json(ApiResponse::error(e.to_string())),
    }
}

#[get("/linkedin-verifications")]
pub async fn list_linkedin_verifications(
    state: &State<ServerState>,
) -> Json<ApiResponse<Vec<LinkedInVerification>>> {
    match state.store.list_linkedin_verifications().await {
        Ok(verifications) => Json(ApiResponse::success(verifications)),
        Err(e) => Json(ApiResponse::error(e.to_string())),
    }
}

#[get("/verified-profiles")]
pub async fn list_verified_profiles(
    state: &State<ServerState>,
) -> Json<ApiResponse<Vec<VerifiedProfile>>> {
    match state.store.list_verified_profiles().await {
        Ok(profiles) => Json(ApiResponse::success(profiles)),
        Err(e) => Json(ApiResponse::error(e.to_string())),
    }
}
