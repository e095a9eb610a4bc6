pub mod health {
    use rocket::{get, serde::json::Json};
    use serde_json::{json, Value};

    #[get("/health")]
    pub async fn health_check() -> Json<Value> {
        Json(json!({
            "status": "healthy",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "service": "contact-pipeline-api"
        }))
    }

    #[get("/")]
    pub async fn index() -> Json<Value> {
        Json(json!({
            "name": "Contact Pipeline API",
            "version": "0.1.0",
            "description": "Contact extraction and verification pipeline",
            "endpoints": {
                "health": "/api/health",
                "submissions": "/api/submissions",
                "ingest": "/api/ingest",
                "profiles": "/api/profiles",
                "verifications": "/api/verifications",
                "linkedin_verifications": "/api/linkedin-verifications",
                "verified_profiles": "/api/verified-profiles",
                "failures": "/api/failures"
            }
        }))
    }
}
