use serde::Serialize;

pub mod failures;
pub mod profiles;
pub mod submissions;
pub mod verifications;

pub use failures::*;
pub use profiles::*;
pub use submissions::*;
pub use verifications::*;

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}
