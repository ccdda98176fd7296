use poem_openapi::Object;
use serde::{Deserialize, Serialize};

/// Request model for login
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Username for authentication
    pub username: String,

    /// Password for authentication
    pub password: String,
}

/// Response model for login
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Signed bearer token carrying the claims snapshot
    pub access_token: String,

    /// Human-readable outcome message
    pub msg: String,

    /// 1 on success
    pub success: i32,
}
