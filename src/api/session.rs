use poem_openapi::{payload::Json, OpenApi, Tags};
use std::sync::Arc;

use crate::api::BearerAuth;
use crate::errors::ApiError;
use crate::services::AuthService;
use crate::types::dto::auth::{LoginRequest, LoginResponse};
use crate::types::dto::common::StatusResponse;

/// Login and logout.
pub struct SessionApi {
    auth: Arc<AuthService>,
}

impl SessionApi {
    pub fn new(auth: Arc<AuthService>) -> Self {
        Self { auth }
    }
}

#[derive(Tags)]
enum SessionTags {
    /// Session endpoints
    Session,
}

#[OpenApi]
impl SessionApi {
    /// Login with username and password to receive a bearer token
    #[oai(path = "/login", method = "post", tag = "SessionTags::Session")]
    async fn login(&self, body: Json<LoginRequest>) -> Result<Json<LoginResponse>, ApiError> {
        if body.username.is_empty() {
            return Err(ApiError::validation("Missing username parameter."));
        }
        if body.password.is_empty() {
            return Err(ApiError::validation("Missing password parameter."));
        }

        let access_token = self.auth.login(&body.username, &body.password).await?;

        Ok(Json(LoginResponse {
            access_token,
            msg: "Login complete.".to_string(),
            success: 1,
        }))
    }

    /// Revoke the presented token
    #[oai(path = "/logout", method = "post", tag = "SessionTags::Session")]
    async fn logout(&self, auth: BearerAuth) -> Result<Json<StatusResponse>, ApiError> {
        self.auth.logout(&auth.0.token).await?;
        Ok(Json(StatusResponse::ok("Logout successful.")))
    }
}
