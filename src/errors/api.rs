use poem_openapi::{payload::Json, ApiResponse, Object};
use sea_orm::DbErr;
use std::fmt;

/// Error body shared by every failed response. Mirrors the success-flag
/// shape of the mutating responses, with `success` always 0.
#[derive(Object, Debug)]
pub struct ErrorBody {
    /// Human-readable reason
    pub msg: String,

    /// Always 0 on errors
    pub success: i32,
}

impl ErrorBody {
    fn new(msg: impl Into<String>) -> Json<ErrorBody> {
        Json(ErrorBody {
            msg: msg.into(),
            success: 0,
        })
    }
}

/// Request-level error taxonomy. NotFound maps to 400 rather than 404,
/// matching the contract the existing clients were built against.
#[derive(ApiResponse, Debug)]
pub enum ApiError {
    /// Malformed or missing input
    #[oai(status = 400)]
    Validation(Json<ErrorBody>),

    /// Bad credentials; the message never distinguishes unknown username
    /// from wrong password
    #[oai(status = 401)]
    Authentication(Json<ErrorBody>),

    /// Credentials verified but the account is deactivated
    #[oai(status = 401)]
    AccountInactive(Json<ErrorBody>),

    /// Malformed, expired or revoked bearer token
    #[oai(status = 401)]
    InvalidToken(Json<ErrorBody>),

    /// Valid identity, insufficient privilege or ownership
    #[oai(status = 401)]
    Authorization(Json<ErrorBody>),

    /// Referenced id does not exist
    #[oai(status = 400)]
    NotFound(Json<ErrorBody>),

    /// Uniqueness violation on username/email/label
    #[oai(status = 400)]
    Conflict(Json<ErrorBody>),

    /// Internal failure; details are logged, never returned
    #[oai(status = 500)]
    Internal(Json<ErrorBody>),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(ErrorBody::new(msg))
    }

    /// The one generic credential failure, to avoid username enumeration
    pub fn bad_credentials() -> Self {
        ApiError::Authentication(ErrorBody::new("Bad username or password."))
    }

    pub fn account_inactive() -> Self {
        ApiError::AccountInactive(ErrorBody::new("Account is inactive."))
    }

    pub fn invalid_token() -> Self {
        ApiError::InvalidToken(ErrorBody::new("Token is invalid, expired or revoked."))
    }

    pub fn authorization(msg: impl Into<String>) -> Self {
        ApiError::Authorization(ErrorBody::new(msg))
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(ErrorBody::new(msg))
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        ApiError::Conflict(ErrorBody::new(msg))
    }

    /// Log the detail, return a generic body.
    pub fn internal(detail: impl fmt::Display) -> Self {
        tracing::error!("internal error: {}", detail);
        ApiError::Internal(ErrorBody::new("Internal server error."))
    }

    /// The reason string carried by this error
    pub fn message(&self) -> &str {
        match self {
            ApiError::Validation(json)
            | ApiError::Authentication(json)
            | ApiError::AccountInactive(json)
            | ApiError::InvalidToken(json)
            | ApiError::Authorization(json)
            | ApiError::NotFound(json)
            | ApiError::Conflict(json)
            | ApiError::Internal(json) => &json.0.msg,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        ApiError::internal(format!("Database error: {}", err))
    }
}
