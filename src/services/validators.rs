use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::ApiError;
use crate::types::internal::Role;

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").unwrap());
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

const USERNAME_MIN: usize = 5;
const USERNAME_MAX: usize = 40;
const PASSWORD_MIN: usize = 8;
const PASSWORD_MAX: usize = 50;

/// Field-level validation failures. Uniqueness is checked separately by
/// the stores, since it needs the database.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FieldError {
    #[error("Username not provided.")]
    UsernameMissing,

    #[error("Username can only contain letters, numbers and underscores.")]
    UsernameCharset,

    #[error("Username must be between {USERNAME_MIN} and {USERNAME_MAX} characters.")]
    UsernameLength,

    #[error("Email not provided.")]
    EmailMissing,

    #[error("Email is not in proper format.")]
    EmailFormat,

    #[error("Password not provided.")]
    PasswordMissing,

    #[error("Password must contain one capital letter and one number.")]
    PasswordComposition,

    #[error("Password must be between {PASSWORD_MIN} and {PASSWORD_MAX} characters.")]
    PasswordLength,

    #[error("Invalid role type.")]
    RoleUnknown,

    #[error("Usergroup label must be provided.")]
    LabelMissing,

    #[error("Usergroup label cannot start with \"personal_\".")]
    LabelReservedPrefix,
}

impl From<FieldError> for ApiError {
    fn from(err: FieldError) -> Self {
        ApiError::validation(err.to_string())
    }
}

/// Validate a username and return it normalized to lower-case.
///
/// Usernames are 5-40 characters of letters, digits and underscores.
/// Uniqueness is enforced post-normalization, so it is effectively
/// case-insensitive.
pub fn validate_username(candidate: &str) -> Result<String, FieldError> {
    if candidate.is_empty() {
        return Err(FieldError::UsernameMissing);
    }
    if !USERNAME_RE.is_match(candidate) {
        return Err(FieldError::UsernameCharset);
    }
    if candidate.len() < USERNAME_MIN || candidate.len() > USERNAME_MAX {
        return Err(FieldError::UsernameLength);
    }
    Ok(candidate.to_lowercase())
}

/// Validate an email against a basic local@domain.tld shape and return
/// it normalized to lower-case.
pub fn validate_email(candidate: &str) -> Result<String, FieldError> {
    if candidate.is_empty() {
        return Err(FieldError::EmailMissing);
    }
    if !EMAIL_RE.is_match(candidate) {
        return Err(FieldError::EmailFormat);
    }
    Ok(candidate.to_lowercase())
}

/// Validate a plaintext password: 8-50 characters with at least one
/// uppercase letter and one digit, in any order.
pub fn validate_password(candidate: &str) -> Result<(), FieldError> {
    if candidate.is_empty() {
        return Err(FieldError::PasswordMissing);
    }
    let has_upper = candidate.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = candidate.chars().any(|c| c.is_ascii_digit());
    if !has_upper || !has_digit {
        return Err(FieldError::PasswordComposition);
    }
    if candidate.len() < PASSWORD_MIN || candidate.len() > PASSWORD_MAX {
        return Err(FieldError::PasswordLength);
    }
    Ok(())
}

/// Validate a role name.
pub fn validate_role(candidate: &str) -> Result<Role, FieldError> {
    Role::parse(candidate).ok_or(FieldError::RoleUnknown)
}

/// Validate a shared usergroup label. The personal_ prefix is reserved
/// for the auto-created per-user groups.
pub fn validate_usergroup_label(candidate: &str) -> Result<String, FieldError> {
    if candidate.is_empty() {
        return Err(FieldError::LabelMissing);
    }
    if candidate.to_lowercase().starts_with("personal_") {
        return Err(FieldError::LabelReservedPrefix);
    }
    Ok(candidate.to_string())
}

/// Label of the personal usergroup owned by `username`.
pub fn personal_group_label(username: &str) -> String {
    format!("personal_{}", username)
}
