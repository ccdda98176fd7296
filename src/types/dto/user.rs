use poem_openapi::Object;
use serde::{Deserialize, Serialize};

use crate::types::dto::common::UsergroupSummary;

/// Canonical user projection.
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct UserDict {
    pub user_id: i32,
    pub username: String,
    pub email: String,
    pub role: String,
    pub is_active: bool,
    pub usergroups: Vec<UsergroupSummary>,
}

/// Create (POST, no user_id) or edit (PATCH, user_id present) a user.
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct EditUserRequest {
    pub user_id: Option<i32>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
    /// Replaces the user's full membership set when non-empty; the
    /// personal usergroup is always retained
    pub usergroup_ids: Option<Vec<i32>>,
}

#[derive(Object, Debug, Serialize, Deserialize)]
pub struct DeleteUserRequest {
    pub user_id: i32,
}

#[derive(Object, Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub msg: String,
    pub success: i32,
    pub user: UserDict,
}

#[derive(Object, Debug, Serialize, Deserialize)]
pub struct UserListResponse {
    pub msg: String,
    pub success: i32,
    pub users: Vec<UserDict>,
}
