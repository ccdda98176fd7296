use poem_openapi::Object;
use serde::{Deserialize, Serialize};

/// Bare mutation outcome: a message and a 0/1 success flag.
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Human-readable outcome message
    pub msg: String,

    /// 1 on success
    pub success: i32,
}

impl StatusResponse {
    pub fn ok(msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            success: 1,
        }
    }
}

/// Nested creator projection embedded in resource dictionaries.
#[derive(Object, Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub user_id: i32,
    pub username: String,
    pub email: String,
    pub role: String,
}

/// Nested usergroup projection embedded in resource dictionaries.
#[derive(Object, Debug, Clone, Serialize, Deserialize)]
pub struct UsergroupSummary {
    pub usergroup_id: i32,
    pub label: String,
}
