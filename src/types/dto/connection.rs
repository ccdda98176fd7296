use poem_openapi::Object;
use serde::{Deserialize, Serialize};

use crate::types::dto::common::{UserSummary, UsergroupSummary};

/// Canonical connection projection. The stored password never leaves
/// the server.
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct ConnectionDict {
    pub connection_id: i32,
    pub label: String,
    pub db_type: String,
    pub host: String,
    pub port: i32,
    pub username: String,
    pub database_name: String,
    pub creator: UserSummary,
    pub usergroups: Vec<UsergroupSummary>,
}

/// Create (POST, no connection_id) or edit (PATCH, connection_id
/// present) a connection.
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct EditConnectionRequest {
    pub connection_id: Option<i32>,
    pub label: Option<String>,
    pub db_type: Option<String>,
    pub host: Option<String>,
    pub port: Option<i32>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database_name: Option<String>,
    /// Replaces the connection's full usergroup set when non-empty
    pub usergroup_ids: Option<Vec<i32>>,
}

#[derive(Object, Debug, Serialize, Deserialize)]
pub struct DeleteConnectionRequest {
    pub connection_id: i32,
}

#[derive(Object, Debug, Serialize, Deserialize)]
pub struct ConnectionResponse {
    pub msg: String,
    pub success: i32,
    pub connection: ConnectionDict,
}

#[derive(Object, Debug, Serialize, Deserialize)]
pub struct ConnectionListResponse {
    pub msg: String,
    pub success: i32,
    pub connections: Vec<ConnectionDict>,
}
