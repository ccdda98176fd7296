use poem_openapi::Object;
use serde::{Deserialize, Serialize};

use crate::types::dto::common::UserSummary;

/// Canonical usergroup projection with member summaries.
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct UsergroupDict {
    pub usergroup_id: i32,
    pub label: String,
    pub personal_group: bool,
    pub members: Vec<UserSummary>,
}

/// Create (POST, no usergroup_id) or edit (PATCH, usergroup_id present)
/// a shared usergroup. The id lists append edges; existing edges stay.
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct EditUsergroupRequest {
    pub usergroup_id: Option<i32>,
    pub label: Option<String>,
    pub member_ids: Option<Vec<i32>>,
    pub connection_ids: Option<Vec<i32>>,
    pub query_ids: Option<Vec<i32>>,
    pub chart_ids: Option<Vec<i32>>,
    pub report_ids: Option<Vec<i32>>,
}

#[derive(Object, Debug, Serialize, Deserialize)]
pub struct DeleteUsergroupRequest {
    pub usergroup_id: i32,
}

#[derive(Object, Debug, Serialize, Deserialize)]
pub struct UsergroupResponse {
    pub msg: String,
    pub success: i32,
    pub usergroup: UsergroupDict,
}

#[derive(Object, Debug, Serialize, Deserialize)]
pub struct UsergroupListResponse {
    pub msg: String,
    pub success: i32,
    pub usergroups: Vec<UsergroupDict>,
}
