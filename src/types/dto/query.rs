use poem_openapi::Object;
use serde::{Deserialize, Serialize};

use crate::types::dto::common::{UserSummary, UsergroupSummary};

#[derive(Object, Debug, Serialize, Deserialize)]
pub struct QueryDict {
    pub query_id: i32,
    pub label: String,
    pub raw_sql: String,
    pub creator: UserSummary,
    pub usergroups: Vec<UsergroupSummary>,
}

#[derive(Object, Debug, Serialize, Deserialize)]
pub struct EditQueryRequest {
    pub query_id: Option<i32>,
    pub label: Option<String>,
    pub raw_sql: Option<String>,
    /// Replaces the query's full usergroup set when non-empty
    pub usergroup_ids: Option<Vec<i32>>,
}

#[derive(Object, Debug, Serialize, Deserialize)]
pub struct DeleteQueryRequest {
    pub query_id: i32,
}

#[derive(Object, Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub msg: String,
    pub success: i32,
    pub query: QueryDict,
}

#[derive(Object, Debug, Serialize, Deserialize)]
pub struct QueryListResponse {
    pub msg: String,
    pub success: i32,
    pub queries: Vec<QueryDict>,
}
