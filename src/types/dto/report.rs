use poem_openapi::Object;
use serde::{Deserialize, Serialize};

use crate::types::dto::common::{UserSummary, UsergroupSummary};

#[derive(Object, Debug, Serialize, Deserialize)]
pub struct ReportDict {
    pub report_id: i32,
    pub label: String,
    pub parameters: String,
    pub created_on: i64,
    pub last_published: Option<i64>,
    pub creator: UserSummary,
    pub usergroups: Vec<UsergroupSummary>,
}

#[derive(Object, Debug, Serialize, Deserialize)]
pub struct EditReportRequest {
    pub report_id: Option<i32>,
    pub label: Option<String>,
    pub parameters: Option<String>,
    /// Replaces the report's full usergroup set when non-empty
    pub usergroup_ids: Option<Vec<i32>>,
}

#[derive(Object, Debug, Serialize, Deserialize)]
pub struct DeleteReportRequest {
    pub report_id: i32,
}

#[derive(Object, Debug, Serialize, Deserialize)]
pub struct ReportResponse {
    pub msg: String,
    pub success: i32,
    pub report: ReportDict,
}

#[derive(Object, Debug, Serialize, Deserialize)]
pub struct ReportListResponse {
    pub msg: String,
    pub success: i32,
    pub reports: Vec<ReportDict>,
}
