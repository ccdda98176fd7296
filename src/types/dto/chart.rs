use poem_openapi::Object;
use serde::{Deserialize, Serialize};

use crate::types::dto::common::{UserSummary, UsergroupSummary};

#[derive(Object, Debug, Serialize, Deserialize)]
pub struct ChartDict {
    pub chart_id: i32,
    pub label: String,
    #[oai(rename = "type")]
    #[serde(rename = "type")]
    pub chart_type: String,
    pub parameters: String,
    pub query_id: i32,
    pub connection_id: i32,
    pub creator: UserSummary,
    pub usergroups: Vec<UsergroupSummary>,
}

#[derive(Object, Debug, Serialize, Deserialize)]
pub struct EditChartRequest {
    pub chart_id: Option<i32>,
    pub label: Option<String>,
    #[oai(rename = "type")]
    #[serde(rename = "type")]
    pub chart_type: Option<String>,
    pub parameters: Option<String>,
    pub query_id: Option<i32>,
    pub connection_id: Option<i32>,
    /// Replaces the chart's full usergroup set when non-empty
    pub usergroup_ids: Option<Vec<i32>>,
}

#[derive(Object, Debug, Serialize, Deserialize)]
pub struct DeleteChartRequest {
    pub chart_id: i32,
}

#[derive(Object, Debug, Serialize, Deserialize)]
pub struct ChartResponse {
    pub msg: String,
    pub success: i32,
    pub chart: ChartDict,
}

#[derive(Object, Debug, Serialize, Deserialize)]
pub struct ChartListResponse {
    pub msg: String,
    pub success: i32,
    pub charts: Vec<ChartDict>,
}
