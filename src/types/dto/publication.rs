use poem_openapi::Object;
use serde::{Deserialize, Serialize};

use crate::types::dto::common::UserSummary;
use crate::types::dto::contact::ContactDict;

#[derive(Object, Debug, Serialize, Deserialize)]
pub struct PublicationDict {
    pub publication_id: i32,
    #[oai(rename = "type")]
    #[serde(rename = "type")]
    pub pub_type: String,
    pub frequency: String,
    pub monday: bool,
    pub tuesday: bool,
    pub wednesday: bool,
    pub thursday: bool,
    pub friday: bool,
    pub saturday: bool,
    pub sunday: bool,
    pub day_of_month: Option<i32>,
    pub pub_time: Option<String>,
    pub notification_or_attachment: String,
    pub report_id: i32,
    pub creator: UserSummary,
    pub recipients: Vec<ContactDict>,
}

#[derive(Object, Debug, Serialize, Deserialize)]
pub struct EditPublicationRequest {
    pub publication_id: Option<i32>,
    #[oai(rename = "type")]
    #[serde(rename = "type")]
    pub pub_type: Option<String>,
    pub frequency: Option<String>,
    pub monday: Option<bool>,
    pub tuesday: Option<bool>,
    pub wednesday: Option<bool>,
    pub thursday: Option<bool>,
    pub friday: Option<bool>,
    pub saturday: Option<bool>,
    pub sunday: Option<bool>,
    pub day_of_month: Option<i32>,
    pub pub_time: Option<String>,
    pub notification_or_attachment: Option<String>,
    pub report_id: Option<i32>,
    /// Replaces the publication's full recipient set when non-empty
    pub recipient_ids: Option<Vec<i32>>,
}

#[derive(Object, Debug, Serialize, Deserialize)]
pub struct DeletePublicationRequest {
    pub publication_id: i32,
}

#[derive(Object, Debug, Serialize, Deserialize)]
pub struct PublicationResponse {
    pub msg: String,
    pub success: i32,
    pub publication: PublicationDict,
}

#[derive(Object, Debug, Serialize, Deserialize)]
pub struct PublicationListResponse {
    pub msg: String,
    pub success: i32,
    pub publications: Vec<PublicationDict>,
}
