use poem_openapi::Object;
use serde::{Deserialize, Serialize};

use crate::types::dto::common::UserSummary;

#[derive(Object, Debug, Serialize, Deserialize)]
pub struct ContactDict {
    pub contact_id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub public: bool,
    pub creator: UserSummary,
}

#[derive(Object, Debug, Serialize, Deserialize)]
pub struct EditContactRequest {
    pub contact_id: Option<i32>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    /// Public contacts are visible to every user
    pub public: Option<bool>,
}

#[derive(Object, Debug, Serialize, Deserialize)]
pub struct DeleteContactRequest {
    pub contact_id: i32,
}

#[derive(Object, Debug, Serialize, Deserialize)]
pub struct ContactResponse {
    pub msg: String,
    pub success: i32,
    pub contact: ContactDict,
}

#[derive(Object, Debug, Serialize, Deserialize)]
pub struct ContactListResponse {
    pub msg: String,
    pub success: i32,
    pub contacts: Vec<ContactDict>,
}
