use poem_openapi::{payload::Json, OpenApi, Tags};
use std::sync::Arc;

use crate::api::{creator_summary, BearerAuth};
use crate::errors::ApiError;
use crate::services::validators;
use crate::services::{authorize, Action, AuthService, ResourceKind};
use crate::stores::contact_store::{ContactChanges, ContactData};
use crate::stores::{ContactStore, UserStore};
use crate::types::db::contact;
use crate::types::dto::common::StatusResponse;
use crate::types::dto::contact::{
    ContactDict, ContactListResponse, ContactResponse, DeleteContactRequest, EditContactRequest,
};

/// Contact endpoints. Contacts are scoped by creator plus a public
/// flag, not by usergroups.
pub struct ContactApi {
    contacts: Arc<ContactStore>,
    users: Arc<UserStore>,
    auth: Arc<AuthService>,
}

#[derive(Tags)]
enum ContactTags {
    /// Contact management
    Contacts,
}

impl ContactApi {
    pub fn new(contacts: Arc<ContactStore>, users: Arc<UserStore>, auth: Arc<AuthService>) -> Self {
        Self {
            contacts,
            users,
            auth,
        }
    }

    async fn contact_dict(&self, model: &contact::Model) -> Result<ContactDict, ApiError> {
        let creator = creator_summary(&self.users, model.creator_id).await?;
        Ok(ContactDict {
            contact_id: model.id,
            first_name: model.first_name.clone(),
            last_name: model.last_name.clone(),
            email: model.email.clone(),
            public: model.public,
            creator,
        })
    }

    async fn dicts(&self, models: &[contact::Model]) -> Result<Vec<ContactDict>, ApiError> {
        let mut dicts = Vec::with_capacity(models.len());
        for model in models {
            dicts.push(self.contact_dict(model).await?);
        }
        Ok(dicts)
    }
}

#[OpenApi]
impl ContactApi {
    /// List every contact
    #[oai(path = "/get_all_contacts", method = "get", tag = "ContactTags::Contacts")]
    async fn get_all_contacts(&self, auth: BearerAuth) -> Result<Json<ContactListResponse>, ApiError> {
        let claims = self.auth.authenticate(&auth.0.token).await?;
        authorize(&claims, &Action::ViewAllResources(ResourceKind::Contact))?;

        let contacts = self.dicts(&self.contacts.get_all().await?).await?;
        Ok(Json(ContactListResponse {
            msg: "Contacts provided.".to_string(),
            success: 1,
            contacts,
        }))
    }

    /// Public contacts plus the requester's own
    #[oai(
        path = "/get_user_contacts",
        method = "get",
        tag = "ContactTags::Contacts"
    )]
    async fn get_user_contacts(
        &self,
        auth: BearerAuth,
    ) -> Result<Json<ContactListResponse>, ApiError> {
        let claims = self.auth.authenticate(&auth.0.token).await?;

        let contacts = self.dicts(&self.contacts.visible_to(claims.user_id).await?).await?;
        Ok(Json(ContactListResponse {
            msg: "Contacts provided.".to_string(),
            success: 1,
            contacts,
        }))
    }

    /// Create a contact (no contact_id in the body)
    #[oai(path = "/edit_contact", method = "post", tag = "ContactTags::Contacts")]
    async fn create_contact(
        &self,
        auth: BearerAuth,
        body: Json<EditContactRequest>,
    ) -> Result<Json<ContactResponse>, ApiError> {
        let claims = self.auth.authenticate(&auth.0.token).await?;
        authorize(&claims, &Action::CreateResource(ResourceKind::Contact))?;

        if body.contact_id.is_some() {
            return Err(ApiError::validation(
                "Contact_id provided with POST request. PATCH should be used to edit an existing contact.",
            ));
        }

        let first_name = body
            .first_name
            .clone()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ApiError::validation("first_name is required."))?;
        let email = validators::validate_email(body.email.as_deref().unwrap_or(""))?;

        let created = self
            .contacts
            .create(
                ContactData {
                    first_name,
                    last_name: body.last_name.clone().unwrap_or_default(),
                    email,
                    public: body.public.unwrap_or(false),
                },
                claims.user_id,
            )
            .await?;

        Ok(Json(ContactResponse {
            msg: "Contact successfully added.".to_string(),
            success: 1,
            contact: self.contact_dict(&created).await?,
        }))
    }

    /// Edit a contact (contact_id required)
    #[oai(path = "/edit_contact", method = "patch", tag = "ContactTags::Contacts")]
    async fn edit_contact(
        &self,
        auth: BearerAuth,
        body: Json<EditContactRequest>,
    ) -> Result<Json<ContactResponse>, ApiError> {
        let claims = self.auth.authenticate(&auth.0.token).await?;
        authorize(&claims, &Action::EditResource(ResourceKind::Contact))?;

        let contact_id = body.contact_id.ok_or_else(|| {
            ApiError::validation(
                "No contact_id provided. POST should be used to create a new contact.",
            )
        })?;

        let email = match body.email.as_deref() {
            Some(candidate) => Some(validators::validate_email(candidate)?),
            None => None,
        };

        let updated = self
            .contacts
            .update(
                contact_id,
                ContactChanges {
                    first_name: body.first_name.clone(),
                    last_name: body.last_name.clone(),
                    email,
                    public: body.public,
                },
            )
            .await?;

        Ok(Json(ContactResponse {
            msg: "Contact successfully edited.".to_string(),
            success: 1,
            contact: self.contact_dict(&updated).await?,
        }))
    }

    /// Delete a contact
    #[oai(path = "/delete_contact", method = "post", tag = "ContactTags::Contacts")]
    async fn delete_contact(
        &self,
        auth: BearerAuth,
        body: Json<DeleteContactRequest>,
    ) -> Result<Json<StatusResponse>, ApiError> {
        let claims = self.auth.authenticate(&auth.0.token).await?;
        authorize(&claims, &Action::DeleteResource(ResourceKind::Contact))?;

        self.contacts.delete(body.contact_id).await?;
        Ok(Json(StatusResponse::ok("Contact deleted.")))
    }
}
