use poem_openapi::{param::Query, payload::Json, OpenApi, Tags};
use std::sync::Arc;

use crate::api::{creator_summary, BearerAuth};
use crate::errors::ApiError;
use crate::services::{authorize, Action, AuthService, ResourceKind};
use crate::stores::publication_store::{PublicationChanges, PublicationData};
use crate::stores::{ContactStore, PublicationStore, ReportStore, UsergroupStore, UserStore};
use crate::types::db::publication;
use crate::types::dto::common::StatusResponse;
use crate::types::dto::contact::ContactDict;
use crate::types::dto::publication::{
    DeletePublicationRequest, EditPublicationRequest, PublicationDict, PublicationListResponse,
    PublicationResponse,
};

/// Publication scheduling endpoints. Delivery itself is out of scope;
/// these manage the schedule records and recipient lists.
pub struct PublicationApi {
    publications: Arc<PublicationStore>,
    reports: Arc<ReportStore>,
    contacts: Arc<ContactStore>,
    usergroups: Arc<UsergroupStore>,
    users: Arc<UserStore>,
    auth: Arc<AuthService>,
}

#[derive(Tags)]
enum PublicationTags {
    /// Publication management
    Publications,
}

impl PublicationApi {
    pub fn new(
        publications: Arc<PublicationStore>,
        reports: Arc<ReportStore>,
        contacts: Arc<ContactStore>,
        usergroups: Arc<UsergroupStore>,
        users: Arc<UserStore>,
        auth: Arc<AuthService>,
    ) -> Self {
        Self {
            publications,
            reports,
            contacts,
            usergroups,
            users,
            auth,
        }
    }

    async fn publication_dict(&self, model: &publication::Model) -> Result<PublicationDict, ApiError> {
        let creator = creator_summary(&self.users, model.creator_id).await?;
        let mut recipients = Vec::new();
        for recipient in self.publications.recipients_of(model.id).await? {
            recipients.push(ContactDict {
                contact_id: recipient.id,
                first_name: recipient.first_name.clone(),
                last_name: recipient.last_name.clone(),
                email: recipient.email.clone(),
                public: recipient.public,
                creator: creator_summary(&self.users, recipient.creator_id).await?,
            });
        }
        Ok(PublicationDict {
            publication_id: model.id,
            pub_type: model.pub_type.clone(),
            frequency: model.frequency.clone(),
            monday: model.monday,
            tuesday: model.tuesday,
            wednesday: model.wednesday,
            thursday: model.thursday,
            friday: model.friday,
            saturday: model.saturday,
            sunday: model.sunday,
            day_of_month: model.day_of_month,
            pub_time: model.pub_time.clone(),
            notification_or_attachment: model.notification_or_attachment.clone(),
            report_id: model.report_id,
            creator,
            recipients,
        })
    }

    async fn dicts(&self, models: &[publication::Model]) -> Result<Vec<PublicationDict>, ApiError> {
        let mut dicts = Vec::with_capacity(models.len());
        for model in models {
            dicts.push(self.publication_dict(model).await?);
        }
        Ok(dicts)
    }

    async fn ensure_contacts_exist(&self, contact_ids: &[i32]) -> Result<(), ApiError> {
        for contact_id in contact_ids {
            if self.contacts.find_by_id(*contact_id).await?.is_none() {
                return Err(ApiError::not_found("Contact not recognized."));
            }
        }
        Ok(())
    }
}

#[OpenApi]
impl PublicationApi {
    /// List every publication
    #[oai(
        path = "/get_all_publications",
        method = "get",
        tag = "PublicationTags::Publications"
    )]
    async fn get_all_publications(
        &self,
        auth: BearerAuth,
    ) -> Result<Json<PublicationListResponse>, ApiError> {
        let claims = self.auth.authenticate(&auth.0.token).await?;
        authorize(&claims, &Action::ViewAllResources(ResourceKind::Publication))?;

        let publications = self.dicts(&self.publications.get_all().await?).await?;
        Ok(Json(PublicationListResponse {
            msg: "Publications provided.".to_string(),
            success: 1,
            publications,
        }))
    }

    /// Publications of one report; the report must be visible to the
    /// requester
    #[oai(
        path = "/get_report_publications",
        method = "get",
        tag = "PublicationTags::Publications"
    )]
    async fn get_report_publications(
        &self,
        auth: BearerAuth,
        report_id: Query<i32>,
    ) -> Result<Json<PublicationListResponse>, ApiError> {
        let claims = self.auth.authenticate(&auth.0.token).await?;

        self.reports
            .find_by_id(report_id.0)
            .await?
            .ok_or_else(|| ApiError::not_found("Report not recognized."))?;

        if !claims.role.is_admin() {
            let group_ids = self.usergroups.usergroup_ids_of(claims.user_id).await?;
            let visible = self.reports.authorized_ids(&group_ids).await?;
            if !visible.contains(&report_id.0) {
                return Err(ApiError::authorization(
                    "Current user does not have permission to view this report.",
                ));
            }
        }

        let publications = self
            .dicts(&self.publications.for_report(report_id.0).await?)
            .await?;
        Ok(Json(PublicationListResponse {
            msg: "Publications provided.".to_string(),
            success: 1,
            publications,
        }))
    }

    /// Create a publication (no publication_id in the body)
    #[oai(
        path = "/edit_publication",
        method = "post",
        tag = "PublicationTags::Publications"
    )]
    async fn create_publication(
        &self,
        auth: BearerAuth,
        body: Json<EditPublicationRequest>,
    ) -> Result<Json<PublicationResponse>, ApiError> {
        let claims = self.auth.authenticate(&auth.0.token).await?;
        authorize(&claims, &Action::CreateResource(ResourceKind::Publication))?;

        if body.publication_id.is_some() {
            return Err(ApiError::validation(
                "Publication_id provided with POST request. PATCH should be used to edit an existing publication.",
            ));
        }

        let pub_type = body
            .pub_type
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::validation("type is required."))?;
        let frequency = body
            .frequency
            .clone()
            .filter(|f| !f.is_empty())
            .ok_or_else(|| ApiError::validation("frequency is required."))?;
        let notification_or_attachment = body
            .notification_or_attachment
            .clone()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ApiError::validation("notification_or_attachment is required."))?;
        let report_id = body
            .report_id
            .ok_or_else(|| ApiError::validation("report_id is required."))?;

        self.reports
            .find_by_id(report_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Report not recognized."))?;

        let recipient_ids = body.recipient_ids.clone().unwrap_or_default();
        self.ensure_contacts_exist(&recipient_ids).await?;

        let created = self
            .publications
            .create(
                PublicationData {
                    pub_type,
                    frequency,
                    monday: body.monday.unwrap_or(false),
                    tuesday: body.tuesday.unwrap_or(false),
                    wednesday: body.wednesday.unwrap_or(false),
                    thursday: body.thursday.unwrap_or(false),
                    friday: body.friday.unwrap_or(false),
                    saturday: body.saturday.unwrap_or(false),
                    sunday: body.sunday.unwrap_or(false),
                    day_of_month: body.day_of_month,
                    pub_time: body.pub_time.clone(),
                    notification_or_attachment,
                    report_id,
                },
                claims.user_id,
                &recipient_ids,
            )
            .await?;

        Ok(Json(PublicationResponse {
            msg: "Publication successfully added.".to_string(),
            success: 1,
            publication: self.publication_dict(&created).await?,
        }))
    }

    /// Edit a publication (publication_id required)
    #[oai(
        path = "/edit_publication",
        method = "patch",
        tag = "PublicationTags::Publications"
    )]
    async fn edit_publication(
        &self,
        auth: BearerAuth,
        body: Json<EditPublicationRequest>,
    ) -> Result<Json<PublicationResponse>, ApiError> {
        let claims = self.auth.authenticate(&auth.0.token).await?;
        authorize(&claims, &Action::EditResource(ResourceKind::Publication))?;

        let publication_id = body.publication_id.ok_or_else(|| {
            ApiError::validation(
                "No publication_id provided. POST should be used to create a new publication.",
            )
        })?;

        let recipient_ids = body.recipient_ids.clone().filter(|ids| !ids.is_empty());
        if let Some(ids) = &recipient_ids {
            self.ensure_contacts_exist(ids).await?;
        }

        let updated = self
            .publications
            .update(
                publication_id,
                PublicationChanges {
                    pub_type: body.pub_type.clone(),
                    frequency: body.frequency.clone(),
                    monday: body.monday,
                    tuesday: body.tuesday,
                    wednesday: body.wednesday,
                    thursday: body.thursday,
                    friday: body.friday,
                    saturday: body.saturday,
                    sunday: body.sunday,
                    day_of_month: body.day_of_month,
                    pub_time: body.pub_time.clone(),
                    notification_or_attachment: body.notification_or_attachment.clone(),
                },
                recipient_ids.as_deref(),
            )
            .await?;

        Ok(Json(PublicationResponse {
            msg: "Publication successfully edited.".to_string(),
            success: 1,
            publication: self.publication_dict(&updated).await?,
        }))
    }

    /// Delete a publication
    #[oai(
        path = "/delete_publication",
        method = "post",
        tag = "PublicationTags::Publications"
    )]
    async fn delete_publication(
        &self,
        auth: BearerAuth,
        body: Json<DeletePublicationRequest>,
    ) -> Result<Json<StatusResponse>, ApiError> {
        let claims = self.auth.authenticate(&auth.0.token).await?;
        authorize(&claims, &Action::DeleteResource(ResourceKind::Publication))?;

        self.publications.delete(body.publication_id).await?;
        Ok(Json(StatusResponse::ok("Publication deleted.")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::TokenService;
    use crate::stores::contact_store::ContactData;
    use crate::stores::report_store::ReportData;
    use crate::stores::user_store::NewUser;
    use crate::stores::TokenBlacklistStore;
    use crate::types::internal::Role;
    use migration::{Migrator, MigratorTrait};
    use poem_openapi::auth::Bearer;
    use sea_orm::Database;

    struct Fixture {
        api: PublicationApi,
        writer_token: String,
        bob_token: String,
        admin_token: String,
        report_id: i32,
        contact_id: i32,
    }

    async fn setup() -> Fixture {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to create test database");
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        let users = Arc::new(UserStore::new(db.clone(), "test-pepper".to_string()));
        let usergroups = Arc::new(UsergroupStore::new(db.clone()));
        let reports = Arc::new(ReportStore::new(db.clone()));
        let contacts = Arc::new(ContactStore::new(db.clone()));
        let publications = Arc::new(PublicationStore::new(db.clone()));
        let blacklist = Arc::new(TokenBlacklistStore::new(db));
        let tokens = Arc::new(TokenService::new(
            "test-secret-key-minimum-32-characters-long".to_string(),
            60,
        ));
        let auth = Arc::new(AuthService::new(
            users.clone(),
            usergroups.clone(),
            blacklist,
            tokens,
        ));

        let writer = users
            .create_user(
                NewUser {
                    username: "writeruser".to_string(),
                    email: "writer@whitehouse.gov".to_string(),
                    password: "Secret123".to_string(),
                    role: Role::Writer,
                },
                &[],
            )
            .await
            .unwrap();
        users
            .create_user(
                NewUser {
                    username: "bobwriter".to_string(),
                    email: "bob@whitehouse.gov".to_string(),
                    password: "Secret123".to_string(),
                    role: Role::Writer,
                },
                &[],
            )
            .await
            .unwrap();
        users
            .create_user(
                NewUser {
                    username: "adminuser".to_string(),
                    email: "admin@whitehouse.gov".to_string(),
                    password: "Secret123".to_string(),
                    role: Role::Admin,
                },
                &[],
            )
            .await
            .unwrap();

        let personal = usergroups
            .personal_group_of(writer.id)
            .await
            .unwrap()
            .unwrap();
        let report = reports
            .create(
                ReportData {
                    label: "weekly_kpis".to_string(),
                    parameters: "{}".to_string(),
                },
                writer.id,
                &[personal.id],
            )
            .await
            .unwrap();
        let contact = contacts
            .create(
                ContactData {
                    first_name: "josiah".to_string(),
                    last_name: "bartlet".to_string(),
                    email: "jbartlet@whitehouse.gov".to_string(),
                    public: true,
                },
                writer.id,
            )
            .await
            .unwrap();

        let writer_token = auth.login("writeruser", "Secret123").await.unwrap();
        let bob_token = auth.login("bobwriter", "Secret123").await.unwrap();
        let admin_token = auth.login("adminuser", "Secret123").await.unwrap();

        Fixture {
            api: PublicationApi::new(publications, reports, contacts, usergroups, users, auth),
            writer_token,
            bob_token,
            admin_token,
            report_id: report.id,
            contact_id: contact.id,
        }
    }

    fn bearer(token: &str) -> BearerAuth {
        BearerAuth(Bearer {
            token: token.to_string(),
        })
    }

    fn create_body(report_id: i32, recipient_ids: Vec<i32>) -> Json<EditPublicationRequest> {
        Json(EditPublicationRequest {
            publication_id: None,
            pub_type: Some("email".to_string()),
            frequency: Some("weekly".to_string()),
            monday: Some(true),
            tuesday: None,
            wednesday: None,
            thursday: None,
            friday: None,
            saturday: None,
            sunday: None,
            day_of_month: None,
            pub_time: Some("08:30".to_string()),
            notification_or_attachment: Some("attachment".to_string()),
            report_id: Some(report_id),
            recipient_ids: Some(recipient_ids),
        })
    }

    #[tokio::test]
    async fn test_create_and_list_for_visible_report() {
        let fix = setup().await;

        let created = fix
            .api
            .create_publication(
                bearer(&fix.writer_token),
                create_body(fix.report_id, vec![fix.contact_id]),
            )
            .await
            .unwrap();
        assert_eq!(created.publication.recipients.len(), 1);
        assert_eq!(created.publication.recipients[0].first_name, "josiah");

        let listed = fix
            .api
            .get_report_publications(bearer(&fix.writer_token), Query(fix.report_id))
            .await
            .unwrap();
        assert_eq!(listed.publications.len(), 1);
        assert!(listed.publications[0].monday);
    }

    #[tokio::test]
    async fn test_report_publications_hidden_without_membership() {
        let fix = setup().await;

        fix.api
            .create_publication(bearer(&fix.writer_token), create_body(fix.report_id, vec![]))
            .await
            .unwrap();

        // Bob shares no usergroup with the report.
        let result = fix
            .api
            .get_report_publications(bearer(&fix.bob_token), Query(fix.report_id))
            .await;
        assert!(matches!(result, Err(ApiError::Authorization(_))));

        // The admin bypasses scoping.
        let listed = fix
            .api
            .get_report_publications(bearer(&fix.admin_token), Query(fix.report_id))
            .await
            .unwrap();
        assert_eq!(listed.publications.len(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_report_and_contact() {
        let fix = setup().await;

        let result = fix
            .api
            .create_publication(bearer(&fix.writer_token), create_body(99999, vec![]))
            .await;
        match result {
            Err(ApiError::NotFound(json)) => assert_eq!(json.0.msg, "Report not recognized."),
            _ => panic!("Expected NotFound error"),
        }

        let result = fix
            .api
            .create_publication(
                bearer(&fix.writer_token),
                create_body(fix.report_id, vec![99999]),
            )
            .await;
        match result {
            Err(ApiError::NotFound(json)) => assert_eq!(json.0.msg, "Contact not recognized."),
            _ => panic!("Expected NotFound error"),
        }
    }

    #[tokio::test]
    async fn test_get_all_publications_is_admin_gated() {
        let fix = setup().await;

        let result = fix.api.get_all_publications(bearer(&fix.writer_token)).await;
        assert!(matches!(result, Err(ApiError::Authorization(_))));

        let listed = fix
            .api
            .get_all_publications(bearer(&fix.admin_token))
            .await
            .unwrap();
        assert!(listed.publications.is_empty());
    }
}
