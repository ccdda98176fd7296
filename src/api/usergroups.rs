use poem_openapi::{payload::Json, OpenApi, Tags};
use std::sync::Arc;

use crate::api::{usergroup_dict, BearerAuth};
use crate::errors::ApiError;
use crate::services::validators;
use crate::services::{authorize, Action, AuthService};
use crate::stores::UsergroupStore;
use crate::types::db::usergroup;
use crate::types::dto::common::StatusResponse;
use crate::types::dto::usergroup::{
    DeleteUsergroupRequest, EditUsergroupRequest, UsergroupListResponse, UsergroupResponse,
};

/// Shared usergroup administration. Personal groups are managed
/// exclusively by the user lifecycle and are rejected here.
pub struct UsergroupApi {
    usergroups: Arc<UsergroupStore>,
    auth: Arc<AuthService>,
}

#[derive(Tags)]
enum UsergroupTags {
    /// Usergroup administration
    Usergroups,
}

impl UsergroupApi {
    pub fn new(usergroups: Arc<UsergroupStore>, auth: Arc<AuthService>) -> Self {
        Self { usergroups, auth }
    }

    /// Append the edges named in the request to the group.
    async fn attach_edges(
        &self,
        group: &usergroup::Model,
        body: &EditUsergroupRequest,
    ) -> Result<(), ApiError> {
        if let Some(member_ids) = &body.member_ids {
            self.usergroups.add_members(group.id, member_ids).await?;
        }
        if let Some(connection_ids) = &body.connection_ids {
            self.usergroups
                .attach_connections(group.id, connection_ids)
                .await?;
        }
        if let Some(query_ids) = &body.query_ids {
            self.usergroups.attach_queries(group.id, query_ids).await?;
        }
        if let Some(chart_ids) = &body.chart_ids {
            self.usergroups.attach_charts(group.id, chart_ids).await?;
        }
        if let Some(report_ids) = &body.report_ids {
            self.usergroups.attach_reports(group.id, report_ids).await?;
        }
        Ok(())
    }
}

#[OpenApi]
impl UsergroupApi {
    /// List every usergroup
    #[oai(
        path = "/get_all_usergroups",
        method = "get",
        tag = "UsergroupTags::Usergroups"
    )]
    async fn get_all_usergroups(
        &self,
        auth: BearerAuth,
    ) -> Result<Json<UsergroupListResponse>, ApiError> {
        let claims = self.auth.authenticate(&auth.0.token).await?;
        authorize(&claims, &Action::ViewAllUsergroups)?;

        let mut usergroups = Vec::new();
        for group in self.usergroups.get_all().await? {
            usergroups.push(usergroup_dict(&self.usergroups, &group).await?);
        }
        Ok(Json(UsergroupListResponse {
            msg: "All usergroups provided.".to_string(),
            success: 1,
            usergroups,
        }))
    }

    /// Create a shared usergroup (no usergroup_id in the body)
    #[oai(
        path = "/edit_usergroup",
        method = "post",
        tag = "UsergroupTags::Usergroups"
    )]
    async fn create_usergroup(
        &self,
        auth: BearerAuth,
        body: Json<EditUsergroupRequest>,
    ) -> Result<Json<UsergroupResponse>, ApiError> {
        let claims = self.auth.authenticate(&auth.0.token).await?;
        authorize(&claims, &Action::CreateUsergroup)?;

        if body.usergroup_id.is_some() {
            return Err(ApiError::validation(
                "Usergroup_id provided with POST request. PATCH should be used to edit an existing usergroup.",
            ));
        }

        let label = validators::validate_usergroup_label(body.label.as_deref().unwrap_or(""))?;
        let created = self.usergroups.create(&label).await?;
        self.attach_edges(&created, &body).await?;

        Ok(Json(UsergroupResponse {
            msg: "Usergroup successfully created.".to_string(),
            success: 1,
            usergroup: usergroup_dict(&self.usergroups, &created).await?,
        }))
    }

    /// Edit a shared usergroup (usergroup_id required). Edge lists
    /// append; existing edges are kept.
    #[oai(
        path = "/edit_usergroup",
        method = "patch",
        tag = "UsergroupTags::Usergroups"
    )]
    async fn edit_usergroup(
        &self,
        auth: BearerAuth,
        body: Json<EditUsergroupRequest>,
    ) -> Result<Json<UsergroupResponse>, ApiError> {
        let claims = self.auth.authenticate(&auth.0.token).await?;

        let usergroup_id = body.usergroup_id.ok_or_else(|| {
            ApiError::validation(
                "No usergroup_id provided. POST should be used to create a new usergroup.",
            )
        })?;
        let group = self
            .usergroups
            .find_by_id(usergroup_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Provided usergroup_id not found."))?;

        authorize(
            &claims,
            &Action::EditUsergroup {
                personal: group.personal_group,
            },
        )?;

        let group = match body.label.as_deref() {
            Some(candidate) => {
                let label = validators::validate_usergroup_label(candidate)?;
                self.usergroups.rename(usergroup_id, &label).await?
            }
            None => group,
        };

        self.attach_edges(&group, &body).await?;

        Ok(Json(UsergroupResponse {
            msg: "Usergroup successfully edited.".to_string(),
            success: 1,
            usergroup: usergroup_dict(&self.usergroups, &group).await?,
        }))
    }

    /// Delete a shared usergroup and its edges
    #[oai(
        path = "/delete_usergroup",
        method = "post",
        tag = "UsergroupTags::Usergroups"
    )]
    async fn delete_usergroup(
        &self,
        auth: BearerAuth,
        body: Json<DeleteUsergroupRequest>,
    ) -> Result<Json<StatusResponse>, ApiError> {
        let claims = self.auth.authenticate(&auth.0.token).await?;

        let group = self
            .usergroups
            .find_by_id(body.usergroup_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Provided usergroup_id not found."))?;

        authorize(
            &claims,
            &Action::DeleteUsergroup {
                personal: group.personal_group,
            },
        )?;

        self.usergroups.delete(group.id).await?;
        Ok(Json(StatusResponse::ok("Usergroup deleted.")))
    }
}
