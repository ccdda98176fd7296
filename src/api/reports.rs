use poem_openapi::{payload::Json, OpenApi, Tags};
use std::sync::Arc;

use crate::api::{creator_summary, resolve_usergroup_ids, usergroup_summaries, BearerAuth};
use crate::errors::ApiError;
use crate::services::{authorize, Action, AuthService, ResourceKind};
use crate::stores::report_store::{ReportChanges, ReportData};
use crate::stores::{ReportStore, UsergroupStore, UserStore};
use crate::types::db::report;
use crate::types::dto::common::StatusResponse;
use crate::types::dto::report::{
    DeleteReportRequest, EditReportRequest, ReportDict, ReportListResponse, ReportResponse,
};

/// Report endpoints.
pub struct ReportApi {
    reports: Arc<ReportStore>,
    usergroups: Arc<UsergroupStore>,
    users: Arc<UserStore>,
    auth: Arc<AuthService>,
}

#[derive(Tags)]
enum ReportTags {
    /// Report management
    Reports,
}

impl ReportApi {
    pub fn new(
        reports: Arc<ReportStore>,
        usergroups: Arc<UsergroupStore>,
        users: Arc<UserStore>,
        auth: Arc<AuthService>,
    ) -> Self {
        Self {
            reports,
            usergroups,
            users,
            auth,
        }
    }

    async fn report_dict(&self, model: &report::Model) -> Result<ReportDict, ApiError> {
        let creator = creator_summary(&self.users, model.creator_id).await?;
        let usergroups = self.reports.usergroups_of(model.id).await?;
        Ok(ReportDict {
            report_id: model.id,
            label: model.label.clone(),
            parameters: model.parameters.clone(),
            created_on: model.created_on,
            last_published: model.last_published,
            creator,
            usergroups: usergroup_summaries(&usergroups),
        })
    }

    async fn dicts(&self, models: &[report::Model]) -> Result<Vec<ReportDict>, ApiError> {
        let mut dicts = Vec::with_capacity(models.len());
        for model in models {
            dicts.push(self.report_dict(model).await?);
        }
        Ok(dicts)
    }
}

#[OpenApi]
impl ReportApi {
    /// List every report, bypassing usergroup scoping
    #[oai(path = "/get_all_reports", method = "get", tag = "ReportTags::Reports")]
    async fn get_all_reports(&self, auth: BearerAuth) -> Result<Json<ReportListResponse>, ApiError> {
        let claims = self.auth.authenticate(&auth.0.token).await?;
        authorize(&claims, &Action::ViewAllResources(ResourceKind::Report))?;

        let reports = self.dicts(&self.reports.get_all().await?).await?;
        Ok(Json(ReportListResponse {
            msg: "Reports provided.".to_string(),
            success: 1,
            reports,
        }))
    }

    /// List the reports visible to the requester
    #[oai(path = "/get_user_reports", method = "get", tag = "ReportTags::Reports")]
    async fn get_user_reports(&self, auth: BearerAuth) -> Result<Json<ReportListResponse>, ApiError> {
        let claims = self.auth.authenticate(&auth.0.token).await?;

        let group_ids = self.usergroups.usergroup_ids_of(claims.user_id).await?;
        let reports = self.dicts(&self.reports.authorized(&group_ids).await?).await?;
        Ok(Json(ReportListResponse {
            msg: "Reports provided.".to_string(),
            success: 1,
            reports,
        }))
    }

    /// Create a report (no report_id in the body)
    #[oai(path = "/edit_report", method = "post", tag = "ReportTags::Reports")]
    async fn create_report(
        &self,
        auth: BearerAuth,
        body: Json<EditReportRequest>,
    ) -> Result<Json<ReportResponse>, ApiError> {
        let claims = self.auth.authenticate(&auth.0.token).await?;
        authorize(&claims, &Action::CreateResource(ResourceKind::Report))?;

        if body.report_id.is_some() {
            return Err(ApiError::validation(
                "Report_id provided with POST request. PATCH should be used to edit an existing report.",
            ));
        }

        let label = body
            .label
            .clone()
            .filter(|label| !label.is_empty())
            .ok_or_else(|| ApiError::validation("label is required."))?;
        let parameters = body
            .parameters
            .clone()
            .ok_or_else(|| ApiError::validation("parameters is required."))?;

        let usergroup_ids =
            resolve_usergroup_ids(&self.usergroups, claims.user_id, body.usergroup_ids.as_ref())
                .await?;

        let created = self
            .reports
            .create(ReportData { label, parameters }, claims.user_id, &usergroup_ids)
            .await?;

        Ok(Json(ReportResponse {
            msg: "Report successfully added.".to_string(),
            success: 1,
            report: self.report_dict(&created).await?,
        }))
    }

    /// Edit a report (report_id required)
    #[oai(path = "/edit_report", method = "patch", tag = "ReportTags::Reports")]
    async fn edit_report(
        &self,
        auth: BearerAuth,
        body: Json<EditReportRequest>,
    ) -> Result<Json<ReportResponse>, ApiError> {
        let claims = self.auth.authenticate(&auth.0.token).await?;
        authorize(&claims, &Action::EditResource(ResourceKind::Report))?;

        let report_id = body.report_id.ok_or_else(|| {
            ApiError::validation("No report_id provided. POST should be used to create a new report.")
        })?;

        if let Some(label) = &body.label {
            if label.is_empty() {
                return Err(ApiError::validation("label is required."));
            }
        }

        let usergroup_ids = body.usergroup_ids.clone().filter(|ids| !ids.is_empty());
        if let Some(ids) = &usergroup_ids {
            self.usergroups.ensure_exist(ids).await?;
        }

        let updated = self
            .reports
            .update(
                report_id,
                ReportChanges {
                    label: body.label.clone(),
                    parameters: body.parameters.clone(),
                    last_published: None,
                },
                usergroup_ids.as_deref(),
            )
            .await?;

        Ok(Json(ReportResponse {
            msg: "Report successfully edited.".to_string(),
            success: 1,
            report: self.report_dict(&updated).await?,
        }))
    }

    /// Delete a report
    #[oai(path = "/delete_report", method = "post", tag = "ReportTags::Reports")]
    async fn delete_report(
        &self,
        auth: BearerAuth,
        body: Json<DeleteReportRequest>,
    ) -> Result<Json<StatusResponse>, ApiError> {
        let claims = self.auth.authenticate(&auth.0.token).await?;
        authorize(&claims, &Action::DeleteResource(ResourceKind::Report))?;

        self.reports.delete(body.report_id).await?;
        Ok(Json(StatusResponse::ok("Report deleted.")))
    }
}
