use poem_openapi::{payload::Json, OpenApi, Tags};
use std::sync::Arc;

use crate::api::{creator_summary, resolve_usergroup_ids, usergroup_summaries, BearerAuth};
use crate::errors::ApiError;
use crate::services::{authorize, Action, AuthService, ResourceKind};
use crate::stores::chart_store::{ChartChanges, ChartData};
use crate::stores::{ChartStore, ConnectionStore, QueryStore, UsergroupStore, UserStore};
use crate::types::db::chart;
use crate::types::dto::chart::{
    ChartDict, ChartListResponse, ChartResponse, DeleteChartRequest, EditChartRequest,
};
use crate::types::dto::common::StatusResponse;

/// Chart endpoints. A chart binds a saved query to a connection, so
/// both references are checked before any write.
pub struct ChartApi {
    charts: Arc<ChartStore>,
    queries: Arc<QueryStore>,
    connections: Arc<ConnectionStore>,
    usergroups: Arc<UsergroupStore>,
    users: Arc<UserStore>,
    auth: Arc<AuthService>,
}

#[derive(Tags)]
enum ChartTags {
    /// Chart management
    Charts,
}

impl ChartApi {
    pub fn new(
        charts: Arc<ChartStore>,
        queries: Arc<QueryStore>,
        connections: Arc<ConnectionStore>,
        usergroups: Arc<UsergroupStore>,
        users: Arc<UserStore>,
        auth: Arc<AuthService>,
    ) -> Self {
        Self {
            charts,
            queries,
            connections,
            usergroups,
            users,
            auth,
        }
    }

    async fn chart_dict(&self, model: &chart::Model) -> Result<ChartDict, ApiError> {
        let creator = creator_summary(&self.users, model.creator_id).await?;
        let usergroups = self.charts.usergroups_of(model.id).await?;
        Ok(ChartDict {
            chart_id: model.id,
            label: model.label.clone(),
            chart_type: model.chart_type.clone(),
            parameters: model.parameters.clone(),
            query_id: model.query_id,
            connection_id: model.connection_id,
            creator,
            usergroups: usergroup_summaries(&usergroups),
        })
    }

    async fn dicts(&self, models: &[chart::Model]) -> Result<Vec<ChartDict>, ApiError> {
        let mut dicts = Vec::with_capacity(models.len());
        for model in models {
            dicts.push(self.chart_dict(model).await?);
        }
        Ok(dicts)
    }

    async fn ensure_query_exists(&self, query_id: i32) -> Result<(), ApiError> {
        self.queries
            .find_by_id(query_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| ApiError::not_found("Query not recognized."))
    }

    async fn ensure_connection_exists(&self, connection_id: i32) -> Result<(), ApiError> {
        self.connections
            .find_by_id(connection_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| ApiError::not_found("Connection not recognized."))
    }
}

#[OpenApi]
impl ChartApi {
    /// List every chart, bypassing usergroup scoping
    #[oai(path = "/get_all_charts", method = "get", tag = "ChartTags::Charts")]
    async fn get_all_charts(&self, auth: BearerAuth) -> Result<Json<ChartListResponse>, ApiError> {
        let claims = self.auth.authenticate(&auth.0.token).await?;
        authorize(&claims, &Action::ViewAllResources(ResourceKind::Chart))?;

        let charts = self.dicts(&self.charts.get_all().await?).await?;
        Ok(Json(ChartListResponse {
            msg: "Charts provided.".to_string(),
            success: 1,
            charts,
        }))
    }

    /// List the charts visible to the requester
    #[oai(path = "/get_user_charts", method = "get", tag = "ChartTags::Charts")]
    async fn get_user_charts(&self, auth: BearerAuth) -> Result<Json<ChartListResponse>, ApiError> {
        let claims = self.auth.authenticate(&auth.0.token).await?;

        let group_ids = self.usergroups.usergroup_ids_of(claims.user_id).await?;
        let charts = self.dicts(&self.charts.authorized(&group_ids).await?).await?;
        Ok(Json(ChartListResponse {
            msg: "Charts provided.".to_string(),
            success: 1,
            charts,
        }))
    }

    /// Create a chart (no chart_id in the body)
    #[oai(path = "/edit_chart", method = "post", tag = "ChartTags::Charts")]
    async fn create_chart(
        &self,
        auth: BearerAuth,
        body: Json<EditChartRequest>,
    ) -> Result<Json<ChartResponse>, ApiError> {
        let claims = self.auth.authenticate(&auth.0.token).await?;
        authorize(&claims, &Action::CreateResource(ResourceKind::Chart))?;

        if body.chart_id.is_some() {
            return Err(ApiError::validation(
                "Chart_id provided with POST request. PATCH should be used to edit an existing chart.",
            ));
        }

        let label = body
            .label
            .clone()
            .filter(|label| !label.is_empty())
            .ok_or_else(|| ApiError::validation("label is required."))?;
        let chart_type = body
            .chart_type
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::validation("type is required."))?;
        let parameters = body
            .parameters
            .clone()
            .ok_or_else(|| ApiError::validation("parameters is required."))?;
        let query_id = body
            .query_id
            .ok_or_else(|| ApiError::validation("query_id is required."))?;
        let connection_id = body
            .connection_id
            .ok_or_else(|| ApiError::validation("connection_id is required."))?;

        self.ensure_query_exists(query_id).await?;
        self.ensure_connection_exists(connection_id).await?;

        let usergroup_ids =
            resolve_usergroup_ids(&self.usergroups, claims.user_id, body.usergroup_ids.as_ref())
                .await?;

        let created = self
            .charts
            .create(
                ChartData {
                    label,
                    chart_type,
                    parameters,
                    query_id,
                    connection_id,
                },
                claims.user_id,
                &usergroup_ids,
            )
            .await?;

        Ok(Json(ChartResponse {
            msg: "Chart successfully added.".to_string(),
            success: 1,
            chart: self.chart_dict(&created).await?,
        }))
    }

    /// Edit a chart (chart_id required)
    #[oai(path = "/edit_chart", method = "patch", tag = "ChartTags::Charts")]
    async fn edit_chart(
        &self,
        auth: BearerAuth,
        body: Json<EditChartRequest>,
    ) -> Result<Json<ChartResponse>, ApiError> {
        let claims = self.auth.authenticate(&auth.0.token).await?;
        authorize(&claims, &Action::EditResource(ResourceKind::Chart))?;

        let chart_id = body.chart_id.ok_or_else(|| {
            ApiError::validation("No chart_id provided. POST should be used to create a new chart.")
        })?;

        if let Some(label) = &body.label {
            if label.is_empty() {
                return Err(ApiError::validation("label is required."));
            }
        }
        if let Some(query_id) = body.query_id {
            self.ensure_query_exists(query_id).await?;
        }
        if let Some(connection_id) = body.connection_id {
            self.ensure_connection_exists(connection_id).await?;
        }

        let usergroup_ids = body.usergroup_ids.clone().filter(|ids| !ids.is_empty());
        if let Some(ids) = &usergroup_ids {
            self.usergroups.ensure_exist(ids).await?;
        }

        let updated = self
            .charts
            .update(
                chart_id,
                ChartChanges {
                    label: body.label.clone(),
                    chart_type: body.chart_type.clone(),
                    parameters: body.parameters.clone(),
                    query_id: body.query_id,
                    connection_id: body.connection_id,
                },
                usergroup_ids.as_deref(),
            )
            .await?;

        Ok(Json(ChartResponse {
            msg: "Chart successfully edited.".to_string(),
            success: 1,
            chart: self.chart_dict(&updated).await?,
        }))
    }

    /// Delete a chart
    #[oai(path = "/delete_chart", method = "post", tag = "ChartTags::Charts")]
    async fn delete_chart(
        &self,
        auth: BearerAuth,
        body: Json<DeleteChartRequest>,
    ) -> Result<Json<StatusResponse>, ApiError> {
        let claims = self.auth.authenticate(&auth.0.token).await?;
        authorize(&claims, &Action::DeleteResource(ResourceKind::Chart))?;

        self.charts.delete(body.chart_id).await?;
        Ok(Json(StatusResponse::ok("Chart deleted.")))
    }
}
