use poem_openapi::{payload::Json, OpenApi, Tags};
use std::sync::Arc;

use crate::api::{creator_summary, resolve_usergroup_ids, usergroup_summaries, BearerAuth};
use crate::errors::ApiError;
use crate::services::{authorize, Action, AuthService, ResourceKind};
use crate::stores::connection_store::{ConnectionChanges, ConnectionData};
use crate::stores::{ConnectionStore, UsergroupStore, UserStore};
use crate::types::db::connection;
use crate::types::dto::common::StatusResponse;
use crate::types::dto::connection::{
    ConnectionDict, ConnectionListResponse, ConnectionResponse, DeleteConnectionRequest,
    EditConnectionRequest,
};

/// Database-connection endpoints.
pub struct ConnectionApi {
    connections: Arc<ConnectionStore>,
    usergroups: Arc<UsergroupStore>,
    users: Arc<UserStore>,
    auth: Arc<AuthService>,
}

#[derive(Tags)]
enum ConnectionTags {
    /// Connection management
    Connections,
}

impl ConnectionApi {
    pub fn new(
        connections: Arc<ConnectionStore>,
        usergroups: Arc<UsergroupStore>,
        users: Arc<UserStore>,
        auth: Arc<AuthService>,
    ) -> Self {
        Self {
            connections,
            usergroups,
            users,
            auth,
        }
    }

    async fn connection_dict(&self, model: &connection::Model) -> Result<ConnectionDict, ApiError> {
        let creator = creator_summary(&self.users, model.creator_id).await?;
        let usergroups = self.connections.usergroups_of(model.id).await?;
        Ok(ConnectionDict {
            connection_id: model.id,
            label: model.label.clone(),
            db_type: model.db_type.clone(),
            host: model.host.clone(),
            port: model.port,
            username: model.username.clone(),
            database_name: model.database_name.clone(),
            creator,
            usergroups: usergroup_summaries(&usergroups),
        })
    }

    async fn dicts(&self, models: &[connection::Model]) -> Result<Vec<ConnectionDict>, ApiError> {
        let mut dicts = Vec::with_capacity(models.len());
        for model in models {
            dicts.push(self.connection_dict(model).await?);
        }
        Ok(dicts)
    }
}

#[OpenApi]
impl ConnectionApi {
    /// List every connection, bypassing usergroup scoping
    #[oai(
        path = "/get_all_connections",
        method = "get",
        tag = "ConnectionTags::Connections"
    )]
    pub async fn get_all_connections(
        &self,
        auth: BearerAuth,
    ) -> Result<Json<ConnectionListResponse>, ApiError> {
        let claims = self.auth.authenticate(&auth.0.token).await?;
        authorize(&claims, &Action::ViewAllResources(ResourceKind::Connection))?;

        let connections = self.dicts(&self.connections.get_all().await?).await?;
        Ok(Json(ConnectionListResponse {
            msg: "Connections provided.".to_string(),
            success: 1,
            connections,
        }))
    }

    /// List the connections visible to the requester through usergroup
    /// membership
    #[oai(
        path = "/get_user_connections",
        method = "get",
        tag = "ConnectionTags::Connections"
    )]
    pub async fn get_user_connections(
        &self,
        auth: BearerAuth,
    ) -> Result<Json<ConnectionListResponse>, ApiError> {
        let claims = self.auth.authenticate(&auth.0.token).await?;

        // Membership is resolved fresh so a new usergroup assignment is
        // visible without re-login.
        let group_ids = self.usergroups.usergroup_ids_of(claims.user_id).await?;
        let connections = self.dicts(&self.connections.authorized(&group_ids).await?).await?;
        Ok(Json(ConnectionListResponse {
            msg: "Connections provided.".to_string(),
            success: 1,
            connections,
        }))
    }

    /// Create a connection (no connection_id in the body)
    #[oai(
        path = "/edit_connection",
        method = "post",
        tag = "ConnectionTags::Connections"
    )]
    pub async fn create_connection(
        &self,
        auth: BearerAuth,
        body: Json<EditConnectionRequest>,
    ) -> Result<Json<ConnectionResponse>, ApiError> {
        let claims = self.auth.authenticate(&auth.0.token).await?;
        authorize(&claims, &Action::CreateResource(ResourceKind::Connection))?;

        if body.connection_id.is_some() {
            return Err(ApiError::validation(
                "Connection_id provided with POST request. PATCH should be used to edit an existing connection.",
            ));
        }

        let label = require(&body.label, "label")?;
        if label.is_empty() {
            return Err(ApiError::validation("label is required."));
        }
        let data = ConnectionData {
            label,
            db_type: require(&body.db_type, "db_type")?,
            host: require(&body.host, "host")?,
            port: body
                .port
                .ok_or_else(|| ApiError::validation("port is required."))?,
            username: require(&body.username, "username")?,
            password: require(&body.password, "password")?,
            database_name: require(&body.database_name, "database_name")?,
        };

        let usergroup_ids =
            resolve_usergroup_ids(&self.usergroups, claims.user_id, body.usergroup_ids.as_ref())
                .await?;

        let created = self
            .connections
            .create(data, claims.user_id, &usergroup_ids)
            .await?;

        Ok(Json(ConnectionResponse {
            msg: "Connection successfully added.".to_string(),
            success: 1,
            connection: self.connection_dict(&created).await?,
        }))
    }

    /// Edit a connection (connection_id required)
    #[oai(
        path = "/edit_connection",
        method = "patch",
        tag = "ConnectionTags::Connections"
    )]
    async fn edit_connection(
        &self,
        auth: BearerAuth,
        body: Json<EditConnectionRequest>,
    ) -> Result<Json<ConnectionResponse>, ApiError> {
        let claims = self.auth.authenticate(&auth.0.token).await?;
        authorize(&claims, &Action::EditResource(ResourceKind::Connection))?;

        let connection_id = body.connection_id.ok_or_else(|| {
            ApiError::validation(
                "No connection_id provided. POST should be used to create a new connection.",
            )
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
            .connections
            .update(
                connection_id,
                ConnectionChanges {
                    label: body.label.clone(),
                    db_type: body.db_type.clone(),
                    host: body.host.clone(),
                    port: body.port,
                    username: body.username.clone(),
                    password: body.password.clone(),
                    database_name: body.database_name.clone(),
                },
                usergroup_ids.as_deref(),
            )
            .await?;

        Ok(Json(ConnectionResponse {
            msg: "Connection successfully edited.".to_string(),
            success: 1,
            connection: self.connection_dict(&updated).await?,
        }))
    }

    /// Delete a connection
    #[oai(
        path = "/delete_connection",
        method = "post",
        tag = "ConnectionTags::Connections"
    )]
    async fn delete_connection(
        &self,
        auth: BearerAuth,
        body: Json<DeleteConnectionRequest>,
    ) -> Result<Json<StatusResponse>, ApiError> {
        let claims = self.auth.authenticate(&auth.0.token).await?;
        authorize(&claims, &Action::DeleteResource(ResourceKind::Connection))?;

        self.connections.delete(body.connection_id).await?;
        Ok(Json(StatusResponse::ok("Connection deleted.")))
    }
}

fn require(field: &Option<String>, name: &str) -> Result<String, ApiError> {
    field
        .clone()
        .ok_or_else(|| ApiError::validation(format!("{} is required.", name)))
}
