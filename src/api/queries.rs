use poem_openapi::{payload::Json, OpenApi, Tags};
use std::sync::Arc;

use crate::api::{creator_summary, resolve_usergroup_ids, usergroup_summaries, BearerAuth};
use crate::errors::ApiError;
use crate::services::{authorize, Action, AuthService, ResourceKind};
use crate::stores::query_store::{QueryChanges, QueryData};
use crate::stores::{QueryStore, UsergroupStore, UserStore};
use crate::types::db::sql_query;
use crate::types::dto::common::StatusResponse;
use crate::types::dto::query::{
    DeleteQueryRequest, EditQueryRequest, QueryDict, QueryListResponse, QueryResponse,
};

/// Saved-query endpoints.
pub struct QueryApi {
    queries: Arc<QueryStore>,
    usergroups: Arc<UsergroupStore>,
    users: Arc<UserStore>,
    auth: Arc<AuthService>,
}

#[derive(Tags)]
enum QueryTags {
    /// Saved query management
    Queries,
}

impl QueryApi {
    pub fn new(
        queries: Arc<QueryStore>,
        usergroups: Arc<UsergroupStore>,
        users: Arc<UserStore>,
        auth: Arc<AuthService>,
    ) -> Self {
        Self {
            queries,
            usergroups,
            users,
            auth,
        }
    }

    async fn query_dict(&self, model: &sql_query::Model) -> Result<QueryDict, ApiError> {
        let creator = creator_summary(&self.users, model.creator_id).await?;
        let usergroups = self.queries.usergroups_of(model.id).await?;
        Ok(QueryDict {
            query_id: model.id,
            label: model.label.clone(),
            raw_sql: model.raw_sql.clone(),
            creator,
            usergroups: usergroup_summaries(&usergroups),
        })
    }

    async fn dicts(&self, models: &[sql_query::Model]) -> Result<Vec<QueryDict>, ApiError> {
        let mut dicts = Vec::with_capacity(models.len());
        for model in models {
            dicts.push(self.query_dict(model).await?);
        }
        Ok(dicts)
    }
}

#[OpenApi]
impl QueryApi {
    /// List every saved query, bypassing usergroup scoping
    #[oai(path = "/get_all_queries", method = "get", tag = "QueryTags::Queries")]
    async fn get_all_queries(&self, auth: BearerAuth) -> Result<Json<QueryListResponse>, ApiError> {
        let claims = self.auth.authenticate(&auth.0.token).await?;
        authorize(&claims, &Action::ViewAllResources(ResourceKind::Query))?;

        let queries = self.dicts(&self.queries.get_all().await?).await?;
        Ok(Json(QueryListResponse {
            msg: "Queries provided.".to_string(),
            success: 1,
            queries,
        }))
    }

    /// List the queries visible to the requester
    #[oai(path = "/get_user_queries", method = "get", tag = "QueryTags::Queries")]
    async fn get_user_queries(&self, auth: BearerAuth) -> Result<Json<QueryListResponse>, ApiError> {
        let claims = self.auth.authenticate(&auth.0.token).await?;

        let group_ids = self.usergroups.usergroup_ids_of(claims.user_id).await?;
        let queries = self.dicts(&self.queries.authorized(&group_ids).await?).await?;
        Ok(Json(QueryListResponse {
            msg: "Queries provided.".to_string(),
            success: 1,
            queries,
        }))
    }

    /// Create a saved query (no query_id in the body)
    #[oai(path = "/edit_query", method = "post", tag = "QueryTags::Queries")]
    async fn create_query(
        &self,
        auth: BearerAuth,
        body: Json<EditQueryRequest>,
    ) -> Result<Json<QueryResponse>, ApiError> {
        let claims = self.auth.authenticate(&auth.0.token).await?;
        authorize(&claims, &Action::CreateResource(ResourceKind::Query))?;

        if body.query_id.is_some() {
            return Err(ApiError::validation(
                "Query_id provided with POST request. PATCH should be used to edit an existing query.",
            ));
        }

        let label = body
            .label
            .clone()
            .filter(|label| !label.is_empty())
            .ok_or_else(|| ApiError::validation("label is required."))?;
        let raw_sql = body
            .raw_sql
            .clone()
            .filter(|sql| !sql.is_empty())
            .ok_or_else(|| ApiError::validation("raw_sql is required."))?;

        let usergroup_ids =
            resolve_usergroup_ids(&self.usergroups, claims.user_id, body.usergroup_ids.as_ref())
                .await?;

        let created = self
            .queries
            .create(QueryData { label, raw_sql }, claims.user_id, &usergroup_ids)
            .await?;

        Ok(Json(QueryResponse {
            msg: "Query successfully added.".to_string(),
            success: 1,
            query: self.query_dict(&created).await?,
        }))
    }

    /// Edit a saved query (query_id required)
    #[oai(path = "/edit_query", method = "patch", tag = "QueryTags::Queries")]
    async fn edit_query(
        &self,
        auth: BearerAuth,
        body: Json<EditQueryRequest>,
    ) -> Result<Json<QueryResponse>, ApiError> {
        let claims = self.auth.authenticate(&auth.0.token).await?;
        authorize(&claims, &Action::EditResource(ResourceKind::Query))?;

        let query_id = body.query_id.ok_or_else(|| {
            ApiError::validation("No query_id provided. POST should be used to create a new query.")
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
            .queries
            .update(
                query_id,
                QueryChanges {
                    label: body.label.clone(),
                    raw_sql: body.raw_sql.clone(),
                },
                usergroup_ids.as_deref(),
            )
            .await?;

        Ok(Json(QueryResponse {
            msg: "Query successfully edited.".to_string(),
            success: 1,
            query: self.query_dict(&updated).await?,
        }))
    }

    /// Delete a saved query
    #[oai(path = "/delete_query", method = "post", tag = "QueryTags::Queries")]
    async fn delete_query(
        &self,
        auth: BearerAuth,
        body: Json<DeleteQueryRequest>,
    ) -> Result<Json<StatusResponse>, ApiError> {
        let claims = self.auth.authenticate(&auth.0.token).await?;
        authorize(&claims, &Action::DeleteResource(ResourceKind::Query))?;

        self.queries.delete(body.query_id).await?;
        Ok(Json(StatusResponse::ok("Query deleted.")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::TokenService;
    use crate::stores::user_store::NewUser;
    use crate::stores::TokenBlacklistStore;
    use crate::types::internal::Role;
    use migration::{Migrator, MigratorTrait};
    use poem_openapi::auth::Bearer;
    use sea_orm::Database;

    async fn setup() -> (QueryApi, String, String) {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to create test database");
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        let users = Arc::new(UserStore::new(db.clone(), "test-pepper".to_string()));
        let usergroups = Arc::new(UsergroupStore::new(db.clone()));
        let queries = Arc::new(QueryStore::new(db.clone()));
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

        for (username, role) in [("writeruser", Role::Writer), ("carolviewer", Role::Viewer)] {
            users
                .create_user(
                    NewUser {
                        username: username.to_string(),
                        email: format!("{}@whitehouse.gov", username),
                        password: "Secret123".to_string(),
                        role,
                    },
                    &[],
                )
                .await
                .unwrap();
        }
        let writer_token = auth.login("writeruser", "Secret123").await.unwrap();
        let viewer_token = auth.login("carolviewer", "Secret123").await.unwrap();

        (
            QueryApi::new(queries, usergroups, users, auth),
            writer_token,
            viewer_token,
        )
    }

    fn bearer(token: &str) -> BearerAuth {
        BearerAuth(Bearer {
            token: token.to_string(),
        })
    }

    fn create_body(label: &str) -> Json<EditQueryRequest> {
        Json(EditQueryRequest {
            query_id: None,
            label: Some(label.to_string()),
            raw_sql: Some("select count(*) from users".to_string()),
            usergroup_ids: None,
        })
    }

    #[tokio::test]
    async fn test_writer_creates_and_sees_own_query() {
        let (api, writer_token, _viewer_token) = setup().await;

        let created = api
            .create_query(bearer(&writer_token), create_body("daily_actives"))
            .await
            .unwrap();
        assert_eq!(created.query.creator.username, "writeruser");

        let listed = api.get_user_queries(bearer(&writer_token)).await.unwrap();
        assert_eq!(listed.queries.len(), 1);
        assert_eq!(listed.queries[0].label, "daily_actives");
    }

    #[tokio::test]
    async fn test_viewer_is_read_only() {
        let (api, writer_token, viewer_token) = setup().await;

        let result = api
            .create_query(bearer(&viewer_token), create_body("forbidden"))
            .await;
        assert!(matches!(result, Err(ApiError::Authorization(_))));

        let created = api
            .create_query(bearer(&writer_token), create_body("daily_actives"))
            .await
            .unwrap();
        let result = api
            .delete_query(
                bearer(&viewer_token),
                Json(DeleteQueryRequest {
                    query_id: created.query.query_id,
                }),
            )
            .await;
        assert!(matches!(result, Err(ApiError::Authorization(_))));
    }

    #[tokio::test]
    async fn test_create_requires_raw_sql() {
        let (api, writer_token, _) = setup().await;

        let mut body = create_body("daily_actives");
        body.0.raw_sql = None;
        let result = api.create_query(bearer(&writer_token), body).await;
        match result {
            Err(ApiError::Validation(json)) => assert_eq!(json.0.msg, "raw_sql is required."),
            _ => panic!("Expected Validation error"),
        }
    }
}
