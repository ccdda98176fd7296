use poem_openapi::{param::Query, payload::Json, OpenApi, Tags};
use std::sync::Arc;

use crate::api::{usergroup_dict, usergroup_summaries, BearerAuth};
use crate::errors::ApiError;
use crate::services::validators;
use crate::services::{authorize, Action, AuthService};
use crate::stores::user_store::{NewUser, UserChanges};
use crate::stores::{UsergroupStore, UserStore};
use crate::types::db::user;
use crate::types::dto::common::StatusResponse;
use crate::types::dto::user::{
    DeleteUserRequest, EditUserRequest, UserDict, UserListResponse, UserResponse,
};
use crate::types::dto::usergroup::UsergroupListResponse;
use crate::types::internal::Role;

/// User administration endpoints.
pub struct UserApi {
    users: Arc<UserStore>,
    usergroups: Arc<UsergroupStore>,
    auth: Arc<AuthService>,
}

#[derive(Tags)]
enum UserTags {
    /// User administration
    Users,
}

impl UserApi {
    pub fn new(users: Arc<UserStore>, usergroups: Arc<UsergroupStore>, auth: Arc<AuthService>) -> Self {
        Self {
            users,
            usergroups,
            auth,
        }
    }

    async fn user_dict(&self, user: &user::Model) -> Result<UserDict, ApiError> {
        let groups = self.usergroups.usergroups_of(user.id).await?;
        Ok(UserDict {
            user_id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
            is_active: user.is_active,
            usergroups: usergroup_summaries(&groups),
        })
    }
}

#[OpenApi]
impl UserApi {
    /// List every user, bypassing usergroup scoping
    #[oai(path = "/get_all_users", method = "get", tag = "UserTags::Users")]
    async fn get_all_users(&self, auth: BearerAuth) -> Result<Json<UserListResponse>, ApiError> {
        let claims = self.auth.authenticate(&auth.0.token).await?;
        authorize(&claims, &Action::ViewAllUsers)?;

        let mut users = Vec::new();
        for user in self.users.get_all().await? {
            users.push(self.user_dict(&user).await?);
        }
        Ok(Json(UserListResponse {
            msg: "All users provided.".to_string(),
            success: 1,
            users,
        }))
    }

    /// Create a new user (no user_id in the body)
    #[oai(path = "/edit_user", method = "post", tag = "UserTags::Users")]
    async fn create_user(
        &self,
        auth: BearerAuth,
        body: Json<EditUserRequest>,
    ) -> Result<Json<UserResponse>, ApiError> {
        let claims = self.auth.authenticate(&auth.0.token).await?;
        authorize(&claims, &Action::CreateUser)?;

        if body.user_id.is_some() {
            return Err(ApiError::validation(
                "User_id provided with POST request. PATCH should be used to edit an existing user.",
            ));
        }

        let username = validators::validate_username(body.username.as_deref().unwrap_or(""))?;
        let email = validators::validate_email(body.email.as_deref().unwrap_or(""))?;
        let password = body.password.as_deref().unwrap_or("");
        validators::validate_password(password)?;
        let role = match body.role.as_deref() {
            Some(role) => validators::validate_role(role)?,
            None => return Err(ApiError::validation("Role not provided.")),
        };

        let usergroup_ids = body.usergroup_ids.clone().unwrap_or_default();
        if !usergroup_ids.is_empty() {
            self.usergroups.ensure_exist(&usergroup_ids).await?;
        }

        let created = self
            .users
            .create_user(
                NewUser {
                    username,
                    email,
                    password: password.to_string(),
                    role,
                },
                &usergroup_ids,
            )
            .await?;

        Ok(Json(UserResponse {
            msg: "User registered.".to_string(),
            success: 1,
            user: self.user_dict(&created).await?,
        }))
    }

    /// Edit an existing user (user_id required)
    #[oai(path = "/edit_user", method = "patch", tag = "UserTags::Users")]
    async fn edit_user(
        &self,
        auth: BearerAuth,
        body: Json<EditUserRequest>,
    ) -> Result<Json<UserResponse>, ApiError> {
        let claims = self.auth.authenticate(&auth.0.token).await?;

        let user_id = body.user_id.ok_or_else(|| {
            ApiError::validation("No user_id provided. POST should be used to create a new user.")
        })?;
        let target = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Provided user_id not found."))?;

        let new_role = match body.role.as_deref() {
            Some(role) => Some(validators::validate_role(role)?),
            None => None,
        };
        let changes_role = new_role
            .map(|role| role.as_str() != target.role)
            .unwrap_or(false);

        authorize(
            &claims,
            &Action::EditUser {
                target_id: user_id,
                changes_role,
            },
        )?;

        // Membership and activation changes are administrative even on
        // one's own record.
        let usergroup_ids = body.usergroup_ids.clone().filter(|ids| !ids.is_empty());
        if usergroup_ids.is_some() && !claims.role.is_admin() {
            return Err(ApiError::authorization(
                "User must have admin privileges to edit usergroups.",
            ));
        }
        if let Some(ids) = &usergroup_ids {
            self.usergroups.ensure_exist(ids).await?;
        }
        if body.is_active.is_some() && !claims.role.is_admin() {
            return Err(ApiError::authorization(
                "User must have admin privileges to change account status.",
            ));
        }

        let username = match body.username.as_deref() {
            Some(candidate) => Some(validators::validate_username(candidate)?),
            None => None,
        };
        let email = match body.email.as_deref() {
            Some(candidate) => Some(validators::validate_email(candidate)?),
            None => None,
        };
        let password = match body.password.as_deref() {
            Some(candidate) => {
                validators::validate_password(candidate)?;
                Some(candidate.to_string())
            }
            None => None,
        };

        let updated = self
            .users
            .update_user(
                user_id,
                UserChanges {
                    username,
                    email,
                    password,
                    role: new_role,
                    is_active: body.is_active,
                    usergroup_ids,
                },
            )
            .await?;

        Ok(Json(UserResponse {
            msg: "User updated.".to_string(),
            success: 1,
            user: self.user_dict(&updated).await?,
        }))
    }

    /// Delete a user and its personal usergroup
    #[oai(path = "/delete_user", method = "post", tag = "UserTags::Users")]
    async fn delete_user(
        &self,
        auth: BearerAuth,
        body: Json<DeleteUserRequest>,
    ) -> Result<Json<StatusResponse>, ApiError> {
        let claims = self.auth.authenticate(&auth.0.token).await?;

        let target = self
            .users
            .find_by_id(body.user_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Provided user_id not found."))?;
        let target_role = Role::parse(&target.role)
            .ok_or_else(|| ApiError::internal(format!("unknown role '{}' stored for user {}", target.role, target.id)))?;

        authorize(
            &claims,
            &Action::DeleteUser {
                target_id: target.id,
                target_role,
            },
        )?;

        self.users.delete_user(target.id).await?;
        Ok(Json(StatusResponse::ok("User deleted.")))
    }

    /// Usergroups of the requester, or of another user (admin only)
    #[oai(
        path = "/get_usergroups_by_user",
        method = "get",
        tag = "UserTags::Users"
    )]
    async fn get_usergroups_by_user(
        &self,
        auth: BearerAuth,
        user_id: Query<Option<i32>>,
    ) -> Result<Json<UsergroupListResponse>, ApiError> {
        let claims = self.auth.authenticate(&auth.0.token).await?;
        let target_id = user_id.0.unwrap_or(claims.user_id);

        authorize(&claims, &Action::ViewUsergroupsOf { target_id })?;

        self.users
            .find_by_id(target_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Provided user_id not found."))?;

        let mut usergroups = Vec::new();
        for group in self.usergroups.usergroups_of(target_id).await? {
            usergroups.push(usergroup_dict(&self.usergroups, &group).await?);
        }
        Ok(Json(UsergroupListResponse {
            msg: "All usergroups provided.".to_string(),
            success: 1,
            usergroups,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::TokenService;
    use crate::stores::TokenBlacklistStore;
    use migration::{Migrator, MigratorTrait};
    use poem_openapi::auth::Bearer;
    use sea_orm::Database;

    struct Fixture {
        api: UserApi,
        auth: Arc<AuthService>,
        users: Arc<UserStore>,
        admin_token: String,
        writer_token: String,
        writer_id: i32,
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

        let admin_token = auth.login("adminuser", "Secret123").await.unwrap();
        let writer_token = auth.login("writeruser", "Secret123").await.unwrap();

        Fixture {
            api: UserApi::new(users.clone(), usergroups, auth.clone()),
            auth,
            users,
            admin_token,
            writer_token,
            writer_id: writer.id,
        }
    }

    fn bearer(token: &str) -> BearerAuth {
        BearerAuth(Bearer {
            token: token.to_string(),
        })
    }

    fn create_request(username: &str) -> Json<EditUserRequest> {
        Json(EditUserRequest {
            user_id: None,
            username: Some(username.to_string()),
            email: Some(format!("{}@example.com", username)),
            password: Some("Secret123".to_string()),
            role: Some("viewer".to_string()),
            is_active: None,
            usergroup_ids: None,
        })
    }

    #[tokio::test]
    async fn test_admin_creates_user_with_personal_group() {
        let fix = setup().await;

        let response = fix
            .api
            .create_user(bearer(&fix.admin_token), create_request("donnamoss"))
            .await
            .unwrap();

        assert_eq!(response.success, 1);
        assert_eq!(response.user.username, "donnamoss");
        assert_eq!(response.user.usergroups.len(), 1);
        assert_eq!(response.user.usergroups[0].label, "personal_donnamoss");
    }

    #[tokio::test]
    async fn test_writer_cannot_create_user() {
        let fix = setup().await;

        let result = fix
            .api
            .create_user(bearer(&fix.writer_token), create_request("donnamoss"))
            .await;

        assert!(matches!(result, Err(ApiError::Authorization(_))));
        assert!(fix.users.find_by_username("donnamoss").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_user_validates_fields() {
        let fix = setup().await;

        let mut body = create_request("ab");
        body.0.username = Some("ab".to_string());
        let result = fix.api.create_user(bearer(&fix.admin_token), body).await;
        assert!(matches!(result, Err(ApiError::Validation(_))));

        let mut body = create_request("donnamoss");
        body.0.email = Some("not-an-email".to_string());
        let result = fix.api.create_user(bearer(&fix.admin_token), body).await;
        assert!(matches!(result, Err(ApiError::Validation(_))));

        let mut body = create_request("donnamoss");
        body.0.password = Some("weakpass".to_string());
        let result = fix.api.create_user(bearer(&fix.admin_token), body).await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn test_writer_edits_own_username_but_not_own_role() {
        let fix = setup().await;

        let body = Json(EditUserRequest {
            user_id: Some(fix.writer_id),
            username: Some("writer_two".to_string()),
            email: None,
            password: None,
            role: None,
            is_active: None,
            usergroup_ids: None,
        });
        let response = fix.api.edit_user(bearer(&fix.writer_token), body).await.unwrap();
        assert_eq!(response.user.username, "writer_two");

        let body = Json(EditUserRequest {
            user_id: Some(fix.writer_id),
            username: None,
            email: None,
            password: None,
            role: Some("admin".to_string()),
            is_active: None,
            usergroup_ids: None,
        });
        let result = fix.api.edit_user(bearer(&fix.writer_token), body).await;
        assert!(matches!(result, Err(ApiError::Authorization(_))));
    }

    #[tokio::test]
    async fn test_writer_cannot_edit_other_user() {
        let fix = setup().await;

        let admin = fix.users.find_by_username("adminuser").await.unwrap().unwrap();
        let body = Json(EditUserRequest {
            user_id: Some(admin.id),
            username: Some("renamedadmin".to_string()),
            email: None,
            password: None,
            role: None,
            is_active: None,
            usergroup_ids: None,
        });
        let result = fix.api.edit_user(bearer(&fix.writer_token), body).await;
        assert!(matches!(result, Err(ApiError::Authorization(_))));
    }

    #[tokio::test]
    async fn test_edit_unknown_user_is_not_found() {
        let fix = setup().await;

        let body = Json(EditUserRequest {
            user_id: Some(9_999_999),
            username: Some("whoever1".to_string()),
            email: None,
            password: None,
            role: None,
            is_active: None,
            usergroup_ids: None,
        });
        let result = fix.api.edit_user(bearer(&fix.admin_token), body).await;
        match result {
            Err(ApiError::NotFound(json)) => {
                assert_eq!(json.0.msg, "Provided user_id not found.")
            }
            _ => panic!("Expected NotFound error"),
        }
    }

    #[tokio::test]
    async fn test_delete_user_gates_and_works() {
        let fix = setup().await;

        // Writer cannot delete.
        let result = fix
            .api
            .delete_user(
                bearer(&fix.writer_token),
                Json(DeleteUserRequest {
                    user_id: fix.writer_id,
                }),
            )
            .await;
        assert!(matches!(result, Err(ApiError::Authorization(_))));

        // Admin can.
        let response = fix
            .api
            .delete_user(
                bearer(&fix.admin_token),
                Json(DeleteUserRequest {
                    user_id: fix.writer_id,
                }),
            )
            .await
            .unwrap();
        assert_eq!(response.success, 1);
        assert!(fix.users.find_by_id(fix.writer_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_admin_cannot_delete_self() {
        let fix = setup().await;

        let admin = fix.users.find_by_username("adminuser").await.unwrap().unwrap();
        let result = fix
            .api
            .delete_user(
                bearer(&fix.admin_token),
                Json(DeleteUserRequest { user_id: admin.id }),
            )
            .await;
        assert!(matches!(result, Err(ApiError::Authorization(_))));
    }

    #[tokio::test]
    async fn test_get_all_users_is_admin_gated() {
        let fix = setup().await;

        let response = fix.api.get_all_users(bearer(&fix.admin_token)).await.unwrap();
        assert_eq!(response.users.len(), 2);

        let result = fix.api.get_all_users(bearer(&fix.writer_token)).await;
        assert!(matches!(result, Err(ApiError::Authorization(_))));
    }

    #[tokio::test]
    async fn test_get_usergroups_by_user_self_and_admin() {
        let fix = setup().await;

        // Self: no user_id parameter.
        let response = fix
            .api
            .get_usergroups_by_user(bearer(&fix.writer_token), Query(None))
            .await
            .unwrap();
        assert_eq!(response.usergroups.len(), 1);
        assert_eq!(response.usergroups[0].label, "personal_writeruser");
        assert_eq!(response.usergroups[0].members.len(), 1);

        // Writer asking about another user is denied.
        let admin = fix.users.find_by_username("adminuser").await.unwrap().unwrap();
        let result = fix
            .api
            .get_usergroups_by_user(bearer(&fix.writer_token), Query(Some(admin.id)))
            .await;
        assert!(matches!(result, Err(ApiError::Authorization(_))));

        // Admin asking about the writer is fine.
        let response = fix
            .api
            .get_usergroups_by_user(bearer(&fix.admin_token), Query(Some(fix.writer_id)))
            .await
            .unwrap();
        assert_eq!(response.usergroups[0].label, "personal_writeruser");
    }

    #[tokio::test]
    async fn test_deactivated_user_cannot_mutate_with_live_token() {
        let fix = setup().await;

        // Deactivate the writer while their token is still valid, then
        // re-login to pick up the snapshot with is_active = false.
        fix.users
            .update_user(
                fix.writer_id,
                UserChanges {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let result = fix.auth.login("writeruser", "Secret123").await;
        assert!(matches!(result, Err(ApiError::AccountInactive(_))));
    }
}
