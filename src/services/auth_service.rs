use std::sync::Arc;

use crate::errors::ApiError;
use crate::services::TokenService;
use crate::stores::{TokenBlacklistStore, UsergroupStore, UserStore};
use crate::types::internal::Claims;

/// Session lifecycle: credential verification at login, claims
/// reconstruction on every request, revocation at logout.
pub struct AuthService {
    users: Arc<UserStore>,
    usergroups: Arc<UsergroupStore>,
    blacklist: Arc<TokenBlacklistStore>,
    tokens: Arc<TokenService>,
}

impl AuthService {
    pub fn new(
        users: Arc<UserStore>,
        usergroups: Arc<UsergroupStore>,
        blacklist: Arc<TokenBlacklistStore>,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            users,
            usergroups,
            blacklist,
            tokens,
        }
    }

    /// Verify credentials and issue a token.
    ///
    /// Unknown username and wrong password fail identically. The
    /// is_active flag is checked only after the password verifies, so a
    /// probe with bad credentials cannot learn that an account exists
    /// but is disabled.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, ApiError> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(ApiError::bad_credentials)?;

        if !self.users.verify_password(password, &user.password_hash) {
            return Err(ApiError::bad_credentials());
        }

        if !user.is_active {
            return Err(ApiError::account_inactive());
        }

        let usergroups = self.usergroups.usergroups_of(user.id).await?;
        let token = self.tokens.issue(&user, &usergroups)?;
        tracing::info!(username = %user.username, "login");
        Ok(token)
    }

    /// Revoke the token by blacklisting its jti. The token must still be
    /// valid; a second logout with the same token fails authentication.
    pub async fn logout(&self, token: &str) -> Result<(), ApiError> {
        let claims = self.authenticate(token).await?;
        self.blacklist.insert(&claims.jti).await?;
        tracing::info!(username = %claims.username, "logout");
        Ok(())
    }

    /// Validate a bearer token and return its claims snapshot.
    pub async fn authenticate(&self, token: &str) -> Result<Claims, ApiError> {
        let claims = self.tokens.decode(token)?;
        if self.blacklist.contains(&claims.jti).await? {
            return Err(ApiError::invalid_token());
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::user_store::{NewUser, UserChanges};
    use crate::types::internal::Role;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    async fn setup() -> (Arc<UserStore>, AuthService) {
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
        let auth = AuthService::new(users.clone(), usergroups, blacklist, tokens);
        (users, auth)
    }

    async fn create_sam(users: &UserStore) -> i32 {
        users
            .create_user(
                NewUser {
                    username: "samseaborn".to_string(),
                    email: "sam@whitehouse.gov".to_string(),
                    password: "Westwing1".to_string(),
                    role: Role::Writer,
                },
                &[],
            )
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_login_issues_token_with_snapshot() {
        let (users, auth) = setup().await;
        create_sam(&users).await;

        let token = auth.login("samseaborn", "Westwing1").await.unwrap();
        let claims = auth.authenticate(&token).await.unwrap();

        assert_eq!(claims.username, "samseaborn");
        assert_eq!(claims.role, Role::Writer);
        assert!(claims.is_active);
        assert_eq!(claims.usergroups.len(), 1);
        assert_eq!(claims.usergroups[0].label, "personal_samseaborn");
    }

    #[tokio::test]
    async fn test_bad_username_and_bad_password_are_indistinguishable() {
        let (users, auth) = setup().await;
        create_sam(&users).await;

        let unknown = auth.login("nobody12345", "Westwing1").await.unwrap_err();
        let wrong = auth.login("samseaborn", "Westwing2").await.unwrap_err();

        assert_eq!(unknown.message(), wrong.message());
        assert!(matches!(unknown, ApiError::Authentication(_)));
        assert!(matches!(wrong, ApiError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_inactive_account_rejected_only_after_password_check() {
        let (users, auth) = setup().await;
        let sam = create_sam(&users).await;
        users
            .update_user(
                sam,
                UserChanges {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // Correct password reveals the inactive state.
        let err = auth.login("samseaborn", "Westwing1").await.unwrap_err();
        assert!(matches!(err, ApiError::AccountInactive(_)));

        // Wrong password must not.
        let err = auth.login("samseaborn", "WrongPass1").await.unwrap_err();
        assert!(matches!(err, ApiError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_logout_revokes_token_permanently() {
        let (users, auth) = setup().await;
        create_sam(&users).await;

        let token = auth.login("samseaborn", "Westwing1").await.unwrap();
        assert!(auth.authenticate(&token).await.is_ok());

        auth.logout(&token).await.unwrap();

        let err = auth.authenticate(&token).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidToken(_)));

        // Logging out again with the revoked token also fails.
        let err = auth.logout(&token).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn test_logout_does_not_affect_other_sessions() {
        let (users, auth) = setup().await;
        create_sam(&users).await;

        let first = auth.login("samseaborn", "Westwing1").await.unwrap();
        let second = auth.login("samseaborn", "Westwing1").await.unwrap();

        auth.logout(&first).await.unwrap();

        assert!(auth.authenticate(&first).await.is_err());
        assert!(auth.authenticate(&second).await.is_ok());
    }

    #[tokio::test]
    async fn test_garbage_token_rejected() {
        let (_users, auth) = setup().await;
        assert!(matches!(
            auth.authenticate("garbage").await,
            Err(ApiError::InvalidToken(_))
        ));
    }
}
