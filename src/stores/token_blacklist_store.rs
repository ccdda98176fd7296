use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::errors::ApiError;
use crate::types::db::token_blacklist::{self, Entity as TokenBlacklist};

/// Append-only set of revoked token ids.
///
/// A jti lands here on logout and is never removed; retention is bounded
/// only by token expiry making old entries irrelevant.
pub struct TokenBlacklistStore {
    db: DatabaseConnection,
}

impl TokenBlacklistStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Insert a jti into the blacklist. Inserting a jti that is already
    /// present is harmless.
    pub async fn insert(&self, jti: &str) -> Result<(), ApiError> {
        let entry = token_blacklist::ActiveModel {
            id: sea_orm::ActiveValue::NotSet,
            jti: Set(jti.to_string()),
            blacklisted_at: Set(Utc::now().timestamp()),
        };

        match entry.insert(&self.db).await {
            Ok(_) => Ok(()),
            // A concurrent logout with the same token already won; the
            // jti is blacklisted either way.
            Err(e) if e.to_string().contains("UNIQUE") => Ok(()),
            Err(e) => Err(ApiError::internal(format!(
                "Failed to blacklist token: {}",
                e
            ))),
        }
    }

    /// Whether a jti has been revoked.
    pub async fn contains(&self, jti: &str) -> Result<bool, ApiError> {
        let entry = TokenBlacklist::find()
            .filter(token_blacklist::Column::Jti.eq(jti))
            .one(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))?;
        Ok(entry.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    async fn setup_store() -> TokenBlacklistStore {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to create test database");
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");
        TokenBlacklistStore::new(db)
    }

    #[tokio::test]
    async fn test_inserted_jti_is_contained() {
        let store = setup_store().await;

        assert!(!store.contains("jti-abc").await.unwrap());
        store.insert("jti-abc").await.unwrap();
        assert!(store.contains("jti-abc").await.unwrap());
    }

    #[tokio::test]
    async fn test_double_insert_is_harmless() {
        let store = setup_store().await;

        store.insert("jti-dup").await.unwrap();
        store.insert("jti-dup").await.unwrap();
        assert!(store.contains("jti-dup").await.unwrap());
    }

    #[tokio::test]
    async fn test_unrelated_jti_not_contained() {
        let store = setup_store().await;

        store.insert("jti-one").await.unwrap();
        assert!(!store.contains("jti-two").await.unwrap());
    }
}
