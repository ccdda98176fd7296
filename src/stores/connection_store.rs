use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use std::collections::BTreeSet;

use crate::errors::ApiError;
use crate::types::db::{connection, connection_perm, usergroup};

/// Fields for a new connection record.
pub struct ConnectionData {
    pub label: String,
    pub db_type: String,
    pub host: String,
    pub port: i32,
    pub username: String,
    pub password: String,
    pub database_name: String,
}

/// Partial update; `None` leaves a field untouched.
#[derive(Default)]
pub struct ConnectionChanges {
    pub label: Option<String>,
    pub db_type: Option<String>,
    pub host: Option<String>,
    pub port: Option<i32>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database_name: Option<String>,
}

/// Database-connection records and their usergroup ACL edges.
pub struct ConnectionStore {
    db: DatabaseConnection,
}

impl ConnectionStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, connection_id: i32) -> Result<Option<connection::Model>, ApiError> {
        connection::Entity::find_by_id(connection_id)
            .one(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))
    }

    pub async fn get_all(&self) -> Result<Vec<connection::Model>, ApiError> {
        connection::Entity::find()
            .order_by_asc(connection::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))
    }

    /// Create a connection and attach it to `usergroup_ids`, atomically.
    /// Callers have already resolved the default personal group, so the
    /// list is never empty.
    pub async fn create(
        &self,
        data: ConnectionData,
        creator_id: i32,
        usergroup_ids: &[i32],
    ) -> Result<connection::Model, ApiError> {
        let clash = connection::Entity::find()
            .filter(connection::Column::Label.eq(&data.label))
            .one(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))?;
        if clash.is_some() {
            return Err(ApiError::conflict("Connection label is not unique."));
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to start transaction: {}", e)))?;

        let created = connection::ActiveModel {
            id: sea_orm::ActiveValue::NotSet,
            label: Set(data.label),
            db_type: Set(data.db_type),
            host: Set(data.host),
            port: Set(data.port),
            username: Set(data.username),
            password: Set(data.password),
            database_name: Set(data.database_name),
            creator_id: Set(creator_id),
        }
        .insert(&txn)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to insert connection: {}", e)))?;

        let unique_ids: BTreeSet<i32> = usergroup_ids.iter().copied().collect();
        for usergroup_id in unique_ids {
            connection_perm::ActiveModel {
                connection_id: Set(created.id),
                usergroup_id: Set(usergroup_id),
            }
            .insert(&txn)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to insert connection perm: {}", e)))?;
        }

        txn.commit()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to commit transaction: {}", e)))?;

        Ok(created)
    }

    /// Apply a partial update. A non-empty `usergroup_ids` replaces the
    /// connection's full ACL set in the same transaction, so concurrent
    /// readers never observe the group-less intermediate state.
    pub async fn update(
        &self,
        connection_id: i32,
        changes: ConnectionChanges,
        usergroup_ids: Option<&[i32]>,
    ) -> Result<connection::Model, ApiError> {
        let existing = self
            .find_by_id(connection_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Connection not recognized."))?;

        if let Some(new_label) = &changes.label {
            let clash = connection::Entity::find()
                .filter(connection::Column::Label.eq(new_label))
                .filter(connection::Column::Id.ne(connection_id))
                .one(&self.db)
                .await
                .map_err(|e| ApiError::internal(format!("Database error: {}", e)))?;
            if clash.is_some() {
                return Err(ApiError::conflict("Connection label is not unique."));
            }
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to start transaction: {}", e)))?;

        let mut active: connection::ActiveModel = existing.into();
        if let Some(label) = changes.label {
            active.label = Set(label);
        }
        if let Some(db_type) = changes.db_type {
            active.db_type = Set(db_type);
        }
        if let Some(host) = changes.host {
            active.host = Set(host);
        }
        if let Some(port) = changes.port {
            active.port = Set(port);
        }
        if let Some(username) = changes.username {
            active.username = Set(username);
        }
        if let Some(password) = changes.password {
            active.password = Set(password);
        }
        if let Some(database_name) = changes.database_name {
            active.database_name = Set(database_name);
        }

        let updated = active
            .update(&txn)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to update connection: {}", e)))?;

        if let Some(ids) = usergroup_ids {
            if !ids.is_empty() {
                connection_perm::Entity::delete_many()
                    .filter(connection_perm::Column::ConnectionId.eq(connection_id))
                    .exec(&txn)
                    .await
                    .map_err(|e| ApiError::internal(format!("Failed to clear connection perms: {}", e)))?;
                let unique_ids: BTreeSet<i32> = ids.iter().copied().collect();
                for usergroup_id in unique_ids {
                    connection_perm::ActiveModel {
                        connection_id: Set(connection_id),
                        usergroup_id: Set(usergroup_id),
                    }
                    .insert(&txn)
                    .await
                    .map_err(|e| ApiError::internal(format!("Failed to insert connection perm: {}", e)))?;
                }
            }
        }

        txn.commit()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to commit transaction: {}", e)))?;

        Ok(updated)
    }

    pub async fn delete(&self, connection_id: i32) -> Result<(), ApiError> {
        self.find_by_id(connection_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Connection not recognized."))?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to start transaction: {}", e)))?;

        connection_perm::Entity::delete_many()
            .filter(connection_perm::Column::ConnectionId.eq(connection_id))
            .exec(&txn)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to delete connection perms: {}", e)))?;
        connection::Entity::delete_by_id(connection_id)
            .exec(&txn)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to delete connection: {}", e)))?;

        txn.commit()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to commit transaction: {}", e)))
    }

    /// Ids of connections visible through any of `usergroup_ids` - the
    /// union across groups, deduplicated.
    pub async fn authorized_ids(&self, usergroup_ids: &[i32]) -> Result<Vec<i32>, ApiError> {
        let edges = connection_perm::Entity::find()
            .filter(connection_perm::Column::UsergroupId.is_in(usergroup_ids.to_vec()))
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))?;
        let unique: BTreeSet<i32> = edges.into_iter().map(|edge| edge.connection_id).collect();
        Ok(unique.into_iter().collect())
    }

    /// The connection records behind [`Self::authorized_ids`].
    pub async fn authorized(&self, usergroup_ids: &[i32]) -> Result<Vec<connection::Model>, ApiError> {
        let ids = self.authorized_ids(usergroup_ids).await?;
        connection::Entity::find()
            .filter(connection::Column::Id.is_in(ids))
            .order_by_asc(connection::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))
    }

    pub async fn usergroups_of(&self, connection_id: i32) -> Result<Vec<usergroup::Model>, ApiError> {
        let ids: Vec<i32> = connection_perm::Entity::find()
            .filter(connection_perm::Column::ConnectionId.eq(connection_id))
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))?
            .into_iter()
            .map(|edge| edge.usergroup_id)
            .collect();
        usergroup::Entity::find()
            .filter(usergroup::Column::Id.is_in(ids))
            .order_by_asc(usergroup::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))
    }
}
