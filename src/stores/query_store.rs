use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use std::collections::BTreeSet;

use crate::errors::ApiError;
use crate::types::db::{query_perm, sql_query, usergroup};

pub struct QueryData {
    pub label: String,
    pub raw_sql: String,
}

#[derive(Default)]
pub struct QueryChanges {
    pub label: Option<String>,
    pub raw_sql: Option<String>,
}

/// Saved SQL queries and their usergroup ACL edges.
pub struct QueryStore {
    db: DatabaseConnection,
}

impl QueryStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, query_id: i32) -> Result<Option<sql_query::Model>, ApiError> {
        sql_query::Entity::find_by_id(query_id)
            .one(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))
    }

    pub async fn get_all(&self) -> Result<Vec<sql_query::Model>, ApiError> {
        sql_query::Entity::find()
            .order_by_asc(sql_query::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))
    }

    pub async fn create(
        &self,
        data: QueryData,
        creator_id: i32,
        usergroup_ids: &[i32],
    ) -> Result<sql_query::Model, ApiError> {
        let clash = sql_query::Entity::find()
            .filter(sql_query::Column::Label.eq(&data.label))
            .one(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))?;
        if clash.is_some() {
            return Err(ApiError::conflict("Query label is not unique."));
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to start transaction: {}", e)))?;

        let created = sql_query::ActiveModel {
            id: sea_orm::ActiveValue::NotSet,
            label: Set(data.label),
            raw_sql: Set(data.raw_sql),
            creator_id: Set(creator_id),
        }
        .insert(&txn)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to insert query: {}", e)))?;

        let unique_ids: BTreeSet<i32> = usergroup_ids.iter().copied().collect();
        for usergroup_id in unique_ids {
            query_perm::ActiveModel {
                query_id: Set(created.id),
                usergroup_id: Set(usergroup_id),
            }
            .insert(&txn)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to insert query perm: {}", e)))?;
        }

        txn.commit()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to commit transaction: {}", e)))?;

        Ok(created)
    }

    pub async fn update(
        &self,
        query_id: i32,
        changes: QueryChanges,
        usergroup_ids: Option<&[i32]>,
    ) -> Result<sql_query::Model, ApiError> {
        let existing = self
            .find_by_id(query_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Query not recognized."))?;

        if let Some(new_label) = &changes.label {
            let clash = sql_query::Entity::find()
                .filter(sql_query::Column::Label.eq(new_label))
                .filter(sql_query::Column::Id.ne(query_id))
                .one(&self.db)
                .await
                .map_err(|e| ApiError::internal(format!("Database error: {}", e)))?;
            if clash.is_some() {
                return Err(ApiError::conflict("Query label is not unique."));
            }
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to start transaction: {}", e)))?;

        let mut active: sql_query::ActiveModel = existing.into();
        if let Some(label) = changes.label {
            active.label = Set(label);
        }
        if let Some(raw_sql) = changes.raw_sql {
            active.raw_sql = Set(raw_sql);
        }

        let updated = active
            .update(&txn)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to update query: {}", e)))?;

        if let Some(ids) = usergroup_ids {
            if !ids.is_empty() {
                query_perm::Entity::delete_many()
                    .filter(query_perm::Column::QueryId.eq(query_id))
                    .exec(&txn)
                    .await
                    .map_err(|e| ApiError::internal(format!("Failed to clear query perms: {}", e)))?;
                let unique_ids: BTreeSet<i32> = ids.iter().copied().collect();
                for usergroup_id in unique_ids {
                    query_perm::ActiveModel {
                        query_id: Set(query_id),
                        usergroup_id: Set(usergroup_id),
                    }
                    .insert(&txn)
                    .await
                    .map_err(|e| ApiError::internal(format!("Failed to insert query perm: {}", e)))?;
                }
            }
        }

        txn.commit()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to commit transaction: {}", e)))?;

        Ok(updated)
    }

    pub async fn delete(&self, query_id: i32) -> Result<(), ApiError> {
        self.find_by_id(query_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Query not recognized."))?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to start transaction: {}", e)))?;

        query_perm::Entity::delete_many()
            .filter(query_perm::Column::QueryId.eq(query_id))
            .exec(&txn)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to delete query perms: {}", e)))?;
        sql_query::Entity::delete_by_id(query_id)
            .exec(&txn)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to delete query: {}", e)))?;

        txn.commit()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to commit transaction: {}", e)))
    }

    pub async fn authorized_ids(&self, usergroup_ids: &[i32]) -> Result<Vec<i32>, ApiError> {
        let edges = query_perm::Entity::find()
            .filter(query_perm::Column::UsergroupId.is_in(usergroup_ids.to_vec()))
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))?;
        let unique: BTreeSet<i32> = edges.into_iter().map(|edge| edge.query_id).collect();
        Ok(unique.into_iter().collect())
    }

    pub async fn authorized(&self, usergroup_ids: &[i32]) -> Result<Vec<sql_query::Model>, ApiError> {
        let ids = self.authorized_ids(usergroup_ids).await?;
        sql_query::Entity::find()
            .filter(sql_query::Column::Id.is_in(ids))
            .order_by_asc(sql_query::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))
    }

    pub async fn usergroups_of(&self, query_id: i32) -> Result<Vec<usergroup::Model>, ApiError> {
        let ids: Vec<i32> = query_perm::Entity::find()
            .filter(query_perm::Column::QueryId.eq(query_id))
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
