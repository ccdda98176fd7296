use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use std::collections::BTreeSet;

use crate::errors::ApiError;
use crate::types::db::{chart, chart_perm, usergroup};

pub struct ChartData {
    pub label: String,
    pub chart_type: String,
    pub parameters: String,
    pub query_id: i32,
    pub connection_id: i32,
}

#[derive(Default)]
pub struct ChartChanges {
    pub label: Option<String>,
    pub chart_type: Option<String>,
    pub parameters: Option<String>,
    pub query_id: Option<i32>,
    pub connection_id: Option<i32>,
}

/// Chart records and their usergroup ACL edges. Referential checks on
/// query_id/connection_id happen at the API layer before calling in.
pub struct ChartStore {
    db: DatabaseConnection,
}

impl ChartStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, chart_id: i32) -> Result<Option<chart::Model>, ApiError> {
        chart::Entity::find_by_id(chart_id)
            .one(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))
    }

    pub async fn get_all(&self) -> Result<Vec<chart::Model>, ApiError> {
        chart::Entity::find()
            .order_by_asc(chart::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))
    }

    pub async fn create(
        &self,
        data: ChartData,
        creator_id: i32,
        usergroup_ids: &[i32],
    ) -> Result<chart::Model, ApiError> {
        let clash = chart::Entity::find()
            .filter(chart::Column::Label.eq(&data.label))
            .one(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))?;
        if clash.is_some() {
            return Err(ApiError::conflict("Chart label is not unique."));
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to start transaction: {}", e)))?;

        let created = chart::ActiveModel {
            id: sea_orm::ActiveValue::NotSet,
            label: Set(data.label),
            chart_type: Set(data.chart_type),
            parameters: Set(data.parameters),
            query_id: Set(data.query_id),
            connection_id: Set(data.connection_id),
            creator_id: Set(creator_id),
        }
        .insert(&txn)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to insert chart: {}", e)))?;

        let unique_ids: BTreeSet<i32> = usergroup_ids.iter().copied().collect();
        for usergroup_id in unique_ids {
            chart_perm::ActiveModel {
                chart_id: Set(created.id),
                usergroup_id: Set(usergroup_id),
            }
            .insert(&txn)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to insert chart perm: {}", e)))?;
        }

        txn.commit()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to commit transaction: {}", e)))?;

        Ok(created)
    }

    pub async fn update(
        &self,
        chart_id: i32,
        changes: ChartChanges,
        usergroup_ids: Option<&[i32]>,
    ) -> Result<chart::Model, ApiError> {
        let existing = self
            .find_by_id(chart_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Chart not recognized."))?;

        if let Some(new_label) = &changes.label {
            let clash = chart::Entity::find()
                .filter(chart::Column::Label.eq(new_label))
                .filter(chart::Column::Id.ne(chart_id))
                .one(&self.db)
                .await
                .map_err(|e| ApiError::internal(format!("Database error: {}", e)))?;
            if clash.is_some() {
                return Err(ApiError::conflict("Chart label is not unique."));
            }
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to start transaction: {}", e)))?;

        let mut active: chart::ActiveModel = existing.into();
        if let Some(label) = changes.label {
            active.label = Set(label);
        }
        if let Some(chart_type) = changes.chart_type {
            active.chart_type = Set(chart_type);
        }
        if let Some(parameters) = changes.parameters {
            active.parameters = Set(parameters);
        }
        if let Some(query_id) = changes.query_id {
            active.query_id = Set(query_id);
        }
        if let Some(connection_id) = changes.connection_id {
            active.connection_id = Set(connection_id);
        }

        let updated = active
            .update(&txn)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to update chart: {}", e)))?;

        if let Some(ids) = usergroup_ids {
            if !ids.is_empty() {
                chart_perm::Entity::delete_many()
                    .filter(chart_perm::Column::ChartId.eq(chart_id))
                    .exec(&txn)
                    .await
                    .map_err(|e| ApiError::internal(format!("Failed to clear chart perms: {}", e)))?;
                let unique_ids: BTreeSet<i32> = ids.iter().copied().collect();
                for usergroup_id in unique_ids {
                    chart_perm::ActiveModel {
                        chart_id: Set(chart_id),
                        usergroup_id: Set(usergroup_id),
                    }
                    .insert(&txn)
                    .await
                    .map_err(|e| ApiError::internal(format!("Failed to insert chart perm: {}", e)))?;
                }
            }
        }

        txn.commit()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to commit transaction: {}", e)))?;

        Ok(updated)
    }

    pub async fn delete(&self, chart_id: i32) -> Result<(), ApiError> {
        self.find_by_id(chart_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Chart not recognized."))?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to start transaction: {}", e)))?;

        chart_perm::Entity::delete_many()
            .filter(chart_perm::Column::ChartId.eq(chart_id))
            .exec(&txn)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to delete chart perms: {}", e)))?;
        chart::Entity::delete_by_id(chart_id)
            .exec(&txn)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to delete chart: {}", e)))?;

        txn.commit()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to commit transaction: {}", e)))
    }

    pub async fn authorized_ids(&self, usergroup_ids: &[i32]) -> Result<Vec<i32>, ApiError> {
        let edges = chart_perm::Entity::find()
            .filter(chart_perm::Column::UsergroupId.is_in(usergroup_ids.to_vec()))
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))?;
        let unique: BTreeSet<i32> = edges.into_iter().map(|edge| edge.chart_id).collect();
        Ok(unique.into_iter().collect())
    }

    pub async fn authorized(&self, usergroup_ids: &[i32]) -> Result<Vec<chart::Model>, ApiError> {
        let ids = self.authorized_ids(usergroup_ids).await?;
        chart::Entity::find()
            .filter(chart::Column::Id.is_in(ids))
            .order_by_asc(chart::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))
    }

    pub async fn usergroups_of(&self, chart_id: i32) -> Result<Vec<usergroup::Model>, ApiError> {
        let ids: Vec<i32> = chart_perm::Entity::find()
            .filter(chart_perm::Column::ChartId.eq(chart_id))
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
