use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use std::collections::BTreeSet;

use crate::errors::ApiError;
use crate::types::db::{report, report_perm, usergroup};

pub struct ReportData {
    pub label: String,
    pub parameters: String,
}

#[derive(Default)]
pub struct ReportChanges {
    pub label: Option<String>,
    pub parameters: Option<String>,
    pub last_published: Option<i64>,
}

/// Report records and their usergroup ACL edges.
pub struct ReportStore {
    db: DatabaseConnection,
}

impl ReportStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, report_id: i32) -> Result<Option<report::Model>, ApiError> {
        report::Entity::find_by_id(report_id)
            .one(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))
    }

    pub async fn get_all(&self) -> Result<Vec<report::Model>, ApiError> {
        report::Entity::find()
            .order_by_asc(report::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))
    }

    pub async fn create(
        &self,
        data: ReportData,
        creator_id: i32,
        usergroup_ids: &[i32],
    ) -> Result<report::Model, ApiError> {
        let clash = report::Entity::find()
            .filter(report::Column::Label.eq(&data.label))
            .one(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))?;
        if clash.is_some() {
            return Err(ApiError::conflict("Report label is not unique."));
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to start transaction: {}", e)))?;

        let created = report::ActiveModel {
            id: sea_orm::ActiveValue::NotSet,
            label: Set(data.label),
            parameters: Set(data.parameters),
            created_on: Set(Utc::now().timestamp()),
            last_published: Set(None),
            creator_id: Set(creator_id),
        }
        .insert(&txn)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to insert report: {}", e)))?;

        let unique_ids: BTreeSet<i32> = usergroup_ids.iter().copied().collect();
        for usergroup_id in unique_ids {
            report_perm::ActiveModel {
                report_id: Set(created.id),
                usergroup_id: Set(usergroup_id),
            }
            .insert(&txn)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to insert report perm: {}", e)))?;
        }

        txn.commit()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to commit transaction: {}", e)))?;

        Ok(created)
    }

    pub async fn update(
        &self,
        report_id: i32,
        changes: ReportChanges,
        usergroup_ids: Option<&[i32]>,
    ) -> Result<report::Model, ApiError> {
        let existing = self
            .find_by_id(report_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Report not recognized."))?;

        if let Some(new_label) = &changes.label {
            let clash = report::Entity::find()
                .filter(report::Column::Label.eq(new_label))
                .filter(report::Column::Id.ne(report_id))
                .one(&self.db)
                .await
                .map_err(|e| ApiError::internal(format!("Database error: {}", e)))?;
            if clash.is_some() {
                return Err(ApiError::conflict("Report label is not unique."));
            }
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to start transaction: {}", e)))?;

        let mut active: report::ActiveModel = existing.into();
        if let Some(label) = changes.label {
            active.label = Set(label);
        }
        if let Some(parameters) = changes.parameters {
            active.parameters = Set(parameters);
        }
        if let Some(last_published) = changes.last_published {
            active.last_published = Set(Some(last_published));
        }

        let updated = active
            .update(&txn)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to update report: {}", e)))?;

        if let Some(ids) = usergroup_ids {
            if !ids.is_empty() {
                report_perm::Entity::delete_many()
                    .filter(report_perm::Column::ReportId.eq(report_id))
                    .exec(&txn)
                    .await
                    .map_err(|e| ApiError::internal(format!("Failed to clear report perms: {}", e)))?;
                let unique_ids: BTreeSet<i32> = ids.iter().copied().collect();
                for usergroup_id in unique_ids {
                    report_perm::ActiveModel {
                        report_id: Set(report_id),
                        usergroup_id: Set(usergroup_id),
                    }
                    .insert(&txn)
                    .await
                    .map_err(|e| ApiError::internal(format!("Failed to insert report perm: {}", e)))?;
                }
            }
        }

        txn.commit()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to commit transaction: {}", e)))?;

        Ok(updated)
    }

    pub async fn delete(&self, report_id: i32) -> Result<(), ApiError> {
        self.find_by_id(report_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Report not recognized."))?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to start transaction: {}", e)))?;

        report_perm::Entity::delete_many()
            .filter(report_perm::Column::ReportId.eq(report_id))
            .exec(&txn)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to delete report perms: {}", e)))?;
        report::Entity::delete_by_id(report_id)
            .exec(&txn)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to delete report: {}", e)))?;

        txn.commit()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to commit transaction: {}", e)))
    }

    pub async fn authorized_ids(&self, usergroup_ids: &[i32]) -> Result<Vec<i32>, ApiError> {
        let edges = report_perm::Entity::find()
            .filter(report_perm::Column::UsergroupId.is_in(usergroup_ids.to_vec()))
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))?;
        let unique: BTreeSet<i32> = edges.into_iter().map(|edge| edge.report_id).collect();
        Ok(unique.into_iter().collect())
    }

    pub async fn authorized(&self, usergroup_ids: &[i32]) -> Result<Vec<report::Model>, ApiError> {
        let ids = self.authorized_ids(usergroup_ids).await?;
        report::Entity::find()
            .filter(report::Column::Id.is_in(ids))
            .order_by_asc(report::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))
    }

    pub async fn usergroups_of(&self, report_id: i32) -> Result<Vec<usergroup::Model>, ApiError> {
        let ids: Vec<i32> = report_perm::Entity::find()
            .filter(report_perm::Column::ReportId.eq(report_id))
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
