use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};

use crate::errors::ApiError;
use crate::types::db::{contact, publication_recipient};

pub struct ContactData {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub public: bool,
}

#[derive(Default)]
pub struct ContactChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub public: Option<bool>,
}

/// Contacts. Unlike the other resource kinds these are not
/// usergroup-scoped: a contact is visible to its creator and, when
/// flagged public, to everyone.
pub struct ContactStore {
    db: DatabaseConnection,
}

impl ContactStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, contact_id: i32) -> Result<Option<contact::Model>, ApiError> {
        contact::Entity::find_by_id(contact_id)
            .one(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))
    }

    pub async fn get_all(&self) -> Result<Vec<contact::Model>, ApiError> {
        contact::Entity::find()
            .order_by_asc(contact::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))
    }

    /// Public contacts plus the requester's own.
    pub async fn visible_to(&self, user_id: i32) -> Result<Vec<contact::Model>, ApiError> {
        contact::Entity::find()
            .filter(
                Condition::any()
                    .add(contact::Column::Public.eq(true))
                    .add(contact::Column::CreatorId.eq(user_id)),
            )
            .order_by_asc(contact::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))
    }

    pub async fn create(&self, data: ContactData, creator_id: i32) -> Result<contact::Model, ApiError> {
        contact::ActiveModel {
            id: sea_orm::ActiveValue::NotSet,
            first_name: Set(data.first_name),
            last_name: Set(data.last_name),
            email: Set(data.email),
            public: Set(data.public),
            creator_id: Set(creator_id),
        }
        .insert(&self.db)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to insert contact: {}", e)))
    }

    pub async fn update(
        &self,
        contact_id: i32,
        changes: ContactChanges,
    ) -> Result<contact::Model, ApiError> {
        let existing = self
            .find_by_id(contact_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Contact not recognized."))?;

        let mut active: contact::ActiveModel = existing.into();
        if let Some(first_name) = changes.first_name {
            active.first_name = Set(first_name);
        }
        if let Some(last_name) = changes.last_name {
            active.last_name = Set(last_name);
        }
        if let Some(email) = changes.email {
            active.email = Set(email);
        }
        if let Some(public) = changes.public {
            active.public = Set(public);
        }

        active
            .update(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to update contact: {}", e)))
    }

    /// Delete a contact and its recipient edges, atomically.
    pub async fn delete(&self, contact_id: i32) -> Result<(), ApiError> {
        self.find_by_id(contact_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Contact not recognized."))?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to start transaction: {}", e)))?;

        publication_recipient::Entity::delete_many()
            .filter(publication_recipient::Column::ContactId.eq(contact_id))
            .exec(&txn)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to delete recipient edges: {}", e)))?;
        contact::Entity::delete_by_id(contact_id)
            .exec(&txn)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to delete contact: {}", e)))?;

        txn.commit()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to commit transaction: {}", e)))
    }
}
