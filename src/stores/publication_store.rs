use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use std::collections::BTreeSet;

use crate::errors::ApiError;
use crate::types::db::{contact, publication, publication_recipient};

/// Schedule and delivery settings for one publication of a report.
pub struct PublicationData {
    pub pub_type: String,
    pub frequency: String,
    pub monday: bool,
    pub tuesday: bool,
    pub wednesday: bool,
    pub thursday: bool,
    pub friday: bool,
    pub saturday: bool,
    pub sunday: bool,
    pub day_of_month: Option<i32>,
    pub pub_time: Option<String>,
    pub notification_or_attachment: String,
    pub report_id: i32,
}

#[derive(Default)]
pub struct PublicationChanges {
    pub pub_type: Option<String>,
    pub frequency: Option<String>,
    pub monday: Option<bool>,
    pub tuesday: Option<bool>,
    pub wednesday: Option<bool>,
    pub thursday: Option<bool>,
    pub friday: Option<bool>,
    pub saturday: Option<bool>,
    pub sunday: Option<bool>,
    pub day_of_month: Option<i32>,
    pub pub_time: Option<String>,
    pub notification_or_attachment: Option<String>,
}

/// Publication records and their recipient edges. Actual delivery is a
/// separate concern; nothing here sends anything.
pub struct PublicationStore {
    db: DatabaseConnection,
}

impl PublicationStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(
        &self,
        publication_id: i32,
    ) -> Result<Option<publication::Model>, ApiError> {
        publication::Entity::find_by_id(publication_id)
            .one(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))
    }

    pub async fn get_all(&self) -> Result<Vec<publication::Model>, ApiError> {
        publication::Entity::find()
            .order_by_asc(publication::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))
    }

    pub async fn for_report(&self, report_id: i32) -> Result<Vec<publication::Model>, ApiError> {
        publication::Entity::find()
            .filter(publication::Column::ReportId.eq(report_id))
            .order_by_asc(publication::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))
    }

    pub async fn create(
        &self,
        data: PublicationData,
        creator_id: i32,
        recipient_ids: &[i32],
    ) -> Result<publication::Model, ApiError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to start transaction: {}", e)))?;

        let created = publication::ActiveModel {
            id: sea_orm::ActiveValue::NotSet,
            pub_type: Set(data.pub_type),
            frequency: Set(data.frequency),
            monday: Set(data.monday),
            tuesday: Set(data.tuesday),
            wednesday: Set(data.wednesday),
            thursday: Set(data.thursday),
            friday: Set(data.friday),
            saturday: Set(data.saturday),
            sunday: Set(data.sunday),
            day_of_month: Set(data.day_of_month),
            pub_time: Set(data.pub_time),
            notification_or_attachment: Set(data.notification_or_attachment),
            report_id: Set(data.report_id),
            creator_id: Set(creator_id),
        }
        .insert(&txn)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to insert publication: {}", e)))?;

        let unique_ids: BTreeSet<i32> = recipient_ids.iter().copied().collect();
        for contact_id in unique_ids {
            publication_recipient::ActiveModel {
                publication_id: Set(created.id),
                contact_id: Set(contact_id),
            }
            .insert(&txn)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to insert recipient: {}", e)))?;
        }

        txn.commit()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to commit transaction: {}", e)))?;

        Ok(created)
    }

    /// Apply a partial update. A non-empty `recipient_ids` replaces the
    /// full recipient set.
    pub async fn update(
        &self,
        publication_id: i32,
        changes: PublicationChanges,
        recipient_ids: Option<&[i32]>,
    ) -> Result<publication::Model, ApiError> {
        let existing = self
            .find_by_id(publication_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Publication not recognized."))?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to start transaction: {}", e)))?;

        let mut active: publication::ActiveModel = existing.into();
        if let Some(pub_type) = changes.pub_type {
            active.pub_type = Set(pub_type);
        }
        if let Some(frequency) = changes.frequency {
            active.frequency = Set(frequency);
        }
        if let Some(monday) = changes.monday {
            active.monday = Set(monday);
        }
        if let Some(tuesday) = changes.tuesday {
            active.tuesday = Set(tuesday);
        }
        if let Some(wednesday) = changes.wednesday {
            active.wednesday = Set(wednesday);
        }
        if let Some(thursday) = changes.thursday {
            active.thursday = Set(thursday);
        }
        if let Some(friday) = changes.friday {
            active.friday = Set(friday);
        }
        if let Some(saturday) = changes.saturday {
            active.saturday = Set(saturday);
        }
        if let Some(sunday) = changes.sunday {
            active.sunday = Set(sunday);
        }
        if let Some(day_of_month) = changes.day_of_month {
            active.day_of_month = Set(Some(day_of_month));
        }
        if let Some(pub_time) = changes.pub_time {
            active.pub_time = Set(Some(pub_time));
        }
        if let Some(noa) = changes.notification_or_attachment {
            active.notification_or_attachment = Set(noa);
        }

        let updated = active
            .update(&txn)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to update publication: {}", e)))?;

        if let Some(ids) = recipient_ids {
            if !ids.is_empty() {
                publication_recipient::Entity::delete_many()
                    .filter(publication_recipient::Column::PublicationId.eq(publication_id))
                    .exec(&txn)
                    .await
                    .map_err(|e| ApiError::internal(format!("Failed to clear recipients: {}", e)))?;
                let unique_ids: BTreeSet<i32> = ids.iter().copied().collect();
                for contact_id in unique_ids {
                    publication_recipient::ActiveModel {
                        publication_id: Set(publication_id),
                        contact_id: Set(contact_id),
                    }
                    .insert(&txn)
                    .await
                    .map_err(|e| ApiError::internal(format!("Failed to insert recipient: {}", e)))?;
                }
            }
        }

        txn.commit()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to commit transaction: {}", e)))?;

        Ok(updated)
    }

    pub async fn delete(&self, publication_id: i32) -> Result<(), ApiError> {
        self.find_by_id(publication_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Publication not recognized."))?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to start transaction: {}", e)))?;

        publication_recipient::Entity::delete_many()
            .filter(publication_recipient::Column::PublicationId.eq(publication_id))
            .exec(&txn)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to delete recipients: {}", e)))?;
        publication::Entity::delete_by_id(publication_id)
            .exec(&txn)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to delete publication: {}", e)))?;

        txn.commit()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to commit transaction: {}", e)))
    }

    pub async fn recipients_of(&self, publication_id: i32) -> Result<Vec<contact::Model>, ApiError> {
        let ids: Vec<i32> = publication_recipient::Entity::find()
            .filter(publication_recipient::Column::PublicationId.eq(publication_id))
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))?
            .into_iter()
            .map(|edge| edge.contact_id)
            .collect();
        contact::Entity::find()
            .filter(contact::Column::Id.is_in(ids))
            .order_by_asc(contact::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::contact_store::{ContactData, ContactStore};
    use crate::stores::report_store::{ReportData, ReportStore};
    use crate::stores::user_store::{NewUser, UserStore};
    use crate::types::internal::Role;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    async fn setup() -> (UserStore, ReportStore, ContactStore, PublicationStore) {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to create test database");
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");
        (
            UserStore::new(db.clone(), "test-pepper".to_string()),
            ReportStore::new(db.clone()),
            ContactStore::new(db.clone()),
            PublicationStore::new(db),
        )
    }

    fn weekly_email(report_id: i32) -> PublicationData {
        PublicationData {
            pub_type: "email".to_string(),
            frequency: "weekly".to_string(),
            monday: true,
            tuesday: false,
            wednesday: false,
            thursday: false,
            friday: true,
            saturday: false,
            sunday: false,
            day_of_month: None,
            pub_time: Some("08:30".to_string()),
            notification_or_attachment: "attachment".to_string(),
            report_id,
        }
    }

    #[tokio::test]
    async fn test_create_with_recipients_and_list_for_report() {
        let (users, reports, contacts, publications) = setup().await;

        let sam = users
            .create_user(
                NewUser {
                    username: "samseaborn".to_string(),
                    email: "sam@whitehouse.gov".to_string(),
                    password: "Secret123".to_string(),
                    role: Role::Writer,
                },
                &[],
            )
            .await
            .unwrap();

        let report = reports
            .create(
                ReportData {
                    label: "weekly_kpis".to_string(),
                    parameters: "{}".to_string(),
                },
                sam.id,
                &[],
            )
            .await
            .unwrap();

        let josiah = contacts
            .create(
                ContactData {
                    first_name: "josiah".to_string(),
                    last_name: "bartlet".to_string(),
                    email: "jbartlet@whitehouse.gov".to_string(),
                    public: true,
                },
                sam.id,
            )
            .await
            .unwrap();

        let created = publications
            .create(weekly_email(report.id), sam.id, &[josiah.id])
            .await
            .unwrap();

        let listed = publications.for_report(report.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.id);
        assert!(listed[0].monday);
        assert!(!listed[0].tuesday);

        let recipients = publications.recipients_of(created.id).await.unwrap();
        assert_eq!(recipients.len(), 1);
        assert_eq!(recipients[0].first_name, "josiah");
    }

    #[tokio::test]
    async fn test_update_replaces_recipients_when_supplied() {
        let (users, reports, contacts, publications) = setup().await;

        let sam = users
            .create_user(
                NewUser {
                    username: "samseaborn".to_string(),
                    email: "sam@whitehouse.gov".to_string(),
                    password: "Secret123".to_string(),
                    role: Role::Writer,
                },
                &[],
            )
            .await
            .unwrap();
        let report = reports
            .create(
                ReportData {
                    label: "weekly_kpis".to_string(),
                    parameters: "{}".to_string(),
                },
                sam.id,
                &[],
            )
            .await
            .unwrap();
        let a = contacts
            .create(
                ContactData {
                    first_name: "toby".to_string(),
                    last_name: "ziegler".to_string(),
                    email: "tz@whitehouse.gov".to_string(),
                    public: false,
                },
                sam.id,
            )
            .await
            .unwrap();
        let b = contacts
            .create(
                ContactData {
                    first_name: "leo".to_string(),
                    last_name: "mcgarry".to_string(),
                    email: "lm@whitehouse.gov".to_string(),
                    public: false,
                },
                sam.id,
            )
            .await
            .unwrap();

        let created = publications
            .create(weekly_email(report.id), sam.id, &[a.id])
            .await
            .unwrap();

        publications
            .update(created.id, PublicationChanges::default(), Some(&[b.id]))
            .await
            .unwrap();

        let recipients = publications.recipients_of(created.id).await.unwrap();
        assert_eq!(recipients.len(), 1);
        assert_eq!(recipients[0].id, b.id);
    }

    #[tokio::test]
    async fn test_delete_removes_publication_and_edges() {
        let (users, reports, _contacts, publications) = setup().await;

        let sam = users
            .create_user(
                NewUser {
                    username: "samseaborn".to_string(),
                    email: "sam@whitehouse.gov".to_string(),
                    password: "Secret123".to_string(),
                    role: Role::Writer,
                },
                &[],
            )
            .await
            .unwrap();
        let report = reports
            .create(
                ReportData {
                    label: "weekly_kpis".to_string(),
                    parameters: "{}".to_string(),
                },
                sam.id,
                &[],
            )
            .await
            .unwrap();

        let created = publications
            .create(weekly_email(report.id), sam.id, &[])
            .await
            .unwrap();
        publications.delete(created.id).await.unwrap();

        assert!(publications.find_by_id(created.id).await.unwrap().is_none());
        assert!(publications.for_report(report.id).await.unwrap().is_empty());
    }
}
