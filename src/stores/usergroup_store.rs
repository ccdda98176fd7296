use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

use crate::errors::ApiError;
use crate::types::db::{
    chart, chart_perm, connection, connection_perm, query_perm, report, report_perm, sql_query,
    user, user_usergroup, usergroup,
};

/// The many-to-many graph between users, usergroups and the four
/// usergroup-scoped resource kinds.
///
/// Edges live in explicit association tables and are only ever touched
/// through the methods here (or inside `UserStore` transactions for the
/// personal-group lifecycle). Nothing cascades implicitly.
pub struct UsergroupStore {
    db: DatabaseConnection,
}

impl UsergroupStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, usergroup_id: i32) -> Result<Option<usergroup::Model>, ApiError> {
        usergroup::Entity::find_by_id(usergroup_id)
            .one(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))
    }

    /// Case-insensitive label lookup; label uniqueness is enforced
    /// against the lower-cased form.
    pub async fn find_by_label(&self, label: &str) -> Result<Option<usergroup::Model>, ApiError> {
        usergroup::Entity::find()
            .filter(
                Expr::expr(Func::lower(Expr::col((
                    usergroup::Entity,
                    usergroup::Column::Label,
                ))))
                .eq(label.to_lowercase()),
            )
            .one(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))
    }

    pub async fn get_all(&self) -> Result<Vec<usergroup::Model>, ApiError> {
        usergroup::Entity::find()
            .order_by_asc(usergroup::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))
    }

    /// Create a shared usergroup. Personal groups are created only by
    /// `UserStore::create_user`.
    pub async fn create(&self, label: &str) -> Result<usergroup::Model, ApiError> {
        if self.find_by_label(label).await?.is_some() {
            return Err(ApiError::conflict("Usergroup label is not unique."));
        }

        usergroup::ActiveModel {
            id: sea_orm::ActiveValue::NotSet,
            label: Set(label.to_string()),
            personal_group: Set(false),
        }
        .insert(&self.db)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to insert usergroup: {}", e)))
    }

    /// Rename a usergroup. Callers are responsible for having denied
    /// personal groups already.
    pub async fn rename(&self, usergroup_id: i32, label: &str) -> Result<usergroup::Model, ApiError> {
        let existing = self
            .find_by_id(usergroup_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Provided usergroup_id not found."))?;

        if let Some(clash) = self.find_by_label(label).await? {
            if clash.id != usergroup_id {
                return Err(ApiError::conflict("Usergroup label is not unique."));
            }
        }

        let mut active: usergroup::ActiveModel = existing.into();
        active.label = Set(label.to_string());
        active
            .update(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to update usergroup: {}", e)))
    }

    /// Delete a usergroup and all of its edges. Members and resources
    /// survive; only their association with this group goes away.
    pub async fn delete(&self, usergroup_id: i32) -> Result<(), ApiError> {
        self.find_by_id(usergroup_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Provided usergroup_id not found."))?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to start transaction: {}", e)))?;

        user_usergroup::Entity::delete_many()
            .filter(user_usergroup::Column::UsergroupId.eq(usergroup_id))
            .exec(&txn)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to delete memberships: {}", e)))?;
        connection_perm::Entity::delete_many()
            .filter(connection_perm::Column::UsergroupId.eq(usergroup_id))
            .exec(&txn)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to delete connection perms: {}", e)))?;
        query_perm::Entity::delete_many()
            .filter(query_perm::Column::UsergroupId.eq(usergroup_id))
            .exec(&txn)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to delete query perms: {}", e)))?;
        chart_perm::Entity::delete_many()
            .filter(chart_perm::Column::UsergroupId.eq(usergroup_id))
            .exec(&txn)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to delete chart perms: {}", e)))?;
        report_perm::Entity::delete_many()
            .filter(report_perm::Column::UsergroupId.eq(usergroup_id))
            .exec(&txn)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to delete report perms: {}", e)))?;

        usergroup::Entity::delete_by_id(usergroup_id)
            .exec(&txn)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to delete usergroup: {}", e)))?;

        txn.commit()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to commit transaction: {}", e)))
    }

    /// Fail with NotFound unless every id references an existing group.
    pub async fn ensure_exist(&self, usergroup_ids: &[i32]) -> Result<(), ApiError> {
        for usergroup_id in usergroup_ids {
            if self.find_by_id(*usergroup_id).await?.is_none() {
                return Err(ApiError::not_found("Usergroup not recognized."));
            }
        }
        Ok(())
    }

    /// Ids of every usergroup the user belongs to.
    pub async fn usergroup_ids_of(&self, user_id: i32) -> Result<Vec<i32>, ApiError> {
        let edges = user_usergroup::Entity::find()
            .filter(user_usergroup::Column::UserId.eq(user_id))
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))?;
        Ok(edges.into_iter().map(|edge| edge.usergroup_id).collect())
    }

    pub async fn usergroups_of(&self, user_id: i32) -> Result<Vec<usergroup::Model>, ApiError> {
        let ids = self.usergroup_ids_of(user_id).await?;
        usergroup::Entity::find()
            .filter(usergroup::Column::Id.is_in(ids))
            .order_by_asc(usergroup::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))
    }

    /// The user's auto-created personal group, if the user exists.
    pub async fn personal_group_of(&self, user_id: i32) -> Result<Option<usergroup::Model>, ApiError> {
        let ids = self.usergroup_ids_of(user_id).await?;
        usergroup::Entity::find()
            .filter(usergroup::Column::Id.is_in(ids))
            .filter(usergroup::Column::PersonalGroup.eq(true))
            .one(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))
    }

    pub async fn members_of(&self, usergroup_id: i32) -> Result<Vec<user::Model>, ApiError> {
        let member_ids: Vec<i32> = user_usergroup::Entity::find()
            .filter(user_usergroup::Column::UsergroupId.eq(usergroup_id))
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))?
            .into_iter()
            .map(|edge| edge.user_id)
            .collect();
        user::Entity::find()
            .filter(user::Column::Id.is_in(member_ids))
            .order_by_asc(user::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))
    }

    /// Add members to a group. Existing memberships are left alone;
    /// unknown users fail the whole call.
    pub async fn add_members(&self, usergroup_id: i32, user_ids: &[i32]) -> Result<(), ApiError> {
        for user_id in user_ids {
            let exists = user::Entity::find_by_id(*user_id)
                .one(&self.db)
                .await
                .map_err(|e| ApiError::internal(format!("Database error: {}", e)))?;
            if exists.is_none() {
                return Err(ApiError::not_found("User not recognized."));
            }
        }
        for user_id in user_ids {
            let edge = user_usergroup::Entity::find_by_id((*user_id, usergroup_id))
                .one(&self.db)
                .await
                .map_err(|e| ApiError::internal(format!("Database error: {}", e)))?;
            if edge.is_none() {
                user_usergroup::ActiveModel {
                    user_id: Set(*user_id),
                    usergroup_id: Set(usergroup_id),
                }
                .insert(&self.db)
                .await
                .map_err(|e| ApiError::internal(format!("Failed to insert membership: {}", e)))?;
            }
        }
        Ok(())
    }

    pub async fn attach_connections(
        &self,
        usergroup_id: i32,
        connection_ids: &[i32],
    ) -> Result<(), ApiError> {
        for connection_id in connection_ids {
            let exists = connection::Entity::find_by_id(*connection_id)
                .one(&self.db)
                .await
                .map_err(|e| ApiError::internal(format!("Database error: {}", e)))?;
            if exists.is_none() {
                return Err(ApiError::not_found("Connection not recognized."));
            }
        }
        for connection_id in connection_ids {
            let edge = connection_perm::Entity::find_by_id((*connection_id, usergroup_id))
                .one(&self.db)
                .await
                .map_err(|e| ApiError::internal(format!("Database error: {}", e)))?;
            if edge.is_none() {
                connection_perm::ActiveModel {
                    connection_id: Set(*connection_id),
                    usergroup_id: Set(usergroup_id),
                }
                .insert(&self.db)
                .await
                .map_err(|e| ApiError::internal(format!("Failed to insert connection perm: {}", e)))?;
            }
        }
        Ok(())
    }

    pub async fn attach_queries(&self, usergroup_id: i32, query_ids: &[i32]) -> Result<(), ApiError> {
        for query_id in query_ids {
            let exists = sql_query::Entity::find_by_id(*query_id)
                .one(&self.db)
                .await
                .map_err(|e| ApiError::internal(format!("Database error: {}", e)))?;
            if exists.is_none() {
                return Err(ApiError::not_found("Query not recognized."));
            }
        }
        for query_id in query_ids {
            let edge = query_perm::Entity::find_by_id((*query_id, usergroup_id))
                .one(&self.db)
                .await
                .map_err(|e| ApiError::internal(format!("Database error: {}", e)))?;
            if edge.is_none() {
                query_perm::ActiveModel {
                    query_id: Set(*query_id),
                    usergroup_id: Set(usergroup_id),
                }
                .insert(&self.db)
                .await
                .map_err(|e| ApiError::internal(format!("Failed to insert query perm: {}", e)))?;
            }
        }
        Ok(())
    }

    pub async fn attach_charts(&self, usergroup_id: i32, chart_ids: &[i32]) -> Result<(), ApiError> {
        for chart_id in chart_ids {
            let exists = chart::Entity::find_by_id(*chart_id)
                .one(&self.db)
                .await
                .map_err(|e| ApiError::internal(format!("Database error: {}", e)))?;
            if exists.is_none() {
                return Err(ApiError::not_found("Chart not recognized."));
            }
        }
        for chart_id in chart_ids {
            let edge = chart_perm::Entity::find_by_id((*chart_id, usergroup_id))
                .one(&self.db)
                .await
                .map_err(|e| ApiError::internal(format!("Database error: {}", e)))?;
            if edge.is_none() {
                chart_perm::ActiveModel {
                    chart_id: Set(*chart_id),
                    usergroup_id: Set(usergroup_id),
                }
                .insert(&self.db)
                .await
                .map_err(|e| ApiError::internal(format!("Failed to insert chart perm: {}", e)))?;
            }
        }
        Ok(())
    }

    pub async fn attach_reports(&self, usergroup_id: i32, report_ids: &[i32]) -> Result<(), ApiError> {
        for report_id in report_ids {
            let exists = report::Entity::find_by_id(*report_id)
                .one(&self.db)
                .await
                .map_err(|e| ApiError::internal(format!("Database error: {}", e)))?;
            if exists.is_none() {
                return Err(ApiError::not_found("Report not recognized."));
            }
        }
        for report_id in report_ids {
            let edge = report_perm::Entity::find_by_id((*report_id, usergroup_id))
                .one(&self.db)
                .await
                .map_err(|e| ApiError::internal(format!("Database error: {}", e)))?;
            if edge.is_none() {
                report_perm::ActiveModel {
                    report_id: Set(*report_id),
                    usergroup_id: Set(usergroup_id),
                }
                .insert(&self.db)
                .await
                .map_err(|e| ApiError::internal(format!("Failed to insert report perm: {}", e)))?;
            }
        }
        Ok(())
    }

    pub async fn connections_of(&self, usergroup_id: i32) -> Result<Vec<connection::Model>, ApiError> {
        let ids: Vec<i32> = connection_perm::Entity::find()
            .filter(connection_perm::Column::UsergroupId.eq(usergroup_id))
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))?
            .into_iter()
            .map(|edge| edge.connection_id)
            .collect();
        connection::Entity::find()
            .filter(connection::Column::Id.is_in(ids))
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))
    }

    pub async fn queries_of(&self, usergroup_id: i32) -> Result<Vec<sql_query::Model>, ApiError> {
        let ids: Vec<i32> = query_perm::Entity::find()
            .filter(query_perm::Column::UsergroupId.eq(usergroup_id))
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))?
            .into_iter()
            .map(|edge| edge.query_id)
            .collect();
        sql_query::Entity::find()
            .filter(sql_query::Column::Id.is_in(ids))
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))
    }

    pub async fn charts_of(&self, usergroup_id: i32) -> Result<Vec<chart::Model>, ApiError> {
        let ids: Vec<i32> = chart_perm::Entity::find()
            .filter(chart_perm::Column::UsergroupId.eq(usergroup_id))
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))?
            .into_iter()
            .map(|edge| edge.chart_id)
            .collect();
        chart::Entity::find()
            .filter(chart::Column::Id.is_in(ids))
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))
    }

    pub async fn reports_of(&self, usergroup_id: i32) -> Result<Vec<report::Model>, ApiError> {
        let ids: Vec<i32> = report_perm::Entity::find()
            .filter(report_perm::Column::UsergroupId.eq(usergroup_id))
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))?
            .into_iter()
            .map(|edge| edge.report_id)
            .collect();
        report::Entity::find()
            .filter(report::Column::Id.is_in(ids))
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::user_store::{NewUser, UserStore};
    use crate::types::internal::Role;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    async fn setup_stores() -> (DatabaseConnection, UserStore, UsergroupStore) {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to create test database");
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");
        let users = UserStore::new(db.clone(), "test-pepper".to_string());
        let groups = UsergroupStore::new(db.clone());
        (db, users, groups)
    }

    async fn create_user(users: &UserStore, username: &str) -> i32 {
        users
            .create_user(
                NewUser {
                    username: username.to_string(),
                    email: format!("{}@whitehouse.gov", username),
                    password: "Secret123".to_string(),
                    role: Role::Writer,
                },
                &[],
            )
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_create_and_find_by_label_ignores_case() {
        let (_db, _users, groups) = setup_stores().await;

        groups.create("Analysts").await.unwrap();
        assert!(groups.find_by_label("analysts").await.unwrap().is_some());
        assert!(groups.find_by_label("ANALYSTS").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_duplicate_label_is_conflict() {
        let (_db, _users, groups) = setup_stores().await;

        groups.create("analysts").await.unwrap();
        let result = groups.create("Analysts").await;
        assert!(matches!(result, Err(ApiError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_membership_queries() {
        let (_db, users, groups) = setup_stores().await;

        let sam = create_user(&users, "samseaborn").await;
        let shared = groups.create("analysts").await.unwrap();
        groups.add_members(shared.id, &[sam]).await.unwrap();

        let ids = groups.usergroup_ids_of(sam).await.unwrap();
        assert_eq!(ids.len(), 2); // personal + analysts
        assert!(ids.contains(&shared.id));

        let members = groups.members_of(shared.id).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].username, "samseaborn");

        let personal = groups.personal_group_of(sam).await.unwrap().unwrap();
        assert_eq!(personal.label, "personal_samseaborn");
        let personal_members = groups.members_of(personal.id).await.unwrap();
        assert_eq!(personal_members.len(), 1);
        assert_eq!(personal_members[0].id, sam);
    }

    #[tokio::test]
    async fn test_add_members_is_idempotent_and_validates() {
        let (_db, users, groups) = setup_stores().await;

        let sam = create_user(&users, "samseaborn").await;
        let shared = groups.create("analysts").await.unwrap();

        groups.add_members(shared.id, &[sam]).await.unwrap();
        groups.add_members(shared.id, &[sam]).await.unwrap();
        assert_eq!(groups.members_of(shared.id).await.unwrap().len(), 1);

        let result = groups.add_members(shared.id, &[99999]).await;
        match result {
            Err(ApiError::NotFound(body)) => assert_eq!(body.0.msg, "User not recognized."),
            _ => panic!("Expected NotFound error"),
        }
    }

    #[tokio::test]
    async fn test_delete_group_removes_edges_but_not_members() {
        let (_db, users, groups) = setup_stores().await;

        let sam = create_user(&users, "samseaborn").await;
        let shared = groups.create("analysts").await.unwrap();
        groups.add_members(shared.id, &[sam]).await.unwrap();

        groups.delete(shared.id).await.unwrap();

        assert!(groups.find_by_id(shared.id).await.unwrap().is_none());
        assert!(users.find_by_id(sam).await.unwrap().is_some());
        let ids = groups.usergroup_ids_of(sam).await.unwrap();
        assert_eq!(ids.len(), 1); // only the personal group remains
    }

    #[tokio::test]
    async fn test_ensure_exist() {
        let (_db, _users, groups) = setup_stores().await;

        let shared = groups.create("analysts").await.unwrap();
        assert!(groups.ensure_exist(&[shared.id]).await.is_ok());
        assert!(groups.ensure_exist(&[shared.id, 424242]).await.is_err());
    }
}
