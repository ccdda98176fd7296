use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, Set, TransactionTrait,
};
use std::collections::BTreeSet;
use std::fmt;

use crate::errors::ApiError;
use crate::services::validators::personal_group_label;
use crate::types::db::{
    chart_perm, connection_perm, query_perm, report_perm, user, user_usergroup, usergroup,
};
use crate::types::internal::Role;

/// Fields for a new user. Username and email arrive already validated
/// and normalized; the password arrives as validated plaintext and is
/// hashed here.
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Partial update for an existing user. `None` leaves a field untouched.
/// A non-empty `usergroup_ids` replaces the user's full membership set;
/// the personal usergroup is always retained.
#[derive(Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub usergroup_ids: Option<Vec<i32>>,
}

/// Owns user records, their credentials and the lifecycle of the
/// personal usergroup that is co-created and co-destroyed with each
/// user.
pub struct UserStore {
    db: DatabaseConnection,
    password_pepper: String,
}

impl UserStore {
    /// # Arguments
    /// * `db` - the database connection
    /// * `password_pepper` - process-wide secret mixed into every hash
    pub fn new(db: DatabaseConnection, password_pepper: String) -> Self {
        Self {
            db,
            password_pepper,
        }
    }

    fn hasher(&self) -> Result<Argon2<'_>, ApiError> {
        Argon2::new_with_secret(
            self.password_pepper.as_bytes(),
            Algorithm::Argon2id,
            Version::V0x13,
            Params::default(),
        )
        .map_err(|e| ApiError::internal(format!("Failed to initialize Argon2 with secret: {}", e)))
    }

    /// Hash a plaintext password with Argon2id and a per-hash salt.
    /// The plaintext is never stored.
    pub fn hash_password(&self, plaintext: &str) -> Result<String, ApiError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .hasher()?
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| ApiError::internal(format!("Password hashing error: {}", e)))?;
        Ok(hash.to_string())
    }

    /// Verify a plaintext password against a stored hash. Any parse or
    /// verification failure is just `false`; callers never learn why.
    pub fn verify_password(&self, plaintext: &str, stored_hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored_hash) else {
            return false;
        };
        let Ok(argon2) = self.hasher() else {
            return false;
        };
        argon2.verify_password(plaintext.as_bytes(), &parsed).is_ok()
    }

    pub async fn find_by_id(&self, user_id: i32) -> Result<Option<user::Model>, ApiError> {
        user::Entity::find_by_id(user_id)
            .one(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))
    }

    /// Look up a user by username. The input is normalized to
    /// lower-case before comparison, matching how usernames are stored.
    pub async fn find_by_username(&self, username: &str) -> Result<Option<user::Model>, ApiError> {
        user::Entity::find()
            .filter(user::Column::Username.eq(username.to_lowercase()))
            .one(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))
    }

    pub async fn get_all(&self) -> Result<Vec<user::Model>, ApiError> {
        user::Entity::find()
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))
    }

    /// Create a user together with its personal usergroup and membership
    /// edges, atomically.
    ///
    /// # Arguments
    /// * `new_user` - validated, normalized user fields
    /// * `usergroup_ids` - additional (existing) usergroups to join
    pub async fn create_user(
        &self,
        new_user: NewUser,
        usergroup_ids: &[i32],
    ) -> Result<user::Model, ApiError> {
        if self.find_by_username(&new_user.username).await?.is_some() {
            return Err(ApiError::conflict("Username is not unique."));
        }
        let existing_email = user::Entity::find()
            .filter(user::Column::Email.eq(&new_user.email))
            .one(&self.db)
            .await
            .map_err(|e| ApiError::internal(format!("Database error: {}", e)))?;
        if existing_email.is_some() {
            return Err(ApiError::conflict("Email address already in use."));
        }

        let password_hash = self.hash_password(&new_user.password)?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to start transaction: {}", e)))?;

        let user_row = user::ActiveModel {
            id: sea_orm::ActiveValue::NotSet,
            username: Set(new_user.username.clone()),
            email: Set(new_user.email),
            password_hash: Set(password_hash),
            role: Set(new_user.role.as_str().to_string()),
            is_active: Set(true),
            created_at: Set(Utc::now().timestamp()),
        }
        .insert(&txn)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to insert user: {}", e)))?;

        let personal = usergroup::ActiveModel {
            id: sea_orm::ActiveValue::NotSet,
            label: Set(personal_group_label(&new_user.username)),
            personal_group: Set(true),
        }
        .insert(&txn)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to insert personal usergroup: {}", e)))?;

        let mut member_of: BTreeSet<i32> = usergroup_ids.iter().copied().collect();
        member_of.insert(personal.id);
        for usergroup_id in member_of {
            user_usergroup::ActiveModel {
                user_id: Set(user_row.id),
                usergroup_id: Set(usergroup_id),
            }
            .insert(&txn)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to insert membership: {}", e)))?;
        }

        txn.commit()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to commit transaction: {}", e)))?;

        Ok(user_row)
    }

    /// Apply a partial update. A username change also renames the
    /// personal usergroup so the `personal_<username>` convention holds.
    pub async fn update_user(
        &self,
        user_id: i32,
        changes: UserChanges,
    ) -> Result<user::Model, ApiError> {
        let existing = self
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Provided user_id not found."))?;

        if let Some(new_username) = &changes.username {
            let clash = user::Entity::find()
                .filter(user::Column::Username.eq(new_username))
                .filter(user::Column::Id.ne(user_id))
                .one(&self.db)
                .await
                .map_err(|e| ApiError::internal(format!("Database error: {}", e)))?;
            if clash.is_some() {
                return Err(ApiError::conflict("Username is not unique."));
            }
        }
        if let Some(new_email) = &changes.email {
            let clash = user::Entity::find()
                .filter(user::Column::Email.eq(new_email))
                .filter(user::Column::Id.ne(user_id))
                .one(&self.db)
                .await
                .map_err(|e| ApiError::internal(format!("Database error: {}", e)))?;
            if clash.is_some() {
                return Err(ApiError::conflict("Email address already in use."));
            }
        }

        let password_hash = match &changes.password {
            Some(plaintext) => Some(self.hash_password(plaintext)?),
            None => None,
        };

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to start transaction: {}", e)))?;

        let personal = personal_group_in_txn(&txn, user_id).await?;

        let mut active: user::ActiveModel = existing.into();
        if let Some(new_username) = &changes.username {
            active.username = Set(new_username.clone());

            // Keep the personal group label in step with the username.
            if let Some(personal_group) = &personal {
                let mut group: usergroup::ActiveModel = personal_group.clone().into();
                group.label = Set(personal_group_label(new_username));
                group
                    .update(&txn)
                    .await
                    .map_err(|e| ApiError::internal(format!("Failed to rename personal usergroup: {}", e)))?;
            }
        }
        if let Some(new_email) = changes.email {
            active.email = Set(new_email);
        }
        if let Some(hash) = password_hash {
            active.password_hash = Set(hash);
        }
        if let Some(role) = changes.role {
            active.role = Set(role.as_str().to_string());
        }
        if let Some(is_active) = changes.is_active {
            active.is_active = Set(is_active);
        }

        let updated = active
            .update(&txn)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to update user: {}", e)))?;

        // Replace-semantics for memberships; the personal group is
        // always retained.
        if let Some(usergroup_ids) = &changes.usergroup_ids {
            if !usergroup_ids.is_empty() {
                let mut member_of: BTreeSet<i32> = usergroup_ids.iter().copied().collect();
                if let Some(personal_group) = &personal {
                    member_of.insert(personal_group.id);
                }

                user_usergroup::Entity::delete_many()
                    .filter(user_usergroup::Column::UserId.eq(user_id))
                    .exec(&txn)
                    .await
                    .map_err(|e| ApiError::internal(format!("Failed to clear memberships: {}", e)))?;

                for usergroup_id in member_of {
                    user_usergroup::ActiveModel {
                        user_id: Set(user_id),
                        usergroup_id: Set(usergroup_id),
                    }
                    .insert(&txn)
                    .await
                    .map_err(|e| ApiError::internal(format!("Failed to insert membership: {}", e)))?;
                }
            }
        }

        txn.commit()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to commit transaction: {}", e)))?;

        Ok(updated)
    }

    /// Delete a user, their membership edges and their personal
    /// usergroup (including its ACL edges), atomically. Shared
    /// usergroups the user belonged to are left intact.
    pub async fn delete_user(&self, user_id: i32) -> Result<(), ApiError> {
        let existing = self
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Provided user_id not found."))?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to start transaction: {}", e)))?;

        let personal = personal_group_in_txn(&txn, user_id).await?;

        user_usergroup::Entity::delete_many()
            .filter(user_usergroup::Column::UserId.eq(user_id))
            .exec(&txn)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to delete memberships: {}", e)))?;

        if let Some(personal_group) = personal {
            connection_perm::Entity::delete_many()
                .filter(connection_perm::Column::UsergroupId.eq(personal_group.id))
                .exec(&txn)
                .await
                .map_err(|e| ApiError::internal(format!("Failed to delete connection perms: {}", e)))?;
            query_perm::Entity::delete_many()
                .filter(query_perm::Column::UsergroupId.eq(personal_group.id))
                .exec(&txn)
                .await
                .map_err(|e| ApiError::internal(format!("Failed to delete query perms: {}", e)))?;
            chart_perm::Entity::delete_many()
                .filter(chart_perm::Column::UsergroupId.eq(personal_group.id))
                .exec(&txn)
                .await
                .map_err(|e| ApiError::internal(format!("Failed to delete chart perms: {}", e)))?;
            report_perm::Entity::delete_many()
                .filter(report_perm::Column::UsergroupId.eq(personal_group.id))
                .exec(&txn)
                .await
                .map_err(|e| ApiError::internal(format!("Failed to delete report perms: {}", e)))?;

            usergroup::Entity::delete_by_id(personal_group.id)
                .exec(&txn)
                .await
                .map_err(|e| ApiError::internal(format!("Failed to delete personal usergroup: {}", e)))?;
        }

        user::Entity::delete_by_id(existing.id)
            .exec(&txn)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to delete user: {}", e)))?;

        txn.commit()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to commit transaction: {}", e)))
    }
}

/// Find a user's personal usergroup inside an open transaction.
async fn personal_group_in_txn(
    txn: &DatabaseTransaction,
    user_id: i32,
) -> Result<Option<usergroup::Model>, ApiError> {
    let membership_ids: Vec<i32> = user_usergroup::Entity::find()
        .filter(user_usergroup::Column::UserId.eq(user_id))
        .all(txn)
        .await
        .map_err(|e| ApiError::internal(format!("Database error: {}", e)))?
        .into_iter()
        .map(|edge| edge.usergroup_id)
        .collect();

    usergroup::Entity::find()
        .filter(usergroup::Column::Id.is_in(membership_ids))
        .filter(usergroup::Column::PersonalGroup.eq(true))
        .one(txn)
        .await
        .map_err(|e| ApiError::internal(format!("Database error: {}", e)))
}

impl fmt::Debug for UserStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserStore")
            .field("db", &"<connection>")
            .field("password_pepper", &"<redacted>")
            .finish()
    }
}
