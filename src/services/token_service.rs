use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::fmt;
use uuid::Uuid;

use crate::errors::ApiError;
use crate::types::db::{user, usergroup};
use crate::types::internal::{Claims, Role, UsergroupClaim};

/// Issues and validates the signed identity tokens.
///
/// A token carries the full claims snapshot of the user at login time;
/// nothing here touches the database. Revocation is layered on top by
/// `AuthService` via the blacklist store.
pub struct TokenService {
    jwt_secret: String,
    token_ttl_minutes: i64,
}

impl TokenService {
    pub fn new(jwt_secret: String, token_ttl_minutes: i64) -> Self {
        Self {
            jwt_secret,
            token_ttl_minutes,
        }
    }

    /// Issue a token for `user`, embedding the authorization snapshot.
    ///
    /// # Arguments
    /// * `user` - the authenticated user record
    /// * `usergroups` - the user's current usergroup memberships
    pub fn issue(
        &self,
        user: &user::Model,
        usergroups: &[usergroup::Model],
    ) -> Result<String, ApiError> {
        let role = Role::parse(&user.role)
            .ok_or_else(|| ApiError::internal(format!("unknown role '{}' stored for user {}", user.role, user.id)))?;

        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.username.clone(),
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + self.token_ttl_minutes * 60,
            user_id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role,
            is_active: user.is_active,
            usergroups: usergroups
                .iter()
                .map(|ug| UsergroupClaim {
                    id: ug.id,
                    label: ug.label.clone(),
                })
                .collect(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| ApiError::internal(format!("Failed to sign token: {}", e)))
    }

    /// Decode and verify a token, returning the embedded claims.
    ///
    /// Malformed, tampered and expired tokens all collapse into the same
    /// invalid-token error.
    pub fn decode(&self, token: &str) -> Result<Claims, ApiError> {
        let validation = Validation::new(Algorithm::HS256);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|_| ApiError::invalid_token())
    }
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl_minutes", &self.token_ttl_minutes)
            .finish()
    }
}
