use std::env;

/// Runtime configuration, loaded from the environment (optionally via a
/// .env file).
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: String,
    pub jwt_secret: String,
    pub password_pepper: String,
    pub token_ttl_minutes: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("{0} environment variable must be set")]
    Missing(&'static str),

    #[error("{0} is not a valid value for {1}")]
    Invalid(String, &'static str),
}

impl Settings {
    /// Load settings. `JWT_SECRET` and `PASSWORD_PEPPER` are required;
    /// everything else has a development default.
    pub fn from_env() -> Result<Self, SettingsError> {
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://chartwell.db?mode=rwc".to_string());
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let jwt_secret = env::var("JWT_SECRET").map_err(|_| SettingsError::Missing("JWT_SECRET"))?;
        let password_pepper =
            env::var("PASSWORD_PEPPER").map_err(|_| SettingsError::Missing("PASSWORD_PEPPER"))?;

        let token_ttl_minutes = match env::var("TOKEN_TTL_MINUTES") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| SettingsError::Invalid(raw, "TOKEN_TTL_MINUTES"))?,
            Err(_) => 60,
        };

        Ok(Self {
            database_url,
            bind_addr,
            jwt_secret,
            password_pepper,
            token_ttl_minutes,
        })
    }
}
