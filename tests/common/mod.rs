use std::sync::Arc;

use chartwell_backend::config::Settings;
use chartwell_backend::stores::user_store::NewUser;
use chartwell_backend::types::db::user;
use chartwell_backend::types::internal::Role;
use chartwell_backend::AppData;
use migration::{Migrator, MigratorTrait};
use sea_orm::Database;

/// Fresh in-memory application with migrations applied.
pub async fn setup_app() -> Arc<AppData> {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to create test database");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    let settings = Settings {
        database_url: "sqlite::memory:".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        jwt_secret: "integration-test-secret-32-characters-x".to_string(),
        password_pepper: "integration-test-pepper".to_string(),
        token_ttl_minutes: 60,
    };
    AppData::init(db, &settings)
}

pub async fn create_user(app: &AppData, username: &str, role: Role) -> user::Model {
    app.users
        .create_user(
            NewUser {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                password: "Secret123".to_string(),
                role,
            },
            &[],
        )
        .await
        .expect("Failed to create user")
}

pub async fn login(app: &AppData, username: &str) -> String {
    app.auth
        .login(username, "Secret123")
        .await
        .expect("Failed to login")
}
