use poem::{listener::TcpListener, Route, Server};
use poem_openapi::OpenApiService;
use sea_orm::{Database, DatabaseConnection};

use chartwell_backend::api::{
    ChartApi, ConnectionApi, ContactApi, HealthApi, PublicationApi, QueryApi, ReportApi,
    SessionApi, UserApi, UsergroupApi,
};
use chartwell_backend::config::{init_logging, Settings};
use chartwell_backend::AppData;
use migration::{Migrator, MigratorTrait};

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    init_logging().expect("Failed to initialize logging");

    let settings = Settings::from_env().expect("Failed to load settings");

    let db: DatabaseConnection = Database::connect(&settings.database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!(database_url = %settings.database_url, "connected to database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    tracing::info!("database migrations completed");

    let app_data = AppData::init(db, &settings);

    let api_service = OpenApiService::new(
        (
            HealthApi,
            SessionApi::new(app_data.auth.clone()),
            UserApi::new(
                app_data.users.clone(),
                app_data.usergroups.clone(),
                app_data.auth.clone(),
            ),
            UsergroupApi::new(app_data.usergroups.clone(), app_data.auth.clone()),
            ConnectionApi::new(
                app_data.connections.clone(),
                app_data.usergroups.clone(),
                app_data.users.clone(),
                app_data.auth.clone(),
            ),
            QueryApi::new(
                app_data.queries.clone(),
                app_data.usergroups.clone(),
                app_data.users.clone(),
                app_data.auth.clone(),
            ),
            ChartApi::new(
                app_data.charts.clone(),
                app_data.queries.clone(),
                app_data.connections.clone(),
                app_data.usergroups.clone(),
                app_data.users.clone(),
                app_data.auth.clone(),
            ),
            ReportApi::new(
                app_data.reports.clone(),
                app_data.usergroups.clone(),
                app_data.users.clone(),
                app_data.auth.clone(),
            ),
            ContactApi::new(
                app_data.contacts.clone(),
                app_data.users.clone(),
                app_data.auth.clone(),
            ),
            PublicationApi::new(
                app_data.publications.clone(),
                app_data.reports.clone(),
                app_data.contacts.clone(),
                app_data.usergroups.clone(),
                app_data.users.clone(),
                app_data.auth.clone(),
            ),
        ),
        "Chartwell Admin API",
        env!("CARGO_PKG_VERSION"),
    )
    .server(format!("http://{}/api", settings.bind_addr));

    let ui = api_service.swagger_ui();

    let app = Route::new().nest("/api", api_service).nest("/swagger", ui);

    tracing::info!(bind_addr = %settings.bind_addr, "starting server");

    Server::new(TcpListener::bind(settings.bind_addr))
        .run(app)
        .await
}
