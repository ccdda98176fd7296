use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::config::Settings;
use crate::services::{AuthService, TokenService};
use crate::stores::{
    ChartStore, ConnectionStore, ContactStore, PublicationStore, QueryStore, ReportStore,
    TokenBlacklistStore, UsergroupStore, UserStore,
};

/// Centralized application data following the main-owned stores
/// pattern: every store and service is created once here and shared
/// with the API structs through Arcs.
pub struct AppData {
    pub db: DatabaseConnection,
    pub users: Arc<UserStore>,
    pub usergroups: Arc<UsergroupStore>,
    pub connections: Arc<ConnectionStore>,
    pub queries: Arc<QueryStore>,
    pub charts: Arc<ChartStore>,
    pub reports: Arc<ReportStore>,
    pub contacts: Arc<ContactStore>,
    pub publications: Arc<PublicationStore>,
    pub blacklist: Arc<TokenBlacklistStore>,
    pub auth: Arc<AuthService>,
}

impl AppData {
    /// Wire up every store and service against one database connection.
    /// The connection should already be migrated.
    pub fn init(db: DatabaseConnection, settings: &Settings) -> Arc<Self> {
        let users = Arc::new(UserStore::new(
            db.clone(),
            settings.password_pepper.clone(),
        ));
        let usergroups = Arc::new(UsergroupStore::new(db.clone()));
        let connections = Arc::new(ConnectionStore::new(db.clone()));
        let queries = Arc::new(QueryStore::new(db.clone()));
        let charts = Arc::new(ChartStore::new(db.clone()));
        let reports = Arc::new(ReportStore::new(db.clone()));
        let contacts = Arc::new(ContactStore::new(db.clone()));
        let publications = Arc::new(PublicationStore::new(db.clone()));
        let blacklist = Arc::new(TokenBlacklistStore::new(db.clone()));
        let tokens = Arc::new(TokenService::new(
            settings.jwt_secret.clone(),
            settings.token_ttl_minutes,
        ));
        let auth = Arc::new(AuthService::new(
            users.clone(),
            usergroups.clone(),
            blacklist.clone(),
            tokens,
        ));

        Arc::new(Self {
            db,
            users,
            usergroups,
            connections,
            queries,
            charts,
            reports,
            contacts,
            publications,
            blacklist,
            auth,
        })
    }
}
