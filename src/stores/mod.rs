// Stores layer - Data access and repository pattern
pub mod chart_store;
pub mod connection_store;
pub mod contact_store;
pub mod publication_store;
pub mod query_store;
pub mod report_store;
pub mod token_blacklist_store;
pub mod user_store;
pub mod usergroup_store;

pub use chart_store::ChartStore;
pub use connection_store::ConnectionStore;
pub use contact_store::ContactStore;
pub use publication_store::PublicationStore;
pub use query_store::QueryStore;
pub use report_store::ReportStore;
pub use token_blacklist_store::TokenBlacklistStore;
pub use user_store::UserStore;
pub use usergroup_store::UsergroupStore;
