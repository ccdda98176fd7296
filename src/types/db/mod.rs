// Database entities - one module per table
pub mod chart;
pub mod chart_perm;
pub mod connection;
pub mod connection_perm;
pub mod contact;
pub mod publication;
pub mod publication_recipient;
pub mod query_perm;
pub mod report;
pub mod report_perm;
pub mod sql_query;
pub mod token_blacklist;
pub mod user;
pub mod user_usergroup;
pub mod usergroup;
