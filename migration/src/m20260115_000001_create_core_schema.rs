use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Users table. Username and email are stored lower-cased, so the
        // unique constraints are effectively case-insensitive.
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Users::Email)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                    .col(ColumnDef::new(Users::Role).string().not_null())
                    .col(
                        ColumnDef::new(Users::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Users::CreatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_users_username")
                    .table(Users::Table)
                    .col(Users::Username)
                    .to_owned(),
            )
            .await?;

        // Usergroups. Personal groups are flagged rather than inferred
        // from the label so renames can never orphan the invariant.
        manager
            .create_table(
                Table::create()
                    .table(Usergroups::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Usergroups::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Usergroups::Label)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Usergroups::PersonalGroup)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        // User <-> usergroup membership edges.
        manager
            .create_table(
                Table::create()
                    .table(UserUsergroups::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UserUsergroups::UserId).integer().not_null())
                    .col(
                        ColumnDef::new(UserUsergroups::UsergroupId)
                            .integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(UserUsergroups::UserId)
                            .col(UserUsergroups::UsergroupId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_usergroups_user_id")
                            .from(UserUsergroups::Table, UserUsergroups::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_usergroups_usergroup_id")
                            .from(UserUsergroups::Table, UserUsergroups::UsergroupId)
                            .to(Usergroups::Table, Usergroups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Database connections.
        manager
            .create_table(
                Table::create()
                    .table(Connections::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Connections::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Connections::Label)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Connections::DbType).string().not_null())
                    .col(ColumnDef::new(Connections::Host).string().not_null())
                    .col(ColumnDef::new(Connections::Port).integer().not_null())
                    .col(ColumnDef::new(Connections::Username).string().not_null())
                    .col(ColumnDef::new(Connections::Password).string().not_null())
                    .col(
                        ColumnDef::new(Connections::DatabaseName)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Connections::CreatorId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_connections_creator_id")
                            .from(Connections::Table, Connections::CreatorId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // Saved SQL queries.
        manager
            .create_table(
                Table::create()
                    .table(SqlQueries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SqlQueries::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SqlQueries::Label)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(SqlQueries::RawSql).text().not_null())
                    .col(ColumnDef::new(SqlQueries::CreatorId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sql_queries_creator_id")
                            .from(SqlQueries::Table, SqlQueries::CreatorId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // Charts reference a query and a connection.
        manager
            .create_table(
                Table::create()
                    .table(Charts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Charts::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Charts::Label)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Charts::ChartType).string().not_null())
                    .col(ColumnDef::new(Charts::Parameters).text().not_null())
                    .col(ColumnDef::new(Charts::QueryId).integer().not_null())
                    .col(ColumnDef::new(Charts::ConnectionId).integer().not_null())
                    .col(ColumnDef::new(Charts::CreatorId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_charts_query_id")
                            .from(Charts::Table, Charts::QueryId)
                            .to(SqlQueries::Table, SqlQueries::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_charts_connection_id")
                            .from(Charts::Table, Charts::ConnectionId)
                            .to(Connections::Table, Connections::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_charts_creator_id")
                            .from(Charts::Table, Charts::CreatorId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // Reports.
        manager
            .create_table(
                Table::create()
                    .table(Reports::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Reports::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Reports::Label)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Reports::Parameters).text().not_null())
                    .col(ColumnDef::new(Reports::CreatedOn).big_integer().not_null())
                    .col(ColumnDef::new(Reports::LastPublished).big_integer().null())
                    .col(ColumnDef::new(Reports::CreatorId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reports_creator_id")
                            .from(Reports::Table, Reports::CreatorId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // The four resource <-> usergroup permission tables share a shape:
        // (resource_id, usergroup_id) composite key, cascading deletes.
        manager
            .create_table(
                Table::create()
                    .table(ConnectionPerms::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ConnectionPerms::ConnectionId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ConnectionPerms::UsergroupId)
                            .integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(ConnectionPerms::ConnectionId)
                            .col(ConnectionPerms::UsergroupId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_connection_perms_connection_id")
                            .from(ConnectionPerms::Table, ConnectionPerms::ConnectionId)
                            .to(Connections::Table, Connections::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_connection_perms_usergroup_id")
                            .from(ConnectionPerms::Table, ConnectionPerms::UsergroupId)
                            .to(Usergroups::Table, Usergroups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(QueryPerms::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(QueryPerms::QueryId).integer().not_null())
                    .col(ColumnDef::new(QueryPerms::UsergroupId).integer().not_null())
                    .primary_key(
                        Index::create()
                            .col(QueryPerms::QueryId)
                            .col(QueryPerms::UsergroupId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_query_perms_query_id")
                            .from(QueryPerms::Table, QueryPerms::QueryId)
                            .to(SqlQueries::Table, SqlQueries::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_query_perms_usergroup_id")
                            .from(QueryPerms::Table, QueryPerms::UsergroupId)
                            .to(Usergroups::Table, Usergroups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ChartPerms::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ChartPerms::ChartId).integer().not_null())
                    .col(ColumnDef::new(ChartPerms::UsergroupId).integer().not_null())
                    .primary_key(
                        Index::create()
                            .col(ChartPerms::ChartId)
                            .col(ChartPerms::UsergroupId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chart_perms_chart_id")
                            .from(ChartPerms::Table, ChartPerms::ChartId)
                            .to(Charts::Table, Charts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chart_perms_usergroup_id")
                            .from(ChartPerms::Table, ChartPerms::UsergroupId)
                            .to(Usergroups::Table, Usergroups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ReportPerms::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ReportPerms::ReportId).integer().not_null())
                    .col(ColumnDef::new(ReportPerms::UsergroupId).integer().not_null())
                    .primary_key(
                        Index::create()
                            .col(ReportPerms::ReportId)
                            .col(ReportPerms::UsergroupId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_report_perms_report_id")
                            .from(ReportPerms::Table, ReportPerms::ReportId)
                            .to(Reports::Table, Reports::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_report_perms_usergroup_id")
                            .from(ReportPerms::Table, ReportPerms::UsergroupId)
                            .to(Usergroups::Table, Usergroups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Contacts are scoped by creator + public flag, not by usergroup.
        manager
            .create_table(
                Table::create()
                    .table(Contacts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Contacts::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Contacts::FirstName).string().not_null())
                    .col(ColumnDef::new(Contacts::LastName).string().not_null())
                    .col(ColumnDef::new(Contacts::Email).string().not_null())
                    .col(
                        ColumnDef::new(Contacts::Public)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Contacts::CreatorId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_contacts_creator_id")
                            .from(Contacts::Table, Contacts::CreatorId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // Publications carry the delivery schedule for a report.
        manager
            .create_table(
                Table::create()
                    .table(Publications::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Publications::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Publications::PubType).string().not_null())
                    .col(ColumnDef::new(Publications::Frequency).string().not_null())
                    .col(
                        ColumnDef::new(Publications::Monday)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Publications::Tuesday)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Publications::Wednesday)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Publications::Thursday)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Publications::Friday)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Publications::Saturday)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Publications::Sunday)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Publications::DayOfMonth).integer().null())
                    .col(ColumnDef::new(Publications::PubTime).string().null())
                    .col(
                        ColumnDef::new(Publications::NotificationOrAttachment)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Publications::ReportId).integer().not_null())
                    .col(
                        ColumnDef::new(Publications::CreatorId)
                            .integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_publications_report_id")
                            .from(Publications::Table, Publications::ReportId)
                            .to(Reports::Table, Reports::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_publications_creator_id")
                            .from(Publications::Table, Publications::CreatorId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PublicationRecipients::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PublicationRecipients::PublicationId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PublicationRecipients::ContactId)
                            .integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(PublicationRecipients::PublicationId)
                            .col(PublicationRecipients::ContactId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_publication_recipients_publication_id")
                            .from(
                                PublicationRecipients::Table,
                                PublicationRecipients::PublicationId,
                            )
                            .to(Publications::Table, Publications::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_publication_recipients_contact_id")
                            .from(
                                PublicationRecipients::Table,
                                PublicationRecipients::ContactId,
                            )
                            .to(Contacts::Table, Contacts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Revoked token ids. Append-only.
        manager
            .create_table(
                Table::create()
                    .table(TokenBlacklist::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TokenBlacklist::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(TokenBlacklist::Jti)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(TokenBlacklist::BlacklistedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_token_blacklist_jti")
                    .table(TokenBlacklist::Table)
                    .col(TokenBlacklist::Jti)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            Table::drop().table(TokenBlacklist::Table).to_owned(),
            Table::drop().table(PublicationRecipients::Table).to_owned(),
            Table::drop().table(Publications::Table).to_owned(),
            Table::drop().table(Contacts::Table).to_owned(),
            Table::drop().table(ReportPerms::Table).to_owned(),
            Table::drop().table(ChartPerms::Table).to_owned(),
            Table::drop().table(QueryPerms::Table).to_owned(),
            Table::drop().table(ConnectionPerms::Table).to_owned(),
            Table::drop().table(Reports::Table).to_owned(),
            Table::drop().table(Charts::Table).to_owned(),
            Table::drop().table(SqlQueries::Table).to_owned(),
            Table::drop().table(Connections::Table).to_owned(),
            Table::drop().table(UserUsergroups::Table).to_owned(),
            Table::drop().table(Usergroups::Table).to_owned(),
            Table::drop().table(Users::Table).to_owned(),
        ] {
            manager.drop_table(table).await?;
        }
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    Email,
    PasswordHash,
    Role,
    IsActive,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Usergroups {
    Table,
    Id,
    Label,
    PersonalGroup,
}

#[derive(DeriveIden)]
enum UserUsergroups {
    Table,
    UserId,
    UsergroupId,
}

#[derive(DeriveIden)]
enum Connections {
    Table,
    Id,
    Label,
    DbType,
    Host,
    Port,
    Username,
    Password,
    DatabaseName,
    CreatorId,
}

#[derive(DeriveIden)]
enum SqlQueries {
    Table,
    Id,
    Label,
    RawSql,
    CreatorId,
}

#[derive(DeriveIden)]
enum Charts {
    Table,
    Id,
    Label,
    ChartType,
    Parameters,
    QueryId,
    ConnectionId,
    CreatorId,
}

#[derive(DeriveIden)]
enum Reports {
    Table,
    Id,
    Label,
    Parameters,
    CreatedOn,
    LastPublished,
    CreatorId,
}

#[derive(DeriveIden)]
enum ConnectionPerms {
    Table,
    ConnectionId,
    UsergroupId,
}

#[derive(DeriveIden)]
enum QueryPerms {
    Table,
    QueryId,
    UsergroupId,
}

#[derive(DeriveIden)]
enum ChartPerms {
    Table,
    ChartId,
    UsergroupId,
}

#[derive(DeriveIden)]
enum ReportPerms {
    Table,
    ReportId,
    UsergroupId,
}

#[derive(DeriveIden)]
enum Contacts {
    Table,
    Id,
    FirstName,
    LastName,
    Email,
    Public,
    CreatorId,
}

#[derive(DeriveIden)]
enum Publications {
    Table,
    Id,
    PubType,
    Frequency,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
    DayOfMonth,
    PubTime,
    NotificationOrAttachment,
    ReportId,
    CreatorId,
}

#[derive(DeriveIden)]
enum PublicationRecipients {
    Table,
    PublicationId,
    ContactId,
}

#[derive(DeriveIden)]
enum TokenBlacklist {
    Table,
    Id,
    Jti,
    BlacklistedAt,
}
