use sea_orm::entity::prelude::*;

/// ACL edge between a saved query and a usergroup.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "query_perms")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub query_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub usergroup_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
