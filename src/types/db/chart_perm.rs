use sea_orm::entity::prelude::*;

/// ACL edge between a chart and a usergroup.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "chart_perms")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub chart_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub usergroup_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
