use sea_orm::entity::prelude::*;

/// Singleton row holding the printer consumable counters.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "supply_inventory")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    pub imaging_units: i32,
    pub black_toner: i32,
    pub cyan_toner: i32,
    pub magenta_toner: i32,
    pub yellow_toner: i32,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
