use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "supply_consumptions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub printer_id: i32,
    pub technician_id: i32,
    pub unit_id: Option<i32>,
    pub imaging_units: i32,
    pub black_toner: i32,
    pub cyan_toner: i32,
    pub magenta_toner: i32,
    pub yellow_toner: i32,
    pub notes: Option<String>,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::printers::Entity",
        from = "Column::PrinterId",
        to = "super::printers::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Printers,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::TechnicianId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Technician,
    #[sea_orm(
        belongs_to = "super::units::Entity",
        from = "Column::UnitId",
        to = "super::units::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Units,
}

impl Related<super::printers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Printers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
