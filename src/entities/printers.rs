use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "printers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub serial_number: String,
    pub ip: String,
    pub model: Option<String>,
    pub location: Option<String>,
    pub unit_id: Option<i32>,
    pub policies_applied: bool,
    /// Cleared instead of deleting the row so service history stays linked.
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::units::Entity",
        from = "Column::UnitId",
        to = "super::units::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Units,
    #[sea_orm(has_many = "super::supply_consumptions::Entity")]
    SupplyConsumptions,
    #[sea_orm(has_many = "super::printer_services::Entity")]
    PrinterServices,
}

impl Related<super::units::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Units.def()
    }
}

impl Related<super::supply_consumptions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SupplyConsumptions.def()
    }
}

impl Related<super::printer_services::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PrinterServices.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
