use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "requisitions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// The caller who submitted the requisition.
    pub requester_id: i32,
    /// The technician responsible for using the drawn stock.
    pub technician_id: i32,
    pub unit_id: i32,
    pub equipment_sector: Option<String>,
    pub ticket_number: Option<String>,
    pub asset_tag: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::RequesterId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Requester,
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
    #[sea_orm(has_many = "super::requisition_items::Entity")]
    RequisitionItems,
}

impl Related<super::units::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Units.def()
    }
}

impl Related<super::requisition_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RequisitionItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
