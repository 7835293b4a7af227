use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub catalog_code: Option<String>,
    pub procurement_ref: Option<String>,
    pub description: String,
    pub kind: Option<String>,
    pub unit_of_measure: String,
    pub storage_location: Option<String>,
    /// Quantity on hand. Only ever decremented through a guarded update.
    pub quantity: i32,
    pub unit_price: f64,
    pub unit_id: i32,
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
