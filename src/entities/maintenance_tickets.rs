use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "maintenance_tickets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub ticket_number: Option<String>,
    pub equipment: String,
    pub problem_description: String,
    pub technician_id: i32,
    pub status: String,
    /// Technical report, required to close the ticket.
    pub report: Option<String>,
    pub received_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::TechnicianId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Technician,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Technician.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
