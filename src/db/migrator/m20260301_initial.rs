use crate::entities::prelude::*;
use crate::entities::{
    items, maintenance_tickets, printer_services, printers, requisition_items, requisitions,
    supply_consumptions, users,
};
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{EntityTrait, Schema};

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Create a table from its entity definition, foreign keys included.
async fn create_entity_table<E>(
    manager: &SchemaManager<'_>,
    schema: &Schema,
    entity: E,
) -> Result<(), DbErr>
where
    E: EntityTrait,
{
    manager
        .create_table(
            schema
                .create_table_from_entity(entity)
                .if_not_exists()
                .to_owned(),
        )
        .await
}

async fn create_index<T, C>(
    manager: &SchemaManager<'_>,
    name: &str,
    table: T,
    col: C,
) -> Result<(), DbErr>
where
    T: IntoIden + 'static,
    C: IntoIden,
{
    manager
        .create_index(
            Index::create()
                .if_not_exists()
                .name(name)
                .table(table)
                .col(col)
                .to_owned(),
        )
        .await
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        // Referenced tables first.
        create_entity_table(manager, &schema, Units).await?;
        create_entity_table(manager, &schema, Users).await?;
        create_entity_table(manager, &schema, Printers).await?;
        create_entity_table(manager, &schema, Items).await?;
        create_entity_table(manager, &schema, Requisitions).await?;
        create_entity_table(manager, &schema, RequisitionItems).await?;
        create_entity_table(manager, &schema, SupplyInventory).await?;
        create_entity_table(manager, &schema, SupplyConsumptions).await?;
        create_entity_table(manager, &schema, PrinterServices).await?;
        create_entity_table(manager, &schema, MaintenanceTickets).await?;

        create_index(manager, "idx_users_unit_id", Users, users::Column::UnitId).await?;
        create_index(manager, "idx_users_role", Users, users::Column::Role).await?;
        create_index(manager, "idx_printers_unit_id", Printers, printers::Column::UnitId).await?;
        create_index(manager, "idx_items_unit_id", Items, items::Column::UnitId).await?;
        create_index(
            manager,
            "idx_requisitions_unit_id",
            Requisitions,
            requisitions::Column::UnitId,
        )
        .await?;
        create_index(
            manager,
            "idx_requisitions_technician_id",
            Requisitions,
            requisitions::Column::TechnicianId,
        )
        .await?;
        create_index(
            manager,
            "idx_requisitions_status",
            Requisitions,
            requisitions::Column::Status,
        )
        .await?;
        create_index(
            manager,
            "idx_requisition_items_requisition_id",
            RequisitionItems,
            requisition_items::Column::RequisitionId,
        )
        .await?;
        create_index(
            manager,
            "idx_requisition_items_item_id",
            RequisitionItems,
            requisition_items::Column::ItemId,
        )
        .await?;
        create_index(
            manager,
            "idx_supply_consumptions_printer_id",
            SupplyConsumptions,
            supply_consumptions::Column::PrinterId,
        )
        .await?;
        create_index(
            manager,
            "idx_printer_services_printer_id",
            PrinterServices,
            printer_services::Column::PrinterId,
        )
        .await?;
        create_index(
            manager,
            "idx_maintenance_tickets_technician_id",
            MaintenanceTickets,
            maintenance_tickets::Column::TechnicianId,
        )
        .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MaintenanceTickets).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PrinterServices).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SupplyConsumptions).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SupplyInventory).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RequisitionItems).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Requisitions).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Items).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Printers).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Units).to_owned())
            .await?;

        Ok(())
    }
}
