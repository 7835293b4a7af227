use anyhow::Result;
use chrono::{NaiveDate, SecondsFormat, Utc};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::domain::{DeliveryStatus, RequisitionStatus, SupplyCounts};

pub mod migrator;
pub mod repositories;

pub use repositories::item::{Item, ItemInput};
pub use repositories::maintenance::{MaintenanceTicket, NewTicket, TicketChange};
pub use repositories::printer::{
    NewServiceRecord, Printer, PrinterFilter, PrinterInput, ServiceRecord,
};
pub use repositories::report::{
    GlobalStats, ItemUsage, ReportLine, ReportRequisition, TechnicianCount, TechnicianReport,
};
pub use repositories::requisition::{
    CreateRequisitionError, NewRequisition, RequisitionDetail, RequisitionFilter,
    RequisitionLine, RequisitionSummary,
};
pub use repositories::supply::{ConsumptionRecord, NewConsumption, StockLevels, SupplyStoreError};
pub use repositories::unit::{Unit, UnitInput};
pub use repositories::user::{NewUser, User, UserChanges, UserFilter};

/// Current time in the stored timestamp format: RFC 3339, UTC, millisecond
/// precision. Fixed width, so text ordering matches time ordering.
#[must_use]
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Midnight UTC of `date` in the stored timestamp format.
#[must_use]
pub fn day_start(date: NaiveDate) -> String {
    date.and_time(chrono::NaiveTime::MIN)
        .and_utc()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let path_str = db_url.trim_start_matches("sqlite:");
        if !path_str.starts_with(":memory:") {
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn unit_repo(&self) -> repositories::unit::UnitRepository {
        repositories::unit::UnitRepository::new(self.conn.clone())
    }

    fn item_repo(&self) -> repositories::item::ItemRepository {
        repositories::item::ItemRepository::new(self.conn.clone())
    }

    fn printer_repo(&self) -> repositories::printer::PrinterRepository {
        repositories::printer::PrinterRepository::new(self.conn.clone())
    }

    fn requisition_repo(&self) -> repositories::requisition::RequisitionRepository {
        repositories::requisition::RequisitionRepository::new(self.conn.clone())
    }

    fn supply_repo(&self) -> repositories::supply::SupplyRepository {
        repositories::supply::SupplyRepository::new(self.conn.clone())
    }

    fn maintenance_repo(&self) -> repositories::maintenance::MaintenanceRepository {
        repositories::maintenance::MaintenanceRepository::new(self.conn.clone())
    }

    fn report_repo(&self) -> repositories::report::ReportRepository {
        repositories::report::ReportRepository::new(self.conn.clone())
    }

    // Users

    pub async fn get_user(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn get_user_with_password(&self, username: &str) -> Result<Option<(User, String)>> {
        self.user_repo()
            .get_by_username_with_password(username)
            .await
    }

    pub async fn get_user_password_hash(&self, id: i32) -> Result<Option<String>> {
        self.user_repo().get_password_hash(id).await
    }

    pub async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>> {
        self.user_repo().list(filter).await
    }

    pub async fn create_user(&self, user: NewUser) -> Result<User> {
        self.user_repo().create(user).await
    }

    pub async fn update_user(&self, id: i32, changes: UserChanges) -> Result<Option<User>> {
        self.user_repo().update(id, changes).await
    }

    pub async fn delete_user(&self, id: i32) -> Result<bool> {
        self.user_repo().delete(id).await
    }

    pub async fn set_user_password_hash(&self, id: i32, password_hash: String) -> Result<bool> {
        self.user_repo().set_password_hash(id, password_hash).await
    }

    // Units

    pub async fn list_units(&self) -> Result<Vec<Unit>> {
        self.unit_repo().list().await
    }

    pub async fn get_unit(&self, id: i32) -> Result<Option<Unit>> {
        self.unit_repo().get(id).await
    }

    pub async fn create_unit(&self, input: UnitInput) -> Result<Unit> {
        self.unit_repo().create(input).await
    }

    pub async fn update_unit(&self, id: i32, input: UnitInput) -> Result<Option<Unit>> {
        self.unit_repo().update(id, input).await
    }

    pub async fn delete_unit(&self, id: i32) -> Result<bool> {
        self.unit_repo().delete(id).await
    }

    // Items

    pub async fn list_items(&self, unit_id: Option<i32>) -> Result<Vec<Item>> {
        self.item_repo().list(unit_id).await
    }

    pub async fn get_item(&self, id: i32) -> Result<Option<Item>> {
        self.item_repo().get(id).await
    }

    pub async fn create_item(&self, input: ItemInput) -> Result<Item> {
        self.item_repo().create(input).await
    }

    pub async fn update_item(&self, id: i32, input: ItemInput) -> Result<Option<Item>> {
        self.item_repo().update(id, input).await
    }

    pub async fn delete_item(&self, id: i32) -> Result<bool> {
        self.item_repo().delete(id).await
    }

    // Printers

    pub async fn list_printers(&self, filter: &PrinterFilter) -> Result<Vec<Printer>> {
        self.printer_repo().list(filter).await
    }

    pub async fn get_printer(&self, id: i32) -> Result<Option<Printer>> {
        self.printer_repo().get(id).await
    }

    pub async fn create_printer(&self, input: PrinterInput) -> Result<Printer> {
        self.printer_repo().create(input).await
    }

    pub async fn update_printer(&self, id: i32, input: PrinterInput) -> Result<Option<Printer>> {
        self.printer_repo().update(id, input).await
    }

    pub async fn deactivate_printer(&self, id: i32) -> Result<bool> {
        self.printer_repo().deactivate(id).await
    }

    pub async fn list_printer_services(
        &self,
        printer_id: Option<i32>,
    ) -> Result<Vec<ServiceRecord>> {
        self.printer_repo().list_services(printer_id).await
    }

    pub async fn create_printer_service(&self, record: NewServiceRecord) -> Result<ServiceRecord> {
        self.printer_repo().create_service(record).await
    }

    // Requisitions

    pub async fn create_requisition(
        &self,
        new: NewRequisition,
    ) -> Result<i32, CreateRequisitionError> {
        self.requisition_repo().create(new).await
    }

    pub async fn list_requisitions(
        &self,
        filter: &RequisitionFilter,
    ) -> Result<Vec<RequisitionSummary>> {
        self.requisition_repo().list(filter).await
    }

    pub async fn get_requisition(&self, id: i32) -> Result<Option<RequisitionDetail>> {
        self.requisition_repo().get(id).await
    }

    pub async fn update_requisition_status(
        &self,
        id: i32,
        status: RequisitionStatus,
    ) -> Result<bool> {
        self.requisition_repo().update_status(id, status).await
    }

    pub async fn update_requisition_line_status(
        &self,
        line_id: i32,
        status: DeliveryStatus,
    ) -> Result<Option<RequisitionLine>> {
        self.requisition_repo()
            .update_line_status(line_id, status)
            .await
    }

    // Supplies

    pub async fn supply_levels(&self) -> Result<StockLevels> {
        self.supply_repo().current().await
    }

    pub async fn restock_supplies(
        &self,
        delta: SupplyCounts,
    ) -> Result<StockLevels, SupplyStoreError> {
        self.supply_repo().restock(delta).await
    }

    pub async fn consume_supplies(
        &self,
        consumption: NewConsumption,
    ) -> Result<ConsumptionRecord, SupplyStoreError> {
        self.supply_repo().consume(consumption).await
    }

    pub async fn list_supply_consumptions(
        &self,
        unit_id: Option<i32>,
    ) -> Result<Vec<ConsumptionRecord>> {
        self.supply_repo().list_consumptions(unit_id).await
    }

    // Maintenance

    pub async fn list_maintenance(&self) -> Result<Vec<MaintenanceTicket>> {
        self.maintenance_repo().list().await
    }

    pub async fn create_maintenance(&self, ticket: NewTicket) -> Result<MaintenanceTicket> {
        self.maintenance_repo().create(ticket).await
    }

    pub async fn transition_maintenance(
        &self,
        id: i32,
        change: TicketChange,
    ) -> Result<Option<MaintenanceTicket>> {
        self.maintenance_repo().transition(id, change).await
    }

    // Reports

    pub async fn requisitions_by_technician(&self) -> Result<Vec<TechnicianCount>> {
        self.report_repo().requisitions_by_technician().await
    }

    pub async fn top_items(&self) -> Result<Vec<ItemUsage>> {
        self.report_repo().top_items().await
    }

    pub async fn global_stats(&self) -> Result<GlobalStats> {
        self.report_repo().global_stats().await
    }

    pub async fn technician_report(
        &self,
        technician_id: i32,
        from: &str,
        until: &str,
    ) -> Result<Option<TechnicianReport>> {
        self.report_repo()
            .technician_detail(technician_id, from, until)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamps_are_fixed_width() {
        let now = now_timestamp();
        assert_eq!(now.len(), "2026-01-01T00:00:00.000Z".len());
        assert!(now.ends_with('Z'));
    }

    #[test]
    fn test_day_start_orders_with_timestamps() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert_eq!(day_start(date), "2026-03-01T00:00:00.000Z");
        assert!("2026-02-28T23:59:59.999Z" < day_start(date).as_str());
        assert!("2026-03-01T08:15:00.000Z" > day_start(date).as_str());
    }
}
