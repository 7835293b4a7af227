pub use super::items::Entity as Items;
pub use super::maintenance_tickets::Entity as MaintenanceTickets;
pub use super::printer_services::Entity as PrinterServices;
pub use super::printers::Entity as Printers;
pub use super::requisition_items::Entity as RequisitionItems;
pub use super::requisitions::Entity as Requisitions;
pub use super::supply_consumptions::Entity as SupplyConsumptions;
pub use super::supply_inventory::Entity as SupplyInventory;
pub use super::units::Entity as Units;
pub use super::users::Entity as Users;
