pub mod prelude;

pub mod items;
pub mod maintenance_tickets;
pub mod printer_services;
pub mod printers;
pub mod requisition_items;
pub mod requisitions;
pub mod supply_consumptions;
pub mod supply_inventory;
pub mod units;
pub mod users;
