pub mod item;
pub mod maintenance;
pub mod printer;
pub mod report;
pub mod requisition;
pub mod supply;
pub mod unit;
pub mod user;
