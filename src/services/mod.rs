pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, Claims, LoginResult};
pub use auth_service_impl::{SeaOrmAuthService, TokenSigner};

pub mod requisition_service;
pub mod requisition_service_impl;
pub use requisition_service::{RequisitionError, RequisitionRequest, RequisitionService};
pub use requisition_service_impl::SeaOrmRequisitionService;

pub mod supply_service;
pub mod supply_service_impl;
pub use supply_service::{ConsumptionRequest, SupplyError, SupplyInventory};
pub use supply_service_impl::SeaOrmSupplyInventory;
