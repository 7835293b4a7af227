//! Roles and the capability table that gates the API.

use serde::{Deserialize, Serialize};

use super::string_enum;

/// A user's role. Closed set; every permission check goes through
/// [`Role::can`] instead of comparing strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    Technician,
    PrinterTechnician,
    ElectronicsTechnician,
}

string_enum!(Role, "role", {
    Admin => "admin",
    Manager => "manager",
    Technician => "technician",
    PrinterTechnician => "printer_technician",
    ElectronicsTechnician => "electronics_technician",
});

/// Something a caller may be allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    ManageUnits,
    ManageUsers,
    ManageItems,
    ManagePrinters,
    RestockSupplies,
    ViewGlobalStats,
    ViewTechnicianReports,
    /// See records of every unit rather than only the caller's own.
    ViewAllUnits,
    CreateRequisition,
    FulfilRequisitions,
    ServiceMaintenance,
}

impl Role {
    /// All technician variants, used by the `role_type=technician` user filter.
    pub const TECHNICIANS: [Self; 3] = [
        Self::Technician,
        Self::PrinterTechnician,
        Self::ElectronicsTechnician,
    ];

    #[must_use]
    pub const fn is_technician(self) -> bool {
        matches!(
            self,
            Self::Technician | Self::PrinterTechnician | Self::ElectronicsTechnician
        )
    }

    /// The capability table.
    #[must_use]
    pub const fn can(self, capability: Capability) -> bool {
        use Capability::{
            CreateRequisition, FulfilRequisitions, ManageItems, ManagePrinters,
            ServiceMaintenance, ViewTechnicianReports,
        };

        match self {
            Self::Admin => true,
            Self::Manager => matches!(
                capability,
                ManageItems | ManagePrinters | ViewTechnicianReports
            ),
            Self::Technician | Self::PrinterTechnician => {
                matches!(capability, CreateRequisition | FulfilRequisitions)
            }
            Self::ElectronicsTechnician => matches!(
                capability,
                CreateRequisition | FulfilRequisitions | ServiceMaintenance
            ),
        }
    }
}

/// The authenticated caller, as carried by a verified access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i32,
    pub role: Role,
    pub unit_id: Option<i32>,
}

impl Identity {
    #[must_use]
    pub const fn can(&self, capability: Capability) -> bool {
        self.role.can(capability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn admin_has_every_capability() {
        for cap in [
            Capability::ManageUnits,
            Capability::ManageUsers,
            Capability::RestockSupplies,
            Capability::ViewGlobalStats,
            Capability::ViewAllUnits,
            Capability::ServiceMaintenance,
        ] {
            assert!(Role::Admin.can(cap), "{cap:?}");
        }
    }

    #[test]
    fn manager_cannot_draw_stock_or_administer() {
        assert!(Role::Manager.can(Capability::ManageItems));
        assert!(Role::Manager.can(Capability::ViewTechnicianReports));
        assert!(!Role::Manager.can(Capability::CreateRequisition));
        assert!(!Role::Manager.can(Capability::FulfilRequisitions));
        assert!(!Role::Manager.can(Capability::ManageUsers));
        assert!(!Role::Manager.can(Capability::RestockSupplies));
    }

    #[test]
    fn only_electronics_technicians_service_maintenance() {
        assert!(Role::ElectronicsTechnician.can(Capability::ServiceMaintenance));
        assert!(!Role::Technician.can(Capability::ServiceMaintenance));
        assert!(!Role::PrinterTechnician.can(Capability::ServiceMaintenance));
    }

    #[test]
    fn role_string_round_trip() {
        for role in Role::ALL {
            assert_eq!(Role::from_str(role.as_str()), Ok(*role));
        }
        assert!(Role::from_str("gerente").is_err());
    }

    #[test]
    fn role_serializes_as_snake_case() {
        let json = serde_json::to_string(&Role::PrinterTechnician).unwrap();
        assert_eq!(json, "\"printer_technician\"");
    }
}
