use serde::{Deserialize, Serialize};

use super::string_enum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequisitionStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

string_enum!(RequisitionStatus, "requisition status", {
    Pending => "pending",
    InProgress => "in_progress",
    Completed => "completed",
    Cancelled => "cancelled",
});

/// Delivery state of a single requisition line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    #[default]
    Pending,
    Delivered,
}

string_enum!(DeliveryStatus, "delivery status", {
    Pending => "pending",
    Delivered => "delivered",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceStatus {
    #[default]
    Pending,
    InProgress,
    Done,
}

string_enum!(MaintenanceStatus, "maintenance status", {
    Pending => "pending",
    InProgress => "in_progress",
    Done => "done",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn unknown_status_is_rejected() {
        let err = MaintenanceStatus::from_str("Concluido").unwrap_err();
        assert_eq!(err.kind, "maintenance status");
        assert_eq!(err.to_string(), "unknown maintenance status: 'Concluido'");
    }

    #[test]
    fn serde_matches_as_str() {
        for status in RequisitionStatus::ALL {
            let json = serde_json::to_string(status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }
}
