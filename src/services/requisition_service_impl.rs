//! `SeaORM` implementation of the `RequisitionService` trait.

use async_trait::async_trait;
use tracing::info;

use crate::db::{
    CreateRequisitionError, NewRequisition, RequisitionDetail, RequisitionFilter,
    RequisitionLine, RequisitionSummary, Store,
};
use crate::domain::{DeliveryStatus, Identity, RequisitionStatus, Role};
use crate::services::requisition_service::{
    LATEST_LIMIT, RequisitionError, RequisitionRequest, RequisitionService,
};

impl From<CreateRequisitionError> for RequisitionError {
    fn from(err: CreateRequisitionError) -> Self {
        match err {
            CreateRequisitionError::InvalidReference(msg) => Self::Validation(msg),
            CreateRequisitionError::InsufficientStock {
                item_id,
                requested,
                available,
            } => Self::InsufficientStock {
                item_id,
                requested,
                available,
            },
            e @ (CreateRequisitionError::NoItems | CreateRequisitionError::QuantityOverflow(_)) => {
                Self::Validation(e.to_string())
            }
            CreateRequisitionError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

/// Filter for the "latest" view, or `None` when the caller can see nothing.
#[must_use]
pub fn latest_scope(identity: &Identity) -> Option<RequisitionFilter> {
    let mut filter = RequisitionFilter {
        limit: Some(LATEST_LIMIT),
        ..Default::default()
    };

    match identity.role {
        Role::Admin => {}
        Role::Manager => filter.unit_id = Some(identity.unit_id?),
        Role::Technician | Role::PrinterTechnician | Role::ElectronicsTechnician => {
            filter.technician_id = Some(identity.user_id);
        }
    }

    Some(filter)
}

fn validate_request(request: &RequisitionRequest) -> Result<(), RequisitionError> {
    if request.lines.is_empty() {
        return Err(RequisitionError::Validation(
            "At least one item is required".to_string(),
        ));
    }

    if let Some((item_id, quantity)) = request.lines.iter().find(|(_, q)| *q <= 0) {
        return Err(RequisitionError::Validation(format!(
            "Quantity for item {item_id} must be positive, got {quantity}"
        )));
    }

    Ok(())
}

pub struct SeaOrmRequisitionService {
    store: Store,
}

impl SeaOrmRequisitionService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RequisitionService for SeaOrmRequisitionService {
    async fn create(
        &self,
        requester: &Identity,
        request: RequisitionRequest,
    ) -> Result<RequisitionDetail, RequisitionError> {
        validate_request(&request)?;

        let line_count = request.lines.len();
        let id = self
            .store
            .create_requisition(NewRequisition {
                requester_id: requester.user_id,
                technician_id: request.technician_id,
                unit_id: request.unit_id,
                equipment_sector: request.equipment_sector,
                ticket_number: request.ticket_number,
                asset_tag: request.asset_tag,
                lines: request.lines,
            })
            .await?;

        info!(
            requisition_id = id,
            requester_id = requester.user_id,
            lines = line_count,
            "Requisition created"
        );

        self.get(id).await
    }

    async fn list(
        &self,
        filter: &RequisitionFilter,
    ) -> Result<Vec<RequisitionSummary>, RequisitionError> {
        Ok(self.store.list_requisitions(filter).await?)
    }

    async fn get(&self, id: i32) -> Result<RequisitionDetail, RequisitionError> {
        self.store
            .get_requisition(id)
            .await?
            .ok_or(RequisitionError::NotFound(id))
    }

    async fn latest(
        &self,
        identity: &Identity,
    ) -> Result<Vec<RequisitionSummary>, RequisitionError> {
        let Some(filter) = latest_scope(identity) else {
            return Ok(Vec::new());
        };

        Ok(self.store.list_requisitions(&filter).await?)
    }

    async fn update_status(
        &self,
        id: i32,
        status: RequisitionStatus,
    ) -> Result<RequisitionDetail, RequisitionError> {
        if !self.store.update_requisition_status(id, status).await? {
            return Err(RequisitionError::NotFound(id));
        }

        self.get(id).await
    }

    async fn update_line_status(
        &self,
        line_id: i32,
        status: DeliveryStatus,
    ) -> Result<RequisitionLine, RequisitionError> {
        self.store
            .update_requisition_line_status(line_id, status)
            .await?
            .ok_or(RequisitionError::LineNotFound(line_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(role: Role, unit_id: Option<i32>) -> Identity {
        Identity {
            user_id: 9,
            role,
            unit_id,
        }
    }

    fn request(lines: Vec<(i32, i32)>) -> RequisitionRequest {
        RequisitionRequest {
            technician_id: 1,
            unit_id: 1,
            equipment_sector: None,
            ticket_number: None,
            asset_tag: None,
            lines,
        }
    }

    #[test]
    fn test_latest_scope_by_role() {
        let admin = latest_scope(&identity(Role::Admin, None)).unwrap();
        assert_eq!(admin.unit_id, None);
        assert_eq!(admin.technician_id, None);
        assert_eq!(admin.limit, Some(LATEST_LIMIT));

        let manager = latest_scope(&identity(Role::Manager, Some(4))).unwrap();
        assert_eq!(manager.unit_id, Some(4));
        assert_eq!(manager.technician_id, None);

        let tech = latest_scope(&identity(Role::PrinterTechnician, Some(4))).unwrap();
        assert_eq!(tech.technician_id, Some(9));
        assert_eq!(tech.unit_id, None);
    }

    #[test]
    fn test_latest_scope_manager_without_unit_sees_nothing() {
        assert!(latest_scope(&identity(Role::Manager, None)).is_none());
    }

    #[test]
    fn test_validate_request() {
        assert!(validate_request(&request(vec![(5, 3), (7, 2)])).is_ok());
        assert!(matches!(
            validate_request(&request(vec![])),
            Err(RequisitionError::Validation(_))
        ));
        assert!(matches!(
            validate_request(&request(vec![(5, 3), (7, 0)])),
            Err(RequisitionError::Validation(_))
        ));
        assert!(validate_request(&request(vec![(5, -1)])).is_err());
    }

    #[test]
    fn test_store_errors_map_to_service_errors() {
        let err: RequisitionError = CreateRequisitionError::InsufficientStock {
            item_id: 7,
            requested: 3,
            available: 2,
        }
        .into();
        assert!(matches!(
            err,
            RequisitionError::InsufficientStock {
                item_id: 7,
                requested: 3,
                available: 2
            }
        ));

        let err: RequisitionError =
            CreateRequisitionError::InvalidReference("Unit 3 does not exist".to_string()).into();
        assert!(matches!(err, RequisitionError::Validation(_)));
    }
}
