//! Domain service for stock-consuming requisitions.
//!
//! Creation validates the payload, then hands it to the store's single
//! transaction that decrements item stock and records the requisition.

use thiserror::Error;

use crate::db::{RequisitionDetail, RequisitionFilter, RequisitionLine, RequisitionSummary};
use crate::domain::{DeliveryStatus, Identity, RequisitionStatus};

/// How many requisitions the dashboard "latest" view returns.
pub const LATEST_LIMIT: u64 = 5;

/// Errors specific to requisition operations.
#[derive(Debug, Error)]
pub enum RequisitionError {
    #[error("Requisition not found: {0}")]
    NotFound(i32),

    #[error("Requisition line not found: {0}")]
    LineNotFound(i32),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Insufficient stock for item {item_id}: requested {requested}, available {available}")]
    InsufficientStock {
        item_id: i32,
        requested: i32,
        available: i32,
    },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for RequisitionError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for RequisitionError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A requisition as submitted by a caller. The requester is always the caller.
#[derive(Debug, Clone)]
pub struct RequisitionRequest {
    pub technician_id: i32,
    pub unit_id: i32,
    pub equipment_sector: Option<String>,
    pub ticket_number: Option<String>,
    pub asset_tag: Option<String>,
    /// `(item_id, quantity)` pairs.
    pub lines: Vec<(i32, i32)>,
}

/// Domain service trait for requisitions.
#[async_trait::async_trait]
pub trait RequisitionService: Send + Sync {
    /// Creates a requisition and consumes the requested stock atomically.
    ///
    /// # Errors
    ///
    /// Returns [`RequisitionError::InsufficientStock`] naming the first item
    /// that cannot be covered, or [`RequisitionError::Validation`] for bad
    /// quantities and unknown references. Nothing is written on error.
    async fn create(
        &self,
        requester: &Identity,
        request: RequisitionRequest,
    ) -> Result<RequisitionDetail, RequisitionError>;

    /// Lists requisitions, newest first.
    async fn list(
        &self,
        filter: &RequisitionFilter,
    ) -> Result<Vec<RequisitionSummary>, RequisitionError>;

    /// Gets one requisition with its lines.
    async fn get(&self, id: i32) -> Result<RequisitionDetail, RequisitionError>;

    /// The most recent requisitions visible to `identity`: a manager sees
    /// their unit, a technician sees the ones they are responsible for and
    /// an admin sees everything.
    async fn latest(&self, identity: &Identity)
    -> Result<Vec<RequisitionSummary>, RequisitionError>;

    async fn update_status(
        &self,
        id: i32,
        status: RequisitionStatus,
    ) -> Result<RequisitionDetail, RequisitionError>;

    /// Marks one line delivered or pending again.
    async fn update_line_status(
        &self,
        line_id: i32,
        status: DeliveryStatus,
    ) -> Result<RequisitionLine, RequisitionError>;
}
