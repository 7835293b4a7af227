//! The supply inventory aggregate: the singleton row of printer consumable
//! counters and the consumption log that draws from it.

use thiserror::Error;

use crate::db::{ConsumptionRecord, StockLevels};
use crate::domain::{SupplyCounter, SupplyCounts};

#[derive(Debug, Error)]
pub enum SupplyError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Insufficient {counter} stock: requested {requested}, available {available}")]
    Insufficient {
        counter: SupplyCounter,
        requested: i32,
        available: i32,
    },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for SupplyError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for SupplyError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct ConsumptionRequest {
    pub printer_id: i32,
    pub counts: SupplyCounts,
    pub notes: Option<String>,
}

#[async_trait::async_trait]
pub trait SupplyInventory: Send + Sync {
    /// Current stock. The row is created with all counters at zero if missing.
    async fn current(&self) -> Result<StockLevels, SupplyError>;

    /// Adds non-negative amounts to the counters.
    ///
    /// # Errors
    ///
    /// Returns [`SupplyError::Validation`] if any amount is negative.
    async fn restock(&self, delta: SupplyCounts) -> Result<StockLevels, SupplyError>;

    /// Draws supplies for a printer and logs who took them.
    ///
    /// # Errors
    ///
    /// Returns [`SupplyError::Insufficient`] naming the first counter that
    /// cannot cover the request. Stock is unchanged on error.
    async fn consume(
        &self,
        technician_id: i32,
        request: ConsumptionRequest,
    ) -> Result<ConsumptionRecord, SupplyError>;

    /// Consumption log, newest first.
    async fn list_consumptions(
        &self,
        unit_id: Option<i32>,
    ) -> Result<Vec<ConsumptionRecord>, SupplyError>;
}
