//! `SeaORM` implementation of the `SupplyInventory` trait.

use async_trait::async_trait;
use tracing::info;

use crate::db::{ConsumptionRecord, NewConsumption, StockLevels, Store, SupplyStoreError};
use crate::domain::SupplyCounts;
use crate::services::supply_service::{ConsumptionRequest, SupplyError, SupplyInventory};

impl From<SupplyStoreError> for SupplyError {
    fn from(err: SupplyStoreError) -> Self {
        match err {
            e @ (SupplyStoreError::UnknownPrinter(_)
            | SupplyStoreError::UnknownTechnician(_)
            | SupplyStoreError::Overflow(_)) => Self::Validation(e.to_string()),
            SupplyStoreError::Insufficient {
                counter,
                requested,
                available,
            } => Self::Insufficient {
                counter,
                requested,
                available,
            },
            SupplyStoreError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

fn reject_negative(counts: &SupplyCounts) -> Result<(), SupplyError> {
    match counts.first_negative() {
        Some(counter) => Err(SupplyError::Validation(format!(
            "{counter} must not be negative"
        ))),
        None => Ok(()),
    }
}

pub struct SeaOrmSupplyInventory {
    store: Store,
}

impl SeaOrmSupplyInventory {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SupplyInventory for SeaOrmSupplyInventory {
    async fn current(&self) -> Result<StockLevels, SupplyError> {
        Ok(self.store.supply_levels().await?)
    }

    async fn restock(&self, delta: SupplyCounts) -> Result<StockLevels, SupplyError> {
        reject_negative(&delta)?;

        let levels = self.store.restock_supplies(delta).await?;
        info!(?delta, "Supply inventory restocked");
        Ok(levels)
    }

    async fn consume(
        &self,
        technician_id: i32,
        request: ConsumptionRequest,
    ) -> Result<ConsumptionRecord, SupplyError> {
        reject_negative(&request.counts)?;
        if request.counts.is_zero() {
            return Err(SupplyError::Validation(
                "At least one supply amount is required".to_string(),
            ));
        }

        let record = self
            .store
            .consume_supplies(NewConsumption {
                printer_id: request.printer_id,
                technician_id,
                counts: request.counts,
                notes: request.notes,
            })
            .await?;

        info!(
            consumption_id = record.id,
            printer_id = record.printer_id,
            technician_id,
            "Supplies consumed"
        );

        Ok(record)
    }

    async fn list_consumptions(
        &self,
        unit_id: Option<i32>,
    ) -> Result<Vec<ConsumptionRecord>, SupplyError> {
        Ok(self.store.list_supply_consumptions(unit_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SupplyCounter;

    #[test]
    fn test_negative_amounts_are_rejected() {
        let delta = SupplyCounts {
            cyan_toner: -1,
            ..Default::default()
        };
        let err = reject_negative(&delta).unwrap_err();
        assert!(err.to_string().contains("cyan_toner"));
        assert!(reject_negative(&SupplyCounts::default()).is_ok());
    }

    #[test]
    fn test_store_reference_and_overflow_errors_are_validation() {
        let err: SupplyError = SupplyStoreError::Overflow(SupplyCounter::MagentaToner).into();
        assert!(matches!(&err, SupplyError::Validation(msg) if msg.contains("magenta_toner")));

        let err: SupplyError = SupplyStoreError::UnknownTechnician(12).into();
        assert!(matches!(err, SupplyError::Validation(_)));
    }

    #[test]
    fn test_store_shortfall_keeps_counter() {
        let err: SupplyError = SupplyStoreError::Insufficient {
            counter: SupplyCounter::BlackToner,
            requested: 4,
            available: 1,
        }
        .into();
        assert!(matches!(
            err,
            SupplyError::Insufficient {
                counter: SupplyCounter::BlackToner,
                requested: 4,
                available: 1
            }
        ));
    }
}
