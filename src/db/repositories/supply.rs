use anyhow::{Context, Result};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use thiserror::Error;

use crate::db::now_timestamp;
use crate::domain::{SupplyCounter, SupplyCounts};
use crate::entities::{printers, supply_consumptions, supply_inventory, users};
use super::user::UserRepository;

/// Primary key of the singleton inventory row.
pub const INVENTORY_ID: i32 = 1;

#[derive(Debug, Error)]
pub enum SupplyStoreError {
    #[error("Printer {0} does not exist or is inactive")]
    UnknownPrinter(i32),

    #[error("Technician {0} does not exist")]
    UnknownTechnician(i32),

    #[error("Restocking would overflow the {0} counter")]
    Overflow(SupplyCounter),

    #[error("Insufficient {counter} stock: requested {requested}, available {available}")]
    Insufficient {
        counter: SupplyCounter,
        requested: i32,
        available: i32,
    },

    #[error(transparent)]
    Database(#[from] DbErr),
}

#[derive(Debug, Clone)]
pub struct StockLevels {
    pub counts: SupplyCounts,
    pub updated_at: String,
}

impl From<supply_inventory::Model> for StockLevels {
    fn from(model: supply_inventory::Model) -> Self {
        Self {
            counts: SupplyCounts {
                imaging_units: model.imaging_units,
                black_toner: model.black_toner,
                cyan_toner: model.cyan_toner,
                magenta_toner: model.magenta_toner,
                yellow_toner: model.yellow_toner,
            },
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewConsumption {
    pub printer_id: i32,
    pub technician_id: i32,
    pub counts: SupplyCounts,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ConsumptionRecord {
    pub id: i32,
    pub printer_id: i32,
    pub printer_name: Option<String>,
    pub technician_id: i32,
    pub technician_name: Option<String>,
    pub unit_id: Option<i32>,
    pub counts: SupplyCounts,
    pub notes: Option<String>,
    pub created_at: String,
}

const fn column(counter: SupplyCounter) -> supply_inventory::Column {
    match counter {
        SupplyCounter::ImagingUnits => supply_inventory::Column::ImagingUnits,
        SupplyCounter::BlackToner => supply_inventory::Column::BlackToner,
        SupplyCounter::CyanToner => supply_inventory::Column::CyanToner,
        SupplyCounter::MagentaToner => supply_inventory::Column::MagentaToner,
        SupplyCounter::YellowToner => supply_inventory::Column::YellowToner,
    }
}

/// Inserts the all-zero singleton if it is missing, then reads it.
async fn ensure_inventory<C>(conn: &C) -> Result<supply_inventory::Model, DbErr>
where
    C: ConnectionTrait,
{
    let row = supply_inventory::ActiveModel {
        id: Set(INVENTORY_ID),
        imaging_units: Set(0),
        black_toner: Set(0),
        cyan_toner: Set(0),
        magenta_toner: Set(0),
        yellow_toner: Set(0),
        updated_at: Set(now_timestamp()),
    };

    supply_inventory::Entity::insert(row)
        .on_conflict(
            OnConflict::column(supply_inventory::Column::Id)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    supply_inventory::Entity::find_by_id(INVENTORY_ID)
        .one(conn)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound("supply inventory".to_string()))
}

pub struct SupplyRepository {
    conn: DatabaseConnection,
}

impl SupplyRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn current(&self) -> Result<StockLevels> {
        let model = ensure_inventory(&self.conn)
            .await
            .context("Failed to read supply inventory")?;
        Ok(model.into())
    }

    /// Adds `delta` to each counter. Callers reject negative amounts.
    pub async fn restock(&self, delta: SupplyCounts) -> Result<StockLevels, SupplyStoreError> {
        let txn = self.conn.begin().await?;
        let stock = StockLevels::from(ensure_inventory(&txn).await?);

        if let Some((counter, _)) = delta
            .iter()
            .find(|&(counter, amount)| stock.counts.get(counter).checked_add(amount).is_none())
        {
            return Err(SupplyStoreError::Overflow(counter));
        }

        let mut update = supply_inventory::Entity::update_many()
            .col_expr(
                supply_inventory::Column::UpdatedAt,
                Expr::value(now_timestamp()),
            )
            .filter(supply_inventory::Column::Id.eq(INVENTORY_ID));

        for (counter, amount) in delta.iter() {
            update = update.col_expr(column(counter), Expr::col(column(counter)).add(amount));
        }

        update.exec(&txn).await?;

        let model = ensure_inventory(&txn).await?;
        txn.commit().await?;

        Ok(model.into())
    }

    /// Decrements the counters and appends a consumption record in one
    /// transaction. No counter is ever driven below zero.
    pub async fn consume(
        &self,
        consumption: NewConsumption,
    ) -> Result<ConsumptionRecord, SupplyStoreError> {
        let txn = self.conn.begin().await?;

        let printer = printers::Entity::find_by_id(consumption.printer_id)
            .filter(printers::Column::Active.eq(true))
            .one(&txn)
            .await?
            .ok_or(SupplyStoreError::UnknownPrinter(consumption.printer_id))?;

        if users::Entity::find_by_id(consumption.technician_id)
            .one(&txn)
            .await?
            .is_none()
        {
            return Err(SupplyStoreError::UnknownTechnician(consumption.technician_id));
        }

        let stock = StockLevels::from(ensure_inventory(&txn).await?);
        if let Some((counter, requested, available)) =
            stock.counts.first_shortfall(&consumption.counts)
        {
            return Err(SupplyStoreError::Insufficient {
                counter,
                requested,
                available,
            });
        }

        let mut update = supply_inventory::Entity::update_many()
            .col_expr(
                supply_inventory::Column::UpdatedAt,
                Expr::value(now_timestamp()),
            )
            .filter(supply_inventory::Column::Id.eq(INVENTORY_ID));

        for (counter, amount) in consumption.counts.iter().filter(|(_, n)| *n > 0) {
            update = update
                .col_expr(column(counter), Expr::col(column(counter)).sub(amount))
                .filter(column(counter).gte(amount));
        }

        let result = update.exec(&txn).await?;
        if result.rows_affected == 0 {
            let latest = StockLevels::from(ensure_inventory(&txn).await?);
            let (counter, requested, available) = latest
                .counts
                .first_shortfall(&consumption.counts)
                .unwrap_or((SupplyCounter::ImagingUnits, 0, 0));
            return Err(SupplyStoreError::Insufficient {
                counter,
                requested,
                available,
            });
        }

        let counts = consumption.counts;
        let record = supply_consumptions::ActiveModel {
            printer_id: Set(printer.id),
            technician_id: Set(consumption.technician_id),
            unit_id: Set(printer.unit_id),
            imaging_units: Set(counts.imaging_units),
            black_toner: Set(counts.black_toner),
            cyan_toner: Set(counts.cyan_toner),
            magenta_toner: Set(counts.magenta_toner),
            yellow_toner: Set(counts.yellow_toner),
            notes: Set(consumption.notes),
            created_at: Set(now_timestamp()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        Ok(ConsumptionRecord {
            id: record.id,
            printer_id: record.printer_id,
            printer_name: Some(printer.name),
            technician_id: record.technician_id,
            technician_name: None,
            unit_id: record.unit_id,
            counts,
            notes: record.notes,
            created_at: record.created_at,
        })
    }

    /// Newest first, optionally restricted to one unit.
    pub async fn list_consumptions(&self, unit_id: Option<i32>) -> Result<Vec<ConsumptionRecord>> {
        let mut query = supply_consumptions::Entity::find();

        if let Some(unit_id) = unit_id {
            query = query.filter(supply_consumptions::Column::UnitId.eq(unit_id));
        }

        let rows = query
            .order_by_desc(supply_consumptions::Column::CreatedAt)
            .order_by_desc(supply_consumptions::Column::Id)
            .find_also_related(printers::Entity)
            .all(&self.conn)
            .await
            .context("Failed to list supply consumptions")?;

        let mut technician_ids: Vec<i32> = rows.iter().map(|(r, _)| r.technician_id).collect();
        technician_ids.sort_unstable();
        technician_ids.dedup();

        let technicians = UserRepository::new(self.conn.clone())
            .names_by_ids(&technician_ids)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(record, printer)| ConsumptionRecord {
                id: record.id,
                printer_id: record.printer_id,
                printer_name: printer.map(|p| p.name),
                technician_id: record.technician_id,
                technician_name: technicians.get(&record.technician_id).cloned(),
                unit_id: record.unit_id,
                counts: SupplyCounts {
                    imaging_units: record.imaging_units,
                    black_toner: record.black_toner,
                    cyan_toner: record.cyan_toner,
                    magenta_toner: record.magenta_toner,
                    yellow_toner: record.yellow_toner,
                },
                notes: record.notes,
                created_at: record.created_at,
            })
            .collect())
    }
}
