use anyhow::{Context, Result};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use std::collections::HashMap;
use std::str::FromStr;

use crate::domain::RequisitionStatus;
use crate::entities::{items, requisition_items, requisitions, units, users};
use super::user::UserRepository;

const TOP_ITEMS_LIMIT: u64 = 10;

#[derive(Debug, Clone)]
pub struct TechnicianCount {
    pub technician_id: i32,
    pub technician_name: Option<String>,
    pub total: i64,
}

#[derive(Debug, Clone)]
pub struct ItemUsage {
    pub item_id: i32,
    pub description: Option<String>,
    pub total_requested: i64,
}

#[derive(Debug, Clone)]
pub struct GlobalStats {
    pub units: u64,
    pub users: u64,
    pub total_item_quantity: i64,
    pub pending_requisitions: u64,
}

#[derive(Debug, Clone)]
pub struct ReportLine {
    pub item_id: i32,
    pub description: Option<String>,
    pub quantity: i32,
    pub unit_price: f64,
}

#[derive(Debug, Clone)]
pub struct ReportRequisition {
    pub id: i32,
    pub unit_name: Option<String>,
    pub ticket_number: Option<String>,
    pub status: RequisitionStatus,
    pub created_at: String,
    pub lines: Vec<ReportLine>,
}

#[derive(Debug, Clone)]
pub struct TechnicianReport {
    pub technician_id: i32,
    pub technician_name: String,
    pub requisitions: Vec<ReportRequisition>,
    pub total_units: i64,
    pub total_value: f64,
}

pub struct ReportRepository {
    conn: DatabaseConnection,
}

impl ReportRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Requisition count per responsible technician, highest first.
    pub async fn requisitions_by_technician(&self) -> Result<Vec<TechnicianCount>> {
        let rows: Vec<(i32, i64)> = requisitions::Entity::find()
            .select_only()
            .column(requisitions::Column::TechnicianId)
            .column_as(requisitions::Column::Id.count(), "total")
            .group_by(requisitions::Column::TechnicianId)
            .order_by_desc(requisitions::Column::Id.count())
            .into_tuple()
            .all(&self.conn)
            .await
            .context("Failed to count requisitions by technician")?;

        let ids: Vec<i32> = rows.iter().map(|(id, _)| *id).collect();
        let names = UserRepository::new(self.conn.clone())
            .names_by_ids(&ids)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(technician_id, total)| TechnicianCount {
                technician_id,
                technician_name: names.get(&technician_id).cloned(),
                total,
            })
            .collect())
    }

    /// Items with the highest total requested quantity.
    pub async fn top_items(&self) -> Result<Vec<ItemUsage>> {
        let rows: Vec<(i32, i64)> = requisition_items::Entity::find()
            .select_only()
            .column(requisition_items::Column::ItemId)
            .column_as(requisition_items::Column::QuantityRequested.sum(), "total")
            .group_by(requisition_items::Column::ItemId)
            .order_by_desc(requisition_items::Column::QuantityRequested.sum())
            .limit(TOP_ITEMS_LIMIT)
            .into_tuple()
            .all(&self.conn)
            .await
            .context("Failed to aggregate requested items")?;

        let ids: Vec<i32> = rows.iter().map(|(id, _)| *id).collect();
        let descriptions: HashMap<i32, String> = if ids.is_empty() {
            HashMap::new()
        } else {
            items::Entity::find()
                .filter(items::Column::Id.is_in(ids))
                .all(&self.conn)
                .await
                .context("Failed to query item descriptions")?
                .into_iter()
                .map(|i| (i.id, i.description))
                .collect()
        };

        Ok(rows
            .into_iter()
            .map(|(item_id, total_requested)| ItemUsage {
                item_id,
                description: descriptions.get(&item_id).cloned(),
                total_requested,
            })
            .collect())
    }

    pub async fn global_stats(&self) -> Result<GlobalStats> {
        let units = units::Entity::find()
            .count(&self.conn)
            .await
            .context("Failed to count units")?;

        let users = users::Entity::find()
            .count(&self.conn)
            .await
            .context("Failed to count users")?;

        let total_item_quantity: Option<Option<i64>> = items::Entity::find()
            .select_only()
            .column_as(items::Column::Quantity.sum(), "total")
            .into_tuple()
            .one(&self.conn)
            .await
            .context("Failed to sum item quantities")?;

        let pending_requisitions = requisitions::Entity::find()
            .filter(requisitions::Column::Status.eq(RequisitionStatus::Pending.as_str()))
            .count(&self.conn)
            .await
            .context("Failed to count pending requisitions")?;

        Ok(GlobalStats {
            units,
            users,
            total_item_quantity: total_item_quantity.flatten().unwrap_or(0),
            pending_requisitions,
        })
    }

    /// Requisitions of one technician created in `[from, until)`, both bounds
    /// being stored-format timestamps. `None` when the technician is unknown.
    pub async fn technician_detail(
        &self,
        technician_id: i32,
        from: &str,
        until: &str,
    ) -> Result<Option<TechnicianReport>> {
        let Some(technician) = users::Entity::find_by_id(technician_id)
            .one(&self.conn)
            .await
            .context("Failed to query technician")?
        else {
            return Ok(None);
        };

        let headers = requisitions::Entity::find()
            .filter(requisitions::Column::TechnicianId.eq(technician_id))
            .filter(requisitions::Column::CreatedAt.gte(from))
            .filter(requisitions::Column::CreatedAt.lt(until))
            .order_by_asc(requisitions::Column::CreatedAt)
            .find_also_related(units::Entity)
            .all(&self.conn)
            .await
            .context("Failed to query technician requisitions")?;

        let ids: Vec<i32> = headers.iter().map(|(r, _)| r.id).collect();
        let mut lines_by_requisition: HashMap<i32, Vec<ReportLine>> = HashMap::new();

        if !ids.is_empty() {
            let lines = requisition_items::Entity::find()
                .filter(requisition_items::Column::RequisitionId.is_in(ids))
                .order_by_asc(requisition_items::Column::Id)
                .find_also_related(items::Entity)
                .all(&self.conn)
                .await
                .context("Failed to query requisition lines")?;

            for (line, item) in lines {
                lines_by_requisition
                    .entry(line.requisition_id)
                    .or_default()
                    .push(ReportLine {
                        item_id: line.item_id,
                        description: item.as_ref().map(|i| i.description.clone()),
                        quantity: line.quantity_requested,
                        unit_price: item.map_or(0.0, |i| i.unit_price),
                    });
            }
        }

        let mut total_units = 0_i64;
        let mut total_value = 0.0_f64;
        let mut requisitions = Vec::with_capacity(headers.len());

        for (header, unit) in headers {
            let status = RequisitionStatus::from_str(&header.status).with_context(|| {
                format!("Requisition {} has an invalid stored status", header.id)
            })?;
            let lines = lines_by_requisition.remove(&header.id).unwrap_or_default();

            for line in &lines {
                total_units += i64::from(line.quantity);
                total_value += f64::from(line.quantity) * line.unit_price;
            }

            requisitions.push(ReportRequisition {
                id: header.id,
                unit_name: unit.map(|u| u.name),
                ticket_number: header.ticket_number,
                status,
                created_at: header.created_at,
                lines,
            });
        }

        Ok(Some(TechnicianReport {
            technician_id,
            technician_name: technician.full_name,
            requisitions,
            total_units,
            total_value,
        }))
    }
}
