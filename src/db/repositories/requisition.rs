use anyhow::{Context, Result};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use thiserror::Error;

use crate::db::now_timestamp;
use crate::domain::{DeliveryStatus, RequisitionStatus};
use crate::entities::{items, requisition_items, requisitions, units, users};
use super::user::UserRepository;

/// Failure of the stock-consuming create transaction. Nothing is written
/// when any of these is returned.
#[derive(Debug, Error)]
pub enum CreateRequisitionError {
    /// A referenced user, unit or item does not exist.
    #[error("{0}")]
    InvalidReference(String),

    #[error("Insufficient stock for item {item_id}: requested {requested}, available {available}")]
    InsufficientStock {
        item_id: i32,
        requested: i32,
        available: i32,
    },

    #[error("At least one item is required")]
    NoItems,

    #[error("Requested quantity for item {0} is too large")]
    QuantityOverflow(i32),

    #[error(transparent)]
    Database(#[from] DbErr),
}

#[derive(Debug, Clone)]
pub struct NewRequisition {
    pub requester_id: i32,
    pub technician_id: i32,
    pub unit_id: i32,
    pub equipment_sector: Option<String>,
    pub ticket_number: Option<String>,
    pub asset_tag: Option<String>,
    /// `(item_id, quantity)` pairs. Duplicate ids are summed.
    pub lines: Vec<(i32, i32)>,
}

#[derive(Debug, Clone, Default)]
pub struct RequisitionFilter {
    pub unit_id: Option<i32>,
    pub status: Option<RequisitionStatus>,
    pub technician_id: Option<i32>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct RequisitionSummary {
    pub id: i32,
    pub requester_id: i32,
    pub requester_name: Option<String>,
    pub technician_id: i32,
    pub technician_name: Option<String>,
    pub unit_id: i32,
    pub unit_name: Option<String>,
    pub equipment_sector: Option<String>,
    pub ticket_number: Option<String>,
    pub asset_tag: Option<String>,
    pub status: RequisitionStatus,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct RequisitionLine {
    pub id: i32,
    pub requisition_id: i32,
    pub item_id: i32,
    pub item_description: Option<String>,
    pub unit_of_measure: Option<String>,
    pub quantity_requested: i32,
    pub delivery_status: DeliveryStatus,
    pub delivered_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RequisitionDetail {
    pub requisition: RequisitionSummary,
    pub lines: Vec<RequisitionLine>,
}

fn summary_from_model(
    model: requisitions::Model,
    unit: Option<units::Model>,
    names: &HashMap<i32, String>,
) -> Result<RequisitionSummary> {
    let status = RequisitionStatus::from_str(&model.status)
        .with_context(|| format!("Requisition {} has an invalid stored status", model.id))?;

    Ok(RequisitionSummary {
        id: model.id,
        requester_id: model.requester_id,
        requester_name: names.get(&model.requester_id).cloned(),
        technician_id: model.technician_id,
        technician_name: names.get(&model.technician_id).cloned(),
        unit_id: model.unit_id,
        unit_name: unit.map(|u| u.name),
        equipment_sector: model.equipment_sector,
        ticket_number: model.ticket_number,
        asset_tag: model.asset_tag,
        status,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

fn line_from_model(
    model: requisition_items::Model,
    item: Option<items::Model>,
) -> Result<RequisitionLine> {
    let delivery_status = DeliveryStatus::from_str(&model.delivery_status)
        .with_context(|| format!("Requisition line {} has an invalid stored status", model.id))?;

    Ok(RequisitionLine {
        id: model.id,
        requisition_id: model.requisition_id,
        item_id: model.item_id,
        item_description: item.as_ref().map(|i| i.description.clone()),
        unit_of_measure: item.map(|i| i.unit_of_measure),
        quantity_requested: model.quantity_requested,
        delivery_status,
        delivered_at: model.delivered_at,
    })
}

/// Sums quantities per item id. The sorted order also fixes the order in
/// which item rows are touched.
pub fn merge_lines(lines: &[(i32, i32)]) -> Result<BTreeMap<i32, i32>, CreateRequisitionError> {
    let mut merged = BTreeMap::new();
    for &(item_id, quantity) in lines {
        let total: &mut i32 = merged.entry(item_id).or_insert(0);
        *total = total
            .checked_add(quantity)
            .ok_or(CreateRequisitionError::QuantityOverflow(item_id))?;
    }
    Ok(merged)
}

pub struct RequisitionRepository {
    conn: DatabaseConnection,
}

impl RequisitionRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Validates references and stock, decrements every item and records the
    /// requisition with its lines, all in one transaction. Returns the new id.
    pub async fn create(&self, new: NewRequisition) -> Result<i32, CreateRequisitionError> {
        let merged = merge_lines(&new.lines)?;
        if merged.is_empty() {
            return Err(CreateRequisitionError::NoItems);
        }
        let now = now_timestamp();

        let txn = self.conn.begin().await?;

        // The token can outlive its account.
        if users::Entity::find_by_id(new.requester_id)
            .one(&txn)
            .await?
            .is_none()
        {
            return Err(CreateRequisitionError::InvalidReference(format!(
                "Requesting user {} does not exist",
                new.requester_id
            )));
        }

        if units::Entity::find_by_id(new.unit_id).one(&txn).await?.is_none() {
            return Err(CreateRequisitionError::InvalidReference(format!(
                "Unit {} does not exist",
                new.unit_id
            )));
        }

        if users::Entity::find_by_id(new.technician_id)
            .one(&txn)
            .await?
            .is_none()
        {
            return Err(CreateRequisitionError::InvalidReference(format!(
                "Technician {} does not exist",
                new.technician_id
            )));
        }

        // Check everything first so the error names the offending item.
        for (&item_id, &requested) in &merged {
            let item = items::Entity::find_by_id(item_id)
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    CreateRequisitionError::InvalidReference(format!(
                        "Item {item_id} does not exist"
                    ))
                })?;

            if item.quantity < requested {
                return Err(CreateRequisitionError::InsufficientStock {
                    item_id,
                    requested,
                    available: item.quantity,
                });
            }
        }

        // Guarded decrement: a concurrent consumer that got there first
        // leaves zero affected rows.
        for (&item_id, &requested) in &merged {
            let result = items::Entity::update_many()
                .col_expr(
                    items::Column::Quantity,
                    Expr::col(items::Column::Quantity).sub(requested),
                )
                .col_expr(items::Column::UpdatedAt, Expr::value(now.clone()))
                .filter(items::Column::Id.eq(item_id))
                .filter(items::Column::Quantity.gte(requested))
                .exec(&txn)
                .await?;

            if result.rows_affected == 0 {
                let available = items::Entity::find_by_id(item_id)
                    .one(&txn)
                    .await?
                    .map_or(0, |i| i.quantity);
                return Err(CreateRequisitionError::InsufficientStock {
                    item_id,
                    requested,
                    available,
                });
            }
        }

        let header = requisitions::ActiveModel {
            requester_id: Set(new.requester_id),
            technician_id: Set(new.technician_id),
            unit_id: Set(new.unit_id),
            equipment_sector: Set(new.equipment_sector),
            ticket_number: Set(new.ticket_number),
            asset_tag: Set(new.asset_tag),
            status: Set(RequisitionStatus::Pending.as_str().to_string()),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let lines: Vec<requisition_items::ActiveModel> = merged
            .iter()
            .map(|(&item_id, &quantity)| requisition_items::ActiveModel {
                requisition_id: Set(header.id),
                item_id: Set(item_id),
                quantity_requested: Set(quantity),
                delivery_status: Set(DeliveryStatus::Pending.as_str().to_string()),
                delivered_at: Set(None),
                ..Default::default()
            })
            .collect();

        requisition_items::Entity::insert_many(lines)
            .exec(&txn)
            .await?;

        txn.commit().await?;

        Ok(header.id)
    }

    async fn user_names(&self, ids: impl Iterator<Item = i32>) -> Result<HashMap<i32, String>> {
        let mut ids: Vec<i32> = ids.collect();
        ids.sort_unstable();
        ids.dedup();

        UserRepository::new(self.conn.clone())
            .names_by_ids(&ids)
            .await
    }

    /// Newest first.
    pub async fn list(&self, filter: &RequisitionFilter) -> Result<Vec<RequisitionSummary>> {
        let mut query = requisitions::Entity::find();

        if let Some(unit_id) = filter.unit_id {
            query = query.filter(requisitions::Column::UnitId.eq(unit_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(requisitions::Column::Status.eq(status.as_str()));
        }
        if let Some(technician_id) = filter.technician_id {
            query = query.filter(requisitions::Column::TechnicianId.eq(technician_id));
        }

        let mut query = query
            .order_by_desc(requisitions::Column::CreatedAt)
            .order_by_desc(requisitions::Column::Id);

        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }

        let rows = query
            .find_also_related(units::Entity)
            .all(&self.conn)
            .await
            .context("Failed to list requisitions")?;

        let names = self
            .user_names(
                rows.iter()
                    .flat_map(|(r, _)| [r.requester_id, r.technician_id]),
            )
            .await?;

        rows.into_iter()
            .map(|(requisition, unit)| summary_from_model(requisition, unit, &names))
            .collect()
    }

    pub async fn get(&self, id: i32) -> Result<Option<RequisitionDetail>> {
        let Some((requisition, unit)) = requisitions::Entity::find_by_id(id)
            .find_also_related(units::Entity)
            .one(&self.conn)
            .await
            .context("Failed to query requisition")?
        else {
            return Ok(None);
        };

        let names = self
            .user_names([requisition.requester_id, requisition.technician_id].into_iter())
            .await?;

        let lines = requisition_items::Entity::find()
            .filter(requisition_items::Column::RequisitionId.eq(id))
            .order_by_asc(requisition_items::Column::Id)
            .find_also_related(items::Entity)
            .all(&self.conn)
            .await
            .context("Failed to query requisition lines")?
            .into_iter()
            .map(|(line, item)| line_from_model(line, item))
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(RequisitionDetail {
            requisition: summary_from_model(requisition, unit, &names)?,
            lines,
        }))
    }

    pub async fn update_status(&self, id: i32, status: RequisitionStatus) -> Result<bool> {
        let result = requisitions::Entity::update_many()
            .col_expr(requisitions::Column::Status, Expr::value(status.as_str()))
            .col_expr(requisitions::Column::UpdatedAt, Expr::value(now_timestamp()))
            .filter(requisitions::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Sets a line's delivery status. The delivery timestamp is set when
    /// delivered and cleared otherwise.
    pub async fn update_line_status(
        &self,
        line_id: i32,
        status: DeliveryStatus,
    ) -> Result<Option<RequisitionLine>> {
        let Some(line) = requisition_items::Entity::find_by_id(line_id)
            .one(&self.conn)
            .await?
        else {
            return Ok(None);
        };

        let delivered_at = match status {
            DeliveryStatus::Delivered => Some(now_timestamp()),
            DeliveryStatus::Pending => None,
        };

        let mut active: requisition_items::ActiveModel = line.into();
        active.delivery_status = Set(status.as_str().to_string());
        active.delivered_at = Set(delivered_at);
        let model = active.update(&self.conn).await?;

        let item = items::Entity::find_by_id(model.item_id)
            .one(&self.conn)
            .await?;

        line_from_model(model, item).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_lines_sums_duplicates() {
        let merged = merge_lines(&[(7, 1), (5, 3), (7, 1)]).unwrap();
        assert_eq!(merged.into_iter().collect::<Vec<_>>(), vec![(5, 3), (7, 2)]);
    }

    #[test]
    fn test_merge_lines_overflow() {
        let err = merge_lines(&[(1, i32::MAX), (1, 1)]).unwrap_err();
        assert!(matches!(err, CreateRequisitionError::QuantityOverflow(1)));
    }
}
