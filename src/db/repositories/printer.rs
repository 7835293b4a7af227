use anyhow::{Context, Result};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::db::now_timestamp;
use crate::entities::{printer_services, printers, units};

#[derive(Debug, Clone)]
pub struct Printer {
    pub id: i32,
    pub name: String,
    pub serial_number: String,
    pub ip: String,
    pub model: Option<String>,
    pub location: Option<String>,
    pub unit_id: Option<i32>,
    pub unit_name: Option<String>,
    pub policies_applied: bool,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Printer {
    fn from_model(model: printers::Model, unit: Option<units::Model>) -> Self {
        Self {
            id: model.id,
            name: model.name,
            serial_number: model.serial_number,
            ip: model.ip,
            model: model.model,
            location: model.location,
            unit_id: model.unit_id,
            unit_name: unit.map(|u| u.name),
            policies_applied: model.policies_applied,
            active: model.active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Listing filters. Only active printers are ever listed.
#[derive(Debug, Clone, Default)]
pub struct PrinterFilter {
    pub ip: Option<String>,
    pub serial_number: Option<String>,
    pub unit_id: Option<i32>,
    pub policies_applied: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct PrinterInput {
    pub name: String,
    pub serial_number: String,
    pub ip: String,
    pub model: Option<String>,
    pub location: Option<String>,
    pub unit_id: Option<i32>,
    pub policies_applied: bool,
}

#[derive(Debug, Clone)]
pub struct ServiceRecord {
    pub id: i32,
    pub printer_id: i32,
    pub printer_name: Option<String>,
    pub unit_id: Option<i32>,
    pub technician_id: Option<i32>,
    pub description: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewServiceRecord {
    pub printer_id: i32,
    pub unit_id: Option<i32>,
    pub technician_id: Option<i32>,
    pub description: String,
}

pub struct PrinterRepository {
    conn: DatabaseConnection,
}

impl PrinterRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self, filter: &PrinterFilter) -> Result<Vec<Printer>> {
        let mut query = printers::Entity::find().filter(printers::Column::Active.eq(true));

        // Partial matches; SQLite LIKE ignores ASCII case.
        if let Some(ip) = &filter.ip {
            query = query.filter(printers::Column::Ip.contains(ip.as_str()));
        }
        if let Some(serial) = &filter.serial_number {
            query = query.filter(printers::Column::SerialNumber.contains(serial.as_str()));
        }
        if let Some(unit_id) = filter.unit_id {
            query = query.filter(printers::Column::UnitId.eq(unit_id));
        }
        if let Some(applied) = filter.policies_applied {
            query = query.filter(printers::Column::PoliciesApplied.eq(applied));
        }

        let rows = query
            .order_by_asc(printers::Column::Name)
            .find_also_related(units::Entity)
            .all(&self.conn)
            .await
            .context("Failed to list printers")?;

        Ok(rows
            .into_iter()
            .map(|(printer, unit)| Printer::from_model(printer, unit))
            .collect())
    }

    /// Fetches a printer regardless of its `active` flag.
    pub async fn get(&self, id: i32) -> Result<Option<Printer>> {
        let row = printers::Entity::find_by_id(id)
            .find_also_related(units::Entity)
            .one(&self.conn)
            .await
            .context("Failed to query printer")?;

        Ok(row.map(|(printer, unit)| Printer::from_model(printer, unit)))
    }

    pub async fn create(&self, input: PrinterInput) -> Result<Printer> {
        let now = now_timestamp();

        let active = printers::ActiveModel {
            name: Set(input.name),
            serial_number: Set(input.serial_number),
            ip: Set(input.ip),
            model: Set(input.model),
            location: Set(input.location),
            unit_id: Set(input.unit_id),
            policies_applied: Set(input.policies_applied),
            active: Set(true),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active.insert(&self.conn).await?;
        Ok(Printer::from_model(model, None))
    }

    pub async fn update(&self, id: i32, input: PrinterInput) -> Result<Option<Printer>> {
        let Some(printer) = printers::Entity::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };

        let mut active: printers::ActiveModel = printer.into();
        active.name = Set(input.name);
        active.serial_number = Set(input.serial_number);
        active.ip = Set(input.ip);
        active.model = Set(input.model);
        active.location = Set(input.location);
        active.unit_id = Set(input.unit_id);
        active.policies_applied = Set(input.policies_applied);
        active.updated_at = Set(now_timestamp());

        let model = active.update(&self.conn).await?;
        Ok(Some(Printer::from_model(model, None)))
    }

    /// Soft delete. Returns false when the printer does not exist or was
    /// already inactive.
    pub async fn deactivate(&self, id: i32) -> Result<bool> {
        let result = printers::Entity::update_many()
            .col_expr(printers::Column::Active, Expr::value(false))
            .col_expr(printers::Column::UpdatedAt, Expr::value(now_timestamp()))
            .filter(printers::Column::Id.eq(id))
            .filter(printers::Column::Active.eq(true))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    pub async fn list_services(&self, printer_id: Option<i32>) -> Result<Vec<ServiceRecord>> {
        let mut query = printer_services::Entity::find();

        if let Some(printer_id) = printer_id {
            query = query.filter(printer_services::Column::PrinterId.eq(printer_id));
        }

        let rows = query
            .order_by_desc(printer_services::Column::CreatedAt)
            .order_by_desc(printer_services::Column::Id)
            .find_also_related(printers::Entity)
            .all(&self.conn)
            .await
            .context("Failed to list printer services")?;

        Ok(rows
            .into_iter()
            .map(|(record, printer)| ServiceRecord {
                id: record.id,
                printer_id: record.printer_id,
                printer_name: printer.map(|p| p.name),
                unit_id: record.unit_id,
                technician_id: record.technician_id,
                description: record.description,
                created_at: record.created_at,
            })
            .collect())
    }

    pub async fn create_service(&self, record: NewServiceRecord) -> Result<ServiceRecord> {
        let active = printer_services::ActiveModel {
            printer_id: Set(record.printer_id),
            unit_id: Set(record.unit_id),
            technician_id: Set(record.technician_id),
            description: Set(record.description),
            created_at: Set(now_timestamp()),
            ..Default::default()
        };

        let model = active.insert(&self.conn).await?;

        Ok(ServiceRecord {
            id: model.id,
            printer_id: model.printer_id,
            printer_name: None,
            unit_id: model.unit_id,
            technician_id: model.technician_id,
            description: model.description,
            created_at: model.created_at,
        })
    }
}
