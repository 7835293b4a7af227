use anyhow::{Context, Result};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};
use std::str::FromStr;

use crate::db::now_timestamp;
use crate::domain::MaintenanceStatus;
use crate::entities::{maintenance_tickets, users};

#[derive(Debug, Clone)]
pub struct MaintenanceTicket {
    pub id: i32,
    pub ticket_number: Option<String>,
    pub equipment: String,
    pub problem_description: String,
    pub technician_id: i32,
    pub technician_name: Option<String>,
    pub status: MaintenanceStatus,
    pub report: Option<String>,
    pub received_at: String,
    pub updated_at: String,
}

impl MaintenanceTicket {
    fn from_model(
        model: maintenance_tickets::Model,
        technician: Option<users::Model>,
    ) -> Result<Self> {
        let status = MaintenanceStatus::from_str(&model.status)
            .with_context(|| format!("Ticket {} has an invalid stored status", model.id))?;

        Ok(Self {
            id: model.id,
            ticket_number: model.ticket_number,
            equipment: model.equipment,
            problem_description: model.problem_description,
            technician_id: model.technician_id,
            technician_name: technician.map(|u| u.full_name),
            status,
            report: model.report,
            received_at: model.received_at,
            updated_at: model.updated_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewTicket {
    pub ticket_number: Option<String>,
    pub equipment: String,
    pub problem_description: String,
    pub technician_id: i32,
}

/// A change applied by [`MaintenanceRepository::transition`].
#[derive(Debug, Clone)]
pub enum TicketChange {
    Status(MaintenanceStatus),
    /// Take the ticket over and move it to `in_progress`.
    Start { technician_id: i32 },
    /// Close the ticket with its technical report.
    Finish { report: String },
}

pub struct MaintenanceRepository {
    conn: DatabaseConnection,
}

impl MaintenanceRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Oldest first.
    pub async fn list(&self) -> Result<Vec<MaintenanceTicket>> {
        let rows = maintenance_tickets::Entity::find()
            .order_by_asc(maintenance_tickets::Column::ReceivedAt)
            .order_by_asc(maintenance_tickets::Column::Id)
            .find_also_related(users::Entity)
            .all(&self.conn)
            .await
            .context("Failed to list maintenance tickets")?;

        rows.into_iter()
            .map(|(ticket, technician)| MaintenanceTicket::from_model(ticket, technician))
            .collect()
    }

    pub async fn get(&self, id: i32) -> Result<Option<MaintenanceTicket>> {
        let row = maintenance_tickets::Entity::find_by_id(id)
            .find_also_related(users::Entity)
            .one(&self.conn)
            .await
            .context("Failed to query maintenance ticket")?;

        row.map(|(ticket, technician)| MaintenanceTicket::from_model(ticket, technician))
            .transpose()
    }

    pub async fn create(&self, ticket: NewTicket) -> Result<MaintenanceTicket> {
        let now = now_timestamp();

        let model = maintenance_tickets::ActiveModel {
            ticket_number: Set(ticket.ticket_number),
            equipment: Set(ticket.equipment),
            problem_description: Set(ticket.problem_description),
            technician_id: Set(ticket.technician_id),
            status: Set(MaintenanceStatus::Pending.as_str().to_string()),
            report: Set(None),
            received_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.conn)
        .await?;

        let technician = users::Entity::find_by_id(model.technician_id)
            .one(&self.conn)
            .await?;

        MaintenanceTicket::from_model(model, technician)
    }

    pub async fn transition(
        &self,
        id: i32,
        change: TicketChange,
    ) -> Result<Option<MaintenanceTicket>> {
        let Some(ticket) = maintenance_tickets::Entity::find_by_id(id)
            .one(&self.conn)
            .await?
        else {
            return Ok(None);
        };

        let mut active: maintenance_tickets::ActiveModel = ticket.into();
        match change {
            TicketChange::Status(status) => {
                active.status = Set(status.as_str().to_string());
            }
            TicketChange::Start { technician_id } => {
                active.technician_id = Set(technician_id);
                active.status = Set(MaintenanceStatus::InProgress.as_str().to_string());
            }
            TicketChange::Finish { report } => {
                active.report = Set(Some(report));
                active.status = Set(MaintenanceStatus::Done.as_str().to_string());
            }
        }
        active.updated_at = Set(now_timestamp());
        active.update(&self.conn).await?;

        self.get(id).await
    }
}
