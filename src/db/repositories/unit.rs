use anyhow::{Context, Result};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};

use crate::db::now_timestamp;
use crate::entities::units;

pub use crate::entities::units::Model as Unit;

#[derive(Debug, Clone)]
pub struct UnitInput {
    pub name: String,
    pub code: Option<String>,
    pub campus: Option<String>,
}

pub struct UnitRepository {
    conn: DatabaseConnection,
}

impl UnitRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self) -> Result<Vec<Unit>> {
        units::Entity::find()
            .order_by_asc(units::Column::Name)
            .all(&self.conn)
            .await
            .context("Failed to list units")
    }

    pub async fn get(&self, id: i32) -> Result<Option<Unit>> {
        units::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query unit")
    }

    pub async fn create(&self, input: UnitInput) -> Result<Unit> {
        let active = units::ActiveModel {
            name: Set(input.name),
            code: Set(input.code),
            campus: Set(input.campus),
            created_at: Set(now_timestamp()),
            ..Default::default()
        };

        Ok(active.insert(&self.conn).await?)
    }

    pub async fn update(&self, id: i32, input: UnitInput) -> Result<Option<Unit>> {
        let Some(unit) = self.get(id).await? else {
            return Ok(None);
        };

        let mut active: units::ActiveModel = unit.into();
        active.name = Set(input.name);
        active.code = Set(input.code);
        active.campus = Set(input.campus);

        Ok(Some(active.update(&self.conn).await?))
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = units::Entity::delete_by_id(id).exec(&self.conn).await?;
        Ok(result.rows_affected > 0)
    }
}
