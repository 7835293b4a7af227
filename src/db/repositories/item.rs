use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::db::now_timestamp;
use crate::entities::{items, units};

/// A stock item with the name of its owning unit.
#[derive(Debug, Clone)]
pub struct Item {
    pub id: i32,
    pub catalog_code: Option<String>,
    pub procurement_ref: Option<String>,
    pub description: String,
    pub kind: Option<String>,
    pub unit_of_measure: String,
    pub storage_location: Option<String>,
    pub quantity: i32,
    pub unit_price: f64,
    pub unit_id: i32,
    pub unit_name: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Item {
    fn from_model(model: items::Model, unit: Option<units::Model>) -> Self {
        Self {
            id: model.id,
            catalog_code: model.catalog_code,
            procurement_ref: model.procurement_ref,
            description: model.description,
            kind: model.kind,
            unit_of_measure: model.unit_of_measure,
            storage_location: model.storage_location,
            quantity: model.quantity,
            unit_price: model.unit_price,
            unit_id: model.unit_id,
            unit_name: unit.map(|u| u.name),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ItemInput {
    pub catalog_code: Option<String>,
    pub procurement_ref: Option<String>,
    pub description: String,
    pub kind: Option<String>,
    pub unit_of_measure: String,
    pub storage_location: Option<String>,
    pub quantity: i32,
    pub unit_price: f64,
    pub unit_id: i32,
}

pub struct ItemRepository {
    conn: DatabaseConnection,
}

impl ItemRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self, unit_id: Option<i32>) -> Result<Vec<Item>> {
        let mut query = items::Entity::find();

        if let Some(unit_id) = unit_id {
            query = query.filter(items::Column::UnitId.eq(unit_id));
        }

        let rows = query
            .order_by_asc(items::Column::Description)
            .find_also_related(units::Entity)
            .all(&self.conn)
            .await
            .context("Failed to list items")?;

        Ok(rows
            .into_iter()
            .map(|(item, unit)| Item::from_model(item, unit))
            .collect())
    }

    pub async fn get(&self, id: i32) -> Result<Option<Item>> {
        let row = items::Entity::find_by_id(id)
            .find_also_related(units::Entity)
            .one(&self.conn)
            .await
            .context("Failed to query item")?;

        Ok(row.map(|(item, unit)| Item::from_model(item, unit)))
    }

    pub async fn create(&self, input: ItemInput) -> Result<Item> {
        let now = now_timestamp();

        let active = items::ActiveModel {
            catalog_code: Set(input.catalog_code),
            procurement_ref: Set(input.procurement_ref),
            description: Set(input.description),
            kind: Set(input.kind),
            unit_of_measure: Set(input.unit_of_measure),
            storage_location: Set(input.storage_location),
            quantity: Set(input.quantity),
            unit_price: Set(input.unit_price),
            unit_id: Set(input.unit_id),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active.insert(&self.conn).await?;
        Ok(Item::from_model(model, None))
    }

    pub async fn update(&self, id: i32, input: ItemInput) -> Result<Option<Item>> {
        let Some(item) = items::Entity::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };

        let mut active: items::ActiveModel = item.into();
        active.catalog_code = Set(input.catalog_code);
        active.procurement_ref = Set(input.procurement_ref);
        active.description = Set(input.description);
        active.kind = Set(input.kind);
        active.unit_of_measure = Set(input.unit_of_measure);
        active.storage_location = Set(input.storage_location);
        active.quantity = Set(input.quantity);
        active.unit_price = Set(input.unit_price);
        active.unit_id = Set(input.unit_id);
        active.updated_at = Set(now_timestamp());

        let model = active.update(&self.conn).await?;
        Ok(Some(Item::from_model(model, None)))
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = items::Entity::delete_by_id(id).exec(&self.conn).await?;
        Ok(result.rows_affected > 0)
    }
}
