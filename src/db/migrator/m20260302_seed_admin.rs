use crate::config::SecurityConfig;
use crate::db::{now_timestamp, repositories::user::hash_password};
use crate::domain::Role;
use crate::entities::prelude::*;
use crate::entities::{supply_inventory, users};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

/// Change on first login.
pub const DEFAULT_ADMIN_PASSWORD: &str = "password";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let now = now_timestamp();
        let password_hash = hash_password(DEFAULT_ADMIN_PASSWORD, &SecurityConfig::default())
            .map_err(|e| DbErr::Custom(format!("Failed to hash default password: {e}")))?;

        let insert_admin = Query::insert()
            .into_table(Users)
            .columns([
                users::Column::Username,
                users::Column::FullName,
                users::Column::Role,
                users::Column::PasswordHash,
                users::Column::CreatedAt,
                users::Column::UpdatedAt,
            ])
            .values_panic([
                DEFAULT_ADMIN_USERNAME.into(),
                "Administrator".into(),
                Role::Admin.as_str().into(),
                password_hash.into(),
                now.clone().into(),
                now.clone().into(),
            ])
            .to_owned();

        manager.exec_stmt(insert_admin).await?;

        let insert_inventory = Query::insert()
            .into_table(SupplyInventory)
            .columns([
                supply_inventory::Column::Id,
                supply_inventory::Column::ImagingUnits,
                supply_inventory::Column::BlackToner,
                supply_inventory::Column::CyanToner,
                supply_inventory::Column::MagentaToner,
                supply_inventory::Column::YellowToner,
                supply_inventory::Column::UpdatedAt,
            ])
            .values_panic([
                1.into(),
                0.into(),
                0.into(),
                0.into(),
                0.into(),
                0.into(),
                now.into(),
            ])
            .to_owned();

        manager.exec_stmt(insert_inventory).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .exec_stmt(
                Query::delete()
                    .from_table(Users)
                    .and_where(Expr::col(users::Column::Username).eq(DEFAULT_ADMIN_USERNAME))
                    .to_owned(),
            )
            .await
    }
}
