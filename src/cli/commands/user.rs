//! `create-user` command handler

use anyhow::Context;

use crate::config::Config;
use crate::db::{NewUser, Store};
use crate::domain::Role;
use crate::services::{AuthService, SeaOrmAuthService};

pub async fn cmd_create_user(
    config: &Config,
    username: &str,
    full_name: &str,
    role: &str,
    password: &str,
    unit_id: Option<i32>,
) -> anyhow::Result<()> {
    let role: Role = role.parse()?;

    let username = username.trim();
    if username.is_empty() {
        anyhow::bail!("Username is required");
    }

    if password.chars().count() < config.security.min_password_length {
        anyhow::bail!(
            "Password must be at least {} characters",
            config.security.min_password_length
        );
    }

    let store = Store::new(&config.general.database_path).await?;

    if let Some(unit_id) = unit_id
        && store.get_unit(unit_id).await?.is_none()
    {
        anyhow::bail!("Unit {unit_id} does not exist");
    }

    let auth = SeaOrmAuthService::new(store.clone(), config.security.clone());
    let password_hash = auth
        .hash_password(password)
        .await
        .context("Failed to hash password")?;

    let user = store
        .create_user(NewUser {
            username: username.to_string(),
            full_name: full_name.trim().to_string(),
            role,
            phone: None,
            email: None,
            unit_id,
            password_hash,
        })
        .await
        .with_context(|| format!("Failed to create user '{username}'"))?;

    println!("✓ Created {} '{}' (id {})", user.role, user.username, user.id);
    Ok(())
}
