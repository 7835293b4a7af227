use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt::Write;
use std::str::FromStr;

use crate::config::SecurityConfig;
use crate::db::now_timestamp;
use crate::domain::Role;
use crate::entities::{units, users};

const LEGACY_PREFIX: &str = "sha256$";

/// User data returned from repository (without sensitive password hash)
#[derive(Debug, Clone)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub unit_id: Option<i32>,
    pub unit_name: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    fn from_model(model: users::Model, unit: Option<units::Model>) -> Result<Self> {
        let role = Role::from_str(&model.role)
            .with_context(|| format!("User {} has an invalid stored role", model.id))?;

        Ok(Self {
            id: model.id,
            username: model.username,
            full_name: model.full_name,
            role,
            phone: model.phone,
            email: model.email,
            unit_id: model.unit_id,
            unit_name: unit.map(|u| u.name),
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<Role>,
    /// Matches every technician variant.
    pub technicians_only: bool,
    pub unit_id: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub unit_id: Option<i32>,
    pub password_hash: String,
}

/// Profile fields. Passwords change through the auth service only.
#[derive(Debug, Clone)]
pub struct UserChanges {
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub unit_id: Option<i32>,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<User>> {
        let row = users::Entity::find_by_id(id)
            .find_also_related(units::Entity)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        row.map(|(user, unit)| User::from_model(user, unit))
            .transpose()
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .find_also_related(units::Entity)
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        row.map(|(user, unit)| User::from_model(user, unit))
            .transpose()
    }

    /// Get user by username with password hash (for login and hash migration)
    pub async fn get_by_username_with_password(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>> {
        let row = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .find_also_related(units::Entity)
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        row.map(|(user, unit)| {
            let password_hash = user.password_hash.clone();
            User::from_model(user, unit).map(|u| (u, password_hash))
        })
        .transpose()
    }

    pub async fn get_password_hash(&self, id: i32) -> Result<Option<String>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user for password verification")?;

        Ok(user.map(|u| u.password_hash))
    }

    pub async fn list(&self, filter: &UserFilter) -> Result<Vec<User>> {
        let mut query = users::Entity::find();

        if let Some(role) = filter.role {
            query = query.filter(users::Column::Role.eq(role.as_str()));
        }
        if filter.technicians_only {
            query = query.filter(
                users::Column::Role.is_in(Role::TECHNICIANS.iter().map(|r| r.as_str())),
            );
        }
        if let Some(unit_id) = filter.unit_id {
            query = query.filter(users::Column::UnitId.eq(unit_id));
        }

        let rows = query
            .order_by_asc(users::Column::FullName)
            .find_also_related(units::Entity)
            .all(&self.conn)
            .await
            .context("Failed to list users")?;

        rows.into_iter()
            .map(|(user, unit)| User::from_model(user, unit))
            .collect()
    }

    /// Full names for a set of user ids.
    pub async fn names_by_ids(&self, ids: &[i32]) -> Result<HashMap<i32, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = users::Entity::find()
            .filter(users::Column::Id.is_in(ids.iter().copied()))
            .all(&self.conn)
            .await
            .context("Failed to query user names")?;

        Ok(rows.into_iter().map(|u| (u.id, u.full_name)).collect())
    }

    pub async fn create(&self, user: NewUser) -> Result<User> {
        let now = now_timestamp();

        let active = users::ActiveModel {
            username: Set(user.username),
            full_name: Set(user.full_name),
            role: Set(user.role.as_str().to_string()),
            phone: Set(user.phone),
            email: Set(user.email),
            unit_id: Set(user.unit_id),
            password_hash: Set(user.password_hash),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active.insert(&self.conn).await?;
        User::from_model(model, None)
    }

    pub async fn update(&self, id: i32, changes: UserChanges) -> Result<Option<User>> {
        let Some(user) = users::Entity::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };

        let mut active: users::ActiveModel = user.into();
        active.username = Set(changes.username);
        active.full_name = Set(changes.full_name);
        active.role = Set(changes.role.as_str().to_string());
        active.phone = Set(changes.phone);
        active.email = Set(changes.email);
        active.unit_id = Set(changes.unit_id);
        active.updated_at = Set(now_timestamp());

        let model = active.update(&self.conn).await?;
        User::from_model(model, None).map(Some)
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = users::Entity::delete_by_id(id).exec(&self.conn).await?;
        Ok(result.rows_affected > 0)
    }

    /// Stores an already computed hash.
    pub async fn set_password_hash(&self, id: i32, password_hash: String) -> Result<bool> {
        let Some(user) = users::Entity::find_by_id(id).one(&self.conn).await? else {
            return Ok(false);
        };

        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(password_hash);
        active.updated_at = Set(now_timestamp());
        active.update(&self.conn).await?;

        Ok(true)
    }
}

/// Storage scheme of a password hash, detected from its format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashScheme {
    /// Argon2 PHC string (`$argon2id$...`).
    Argon2,
    /// `sha256$<salt>$<hex digest>` where the digest covers salt then password.
    LegacySha256,
    Unknown,
}

#[must_use]
pub fn detect_scheme(hash: &str) -> HashScheme {
    if hash.starts_with("$argon2") {
        HashScheme::Argon2
    } else if hash.starts_with(LEGACY_PREFIX) {
        HashScheme::LegacySha256
    } else {
        HashScheme::Unknown
    }
}

fn argon2_params(config: &SecurityConfig) -> Result<Params> {
    Params::new(
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
        None, // output length (use default)
    )
    .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))
}

/// Hash a password using Argon2id with the configured params.
pub fn hash_password(password: &str, config: &SecurityConfig) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params(config)?);

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Checks `password` against a stored hash of either scheme. Unknown or
/// malformed hashes never verify.
#[must_use]
pub fn verify_password(password: &str, stored: &str) -> bool {
    match detect_scheme(stored) {
        HashScheme::Argon2 => PasswordHash::new(stored).is_ok_and(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        }),
        HashScheme::LegacySha256 => {
            let Some((salt, digest)) = stored[LEGACY_PREFIX.len()..].split_once('$') else {
                return false;
            };
            legacy_digest(salt, password).eq_ignore_ascii_case(digest)
        }
        HashScheme::Unknown => false,
    }
}

/// Whether a hash that just verified should be replaced by a fresh one.
#[must_use]
pub fn needs_rehash(stored: &str, config: &SecurityConfig) -> bool {
    match detect_scheme(stored) {
        HashScheme::LegacySha256 | HashScheme::Unknown => true,
        HashScheme::Argon2 => {
            if !config.auto_migrate_password_hashes {
                return false;
            }
            let Ok(parsed) = PasswordHash::new(stored) else {
                return true;
            };
            Params::try_from(&parsed).map_or(true, |params| {
                params.m_cost() != config.argon2_memory_cost_kib
                    || params.t_cost() != config.argon2_time_cost
                    || params.p_cost() != config.argon2_parallelism
            })
        }
    }
}

fn legacy_digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());

    hasher
        .finalize()
        .iter()
        .fold(String::with_capacity(64), |mut acc, b| {
            let _ = write!(acc, "{b:02x}");
            acc
        })
}

/// Builds a hash in the legacy scheme. Only used to seed old accounts.
#[must_use]
pub fn legacy_hash(password: &str, salt: &str) -> String {
    format!("{LEGACY_PREFIX}{salt}${}", legacy_digest(salt, password))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> SecurityConfig {
        SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            ..SecurityConfig::default()
        }
    }

    #[test]
    fn test_detect_scheme() {
        assert_eq!(detect_scheme("$argon2id$v=19$m=8,t=1,p=1$abc$def"), HashScheme::Argon2);
        assert_eq!(detect_scheme("sha256$ab$cd"), HashScheme::LegacySha256);
        assert_eq!(detect_scheme("$2b$10$abcdef"), HashScheme::Unknown);
    }

    #[test]
    fn test_argon2_round_trip() {
        let config = fast_config();
        let hash = hash_password("hunter22", &config).unwrap();

        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
        assert!(!needs_rehash(&hash, &config));
    }

    #[test]
    fn test_outdated_argon2_params_need_rehash() {
        let old = fast_config();
        let hash = hash_password("hunter22", &old).unwrap();

        let current = SecurityConfig::default();
        assert!(needs_rehash(&hash, &current));

        let frozen = SecurityConfig {
            auto_migrate_password_hashes: false,
            ..SecurityConfig::default()
        };
        assert!(!needs_rehash(&hash, &frozen));
    }

    #[test]
    fn test_legacy_scheme() {
        let hash = legacy_hash("secret1", "a1b2c3");
        assert!(hash.starts_with("sha256$a1b2c3$"));
        assert!(verify_password("secret1", &hash));
        assert!(!verify_password("secret2", &hash));
        assert!(needs_rehash(&hash, &SecurityConfig::default()));
    }

    #[test]
    fn test_malformed_hashes_never_verify() {
        assert!(!verify_password("x", ""));
        assert!(!verify_password("x", "sha256$nodigest"));
        assert!(!verify_password("x", "$argon2id$garbage"));
        assert!(!verify_password("x", "plaintext"));
    }
}
