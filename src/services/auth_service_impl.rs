//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use chrono::{Duration, SecondsFormat, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tokio::sync::OnceCell;
use tokio::task;
use tracing::{info, warn};

use crate::config::SecurityConfig;
use crate::db::repositories::user::{detect_scheme, hash_password, needs_rehash, verify_password};
use crate::db::{Store, User};
use crate::domain::Identity;
use crate::services::auth_service::{AuthError, AuthService, Claims, LoginResult};

/// HS256 access token issuing and verification.
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_hours: u32,
}

impl TokenSigner {
    #[must_use]
    pub fn new(secret: &str, ttl_hours: u32) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_hours,
        }
    }

    /// Returns the token and its RFC 3339 expiry.
    pub fn issue(&self, user: &User) -> Result<(String, String), AuthError> {
        let now = Utc::now();
        let exp = now + Duration::hours(i64::from(self.ttl_hours));

        let claims = Claims {
            sub: user.id.to_string(),
            role: user.role,
            unit_id: user.unit_id,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        let token = self.sign(&claims)?;
        Ok((token, exp.to_rfc3339_opts(SecondsFormat::Secs, true)))
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("Failed to sign token: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::new(Algorithm::HS256))
            .map_err(|_| AuthError::InvalidToken)?;

        let user_id = data
            .claims
            .sub
            .parse::<i32>()
            .map_err(|_| AuthError::InvalidToken)?;

        Ok(Identity {
            user_id,
            role: data.claims.role,
            unit_id: data.claims.unit_id,
        })
    }
}

/// Verified against when the username is unknown, so both failures cost
/// one Argon2 run.
const DUMMY_PASSWORD: &str = "assetdesk-unknown-user";

pub struct SeaOrmAuthService {
    store: Store,
    security: SecurityConfig,
    tokens: TokenSigner,
    dummy_hash: OnceCell<String>,
}

impl SeaOrmAuthService {
    #[must_use]
    pub fn new(store: Store, security: SecurityConfig) -> Self {
        let tokens = TokenSigner::new(&security.jwt_secret, security.token_ttl_hours);
        Self {
            store,
            security,
            tokens,
            dummy_hash: OnceCell::new(),
        }
    }

    fn validate_new_password(&self, password: &str) -> Result<(), AuthError> {
        if password.chars().count() < self.security.min_password_length {
            return Err(AuthError::Validation(format!(
                "New password must be at least {} characters",
                self.security.min_password_length
            )));
        }
        Ok(())
    }

    async fn check_password(password: &str, stored_hash: &str) -> Result<bool, AuthError> {
        let password = password.to_string();
        let stored_hash = stored_hash.to_string();

        // Argon2 is CPU-intensive and would block the async runtime
        task::spawn_blocking(move || verify_password(&password, &stored_hash))
            .await
            .map_err(|e| AuthError::Internal(format!("Password verification task panicked: {e}")))
    }

    /// Replaces a verified hash with one under the current scheme and params.
    /// Failure is logged and does not fail the login.
    async fn upgrade_hash(&self, user: &User, password: &str, stored_hash: &str) {
        let scheme = detect_scheme(stored_hash);

        let result = match self.hash_password(password).await {
            Ok(new_hash) => self
                .store
                .set_user_password_hash(user.id, new_hash)
                .await
                .map_err(AuthError::from),
            Err(e) => Err(e),
        };

        match result {
            Ok(_) => info!(
                user_id = user.id,
                previous_scheme = ?scheme,
                "Upgraded stored password hash"
            ),
            Err(e) => warn!(user_id = user.id, error = %e, "Failed to upgrade password hash"),
        }
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResult, AuthError> {
        let Some((user, stored_hash)) = self.store.get_user_with_password(username).await? else {
            let dummy = self
                .dummy_hash
                .get_or_try_init(|| self.hash_password(DUMMY_PASSWORD))
                .await?;
            Self::check_password(password, dummy).await?;
            return Err(AuthError::InvalidCredentials);
        };

        if !Self::check_password(password, &stored_hash).await? {
            return Err(AuthError::InvalidCredentials);
        }

        if needs_rehash(&stored_hash, &self.security) {
            self.upgrade_hash(&user, password, &stored_hash).await;
        }

        let (token, expires_at) = self.tokens.issue(&user)?;

        Ok(LoginResult {
            token,
            expires_at,
            user,
        })
    }

    fn verify_token(&self, token: &str) -> Result<Identity, AuthError> {
        self.tokens.verify(token)
    }

    async fn current_user(&self, identity: &Identity) -> Result<User, AuthError> {
        self.store
            .get_user(identity.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    async fn change_password(
        &self,
        user_id: i32,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        self.validate_new_password(new_password)?;

        let stored_hash = self
            .store
            .get_user_password_hash(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !Self::check_password(current_password, &stored_hash).await? {
            return Err(AuthError::Validation(
                "Current password is incorrect".to_string(),
            ));
        }

        let new_hash = self.hash_password(new_password).await?;
        self.store.set_user_password_hash(user_id, new_hash).await?;

        Ok(())
    }

    async fn reset_password(&self, username: &str, new_password: &str) -> Result<(), AuthError> {
        self.validate_new_password(new_password)?;

        let user = self
            .store
            .get_user_by_username(username)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let new_hash = self.hash_password(new_password).await?;
        self.store.set_user_password_hash(user.id, new_hash).await?;

        Ok(())
    }

    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let password = password.to_string();
        let config = self.security.clone();

        task::spawn_blocking(move || hash_password(&password, &config))
            .await
            .map_err(|e| AuthError::Internal(format!("Password hashing task panicked: {e}")))?
            .map_err(AuthError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;

    fn user(role: Role, unit_id: Option<i32>) -> User {
        User {
            id: 42,
            username: "jdoe".to_string(),
            full_name: "Jane Doe".to_string(),
            role,
            phone: None,
            email: None,
            unit_id,
            unit_name: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_token_round_trip() {
        let signer = TokenSigner::new("secret", 8);
        let (token, _) = signer
            .issue(&user(Role::PrinterTechnician, Some(3)))
            .unwrap();

        let identity = signer.verify(&token).unwrap();
        assert_eq!(identity.user_id, 42);
        assert_eq!(identity.role, Role::PrinterTechnician);
        assert_eq!(identity.unit_id, Some(3));
    }

    #[test]
    fn test_token_with_wrong_secret_is_rejected() {
        let (token, _) = TokenSigner::new("secret", 8)
            .issue(&user(Role::Admin, None))
            .unwrap();

        let result = TokenSigner::new("other", 8).verify(&token);
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let signer = TokenSigner::new("secret", 8);
        let past = Utc::now() - Duration::hours(2);

        let token = signer
            .sign(&Claims {
                sub: "1".to_string(),
                role: Role::Admin,
                unit_id: None,
                iat: past.timestamp(),
                exp: (past + Duration::minutes(30)).timestamp(),
            })
            .unwrap();

        assert!(matches!(signer.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        let signer = TokenSigner::new("secret", 8);
        assert!(signer.verify("not-a-jwt").is_err());
    }

    #[tokio::test]
    async fn test_unknown_user_still_runs_a_verification() {
        let db_path =
            std::env::temp_dir().join(format!("assetdesk-auth-{}.db", uuid::Uuid::new_v4()));
        let store = Store::new(&format!("sqlite:{}?mode=rwc", db_path.display()))
            .await
            .unwrap();
        let security = SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            ..SecurityConfig::default()
        };
        let service = SeaOrmAuthService::new(store, security);

        assert!(service.dummy_hash.get().is_none());

        let result = service.login("nobody", "whatever").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));

        let dummy = service.dummy_hash.get().unwrap();
        assert_eq!(detect_scheme(dummy), crate::db::repositories::user::HashScheme::Argon2);
        assert!(verify_password(DUMMY_PASSWORD, dummy));

        let _ = std::fs::remove_file(&db_path);
    }
}
