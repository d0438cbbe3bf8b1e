//! Auth service
//!
//! Password login, opaque session tokens and password changes.
//! Session tokens are random 32-byte hex strings; only their SHA-256 is stored.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Duration;
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::domain::entities::{
    month_start, validate_username, NewSession, NewUser, Role, Shift, User,
};
use crate::domain::ports::{Clock, SessionRepository, UserRepository};
use crate::error::{AppError, DomainError};

pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Service for logins and sessions
pub struct AuthService<UR, SR>
where
    UR: UserRepository + ?Sized,
    SR: SessionRepository + ?Sized,
{
    users: Arc<UR>,
    sessions: Arc<SR>,
    clock: Arc<dyn Clock>,
    session_ttl: Duration,
}

impl<UR, SR> AuthService<UR, SR>
where
    UR: UserRepository + ?Sized,
    SR: SessionRepository + ?Sized,
{
    pub fn new(
        users: Arc<UR>,
        sessions: Arc<SR>,
        clock: Arc<dyn Clock>,
        session_ttl_secs: i64,
    ) -> Self {
        Self {
            users,
            sessions,
            clock,
            session_ttl: Duration::seconds(session_ttl_secs),
        }
    }

    /// Check credentials and open a session
    ///
    /// Returns the user and the raw session token (only shown once)
    pub async fn login(&self, username: &str, password: &str) -> Result<(User, String), AppError> {
        let user = self
            .users
            .find_by_username(username.trim())
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(invalid_credentials)?;

        if !verify_password(password, &user.password_hash) {
            tracing::debug!(username = %user.username, "Rejected login with wrong password");
            return Err(invalid_credentials());
        }

        let token = self.open_session(&user).await?;
        tracing::info!(user_id = %user.id, role = %user.role, "User logged in");

        Ok((user, token))
    }

    /// Resolve a raw session token to its active user
    pub async fn authenticate(&self, token: &str) -> Result<Option<User>, AppError> {
        let now = self.clock.now();
        let Some(session) = self
            .sessions
            .find_active(&hash_token(token), now)
            .await?
        else {
            return Ok(None);
        };

        Ok(self
            .users
            .find_by_id(session.user_id)
            .await?
            .filter(|u| u.is_active))
    }

    pub async fn logout(&self, token: &str) -> Result<(), AppError> {
        self.sessions.delete(&hash_token(token)).await?;
        Ok(())
    }

    /// Change the password, end every other session and return a fresh token
    pub async fn change_password(
        &self,
        user: &User,
        old_password: &str,
        new_password: &str,
    ) -> Result<String, AppError> {
        if !verify_password(old_password, &user.password_hash) {
            return Err(AppError::BadRequest("Old password is incorrect".to_string()));
        }
        validate_password(new_password)?;

        let hash = hash_password(new_password)?;
        self.users.set_password_hash(user.id, &hash).await?;

        let ended = self.sessions.delete_for_user(user.id).await?;
        tracing::info!(user_id = %user.id, sessions_ended = ended, "Password changed");

        self.open_session(user).await
    }

    /// Create an administrator account (CLI bootstrap)
    pub async fn create_admin(&self, username: &str, password: &str) -> Result<User, AppError> {
        validate_username(username)?;
        validate_password(password)?;

        if self.users.find_by_username(username).await?.is_some() {
            return Err(AppError::Domain(DomainError::AlreadyExists(format!(
                "User '{}' already exists",
                username
            ))));
        }

        let user = self
            .users
            .create(&NewUser {
                username: username.to_string(),
                password_hash: hash_password(password)?,
                first_name: String::new(),
                last_name: String::new(),
                email: String::new(),
                role: Role::Admin,
                work_shift: Shift::Day,
                employee_code: None,
                token_period: month_start(self.clock.today()),
            })
            .await?;

        Ok(user)
    }

    /// Drop sessions past their expiry
    pub async fn purge_expired_sessions(&self) -> Result<u64, AppError> {
        Ok(self.sessions.purge_expired(self.clock.now()).await?)
    }

    async fn open_session(&self, user: &User) -> Result<String, AppError> {
        let token = generate_token();
        let now = self.clock.now();

        self.sessions
            .create(&NewSession {
                token_hash: hash_token(&token),
                user_id: user.id,
                created_at: now,
                expires_at: now + self.session_ttl,
            })
            .await?;

        Ok(token)
    }
}

fn invalid_credentials() -> AppError {
    AppError::BadRequest("Invalid credentials".to_string())
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against a stored PHC string; malformed hashes never match
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Generate a random opaque token (sessions and CSRF)
pub fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..32).map(|_| rng.gen()).collect();
    hex::encode(bytes)
}

/// Hash a session token for storage
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{datetime, test_user, FixedClock, InMemoryStore};

    fn create_service(
        store: &Arc<InMemoryStore>,
        clock: Arc<FixedClock>,
    ) -> AuthService<InMemoryStore, InMemoryStore> {
        AuthService::new(store.clone(), store.clone(), clock, 3600)
    }

    fn seed_user(store: &InMemoryStore, username: &str, password: &str) -> User {
        let mut user = test_user(username, Role::Employee);
        user.password_hash = hash_password(password).unwrap();
        store.insert_user(user)
    }

    #[test]
    fn token_generation() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert_ne!(token, generate_token());
    }

    #[test]
    fn token_hashing_is_stable() {
        let hash = hash_token("abc");
        assert_eq!(hash, hash_token("abc"));
        assert_ne!(hash, "abc");
        assert_eq!(hash.len(), 64);
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("secret1").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("secret1", &hash));
        assert!(!verify_password("secret2", &hash));
        assert!(!verify_password("secret1", "not-a-phc-string"));
    }

    #[tokio::test]
    async fn login_then_authenticate() {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(FixedClock::at(datetime(2026, 3, 2, 9)));
        let service = create_service(&store, clock);
        let user = seed_user(&store, "alice", "hunter22");

        let (logged_in, token) = service.login("alice", "hunter22").await.unwrap();
        assert_eq!(logged_in.id, user.id);

        let found = service.authenticate(&token).await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));
    }

    #[tokio::test]
    async fn login_rejects_wrong_password_and_unknown_user() {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(FixedClock::at(datetime(2026, 3, 2, 9)));
        let service = create_service(&store, clock);
        seed_user(&store, "alice", "hunter22");

        assert!(matches!(
            service.login("alice", "wrong-pw").await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            service.login("nobody", "hunter22").await,
            Err(AppError::BadRequest(_))
        ));
        assert_eq!(store.session_count(), 0);
    }

    #[tokio::test]
    async fn inactive_user_cannot_log_in() {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(FixedClock::at(datetime(2026, 3, 2, 9)));
        let service = create_service(&store, clock);

        let mut user = test_user("bob", Role::Guest);
        user.password_hash = hash_password("hunter22").unwrap();
        user.is_active = false;
        store.insert_user(user);

        assert!(service.login("bob", "hunter22").await.is_err());
    }

    #[tokio::test]
    async fn sessions_expire() {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(FixedClock::at(datetime(2026, 3, 2, 9)));
        let service = create_service(&store, clock.clone());
        seed_user(&store, "alice", "hunter22");

        let (_, token) = service.login("alice", "hunter22").await.unwrap();
        clock.set(datetime(2026, 3, 2, 11));

        assert!(service.authenticate(&token).await.unwrap().is_none());
        assert_eq!(service.purge_expired_sessions().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn logout_ends_session() {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(FixedClock::at(datetime(2026, 3, 2, 9)));
        let service = create_service(&store, clock);
        seed_user(&store, "alice", "hunter22");

        let (_, token) = service.login("alice", "hunter22").await.unwrap();
        service.logout(&token).await.unwrap();

        assert!(service.authenticate(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn change_password_rotates_sessions() {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(FixedClock::at(datetime(2026, 3, 2, 9)));
        let service = create_service(&store, clock);
        seed_user(&store, "alice", "hunter22");

        let (user, old_token) = service.login("alice", "hunter22").await.unwrap();

        assert!(matches!(
            service.change_password(&user, "wrong", "newpass1").await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            service.change_password(&user, "hunter22", "short").await,
            Err(AppError::BadRequest(_))
        ));

        let new_token = service
            .change_password(&user, "hunter22", "newpass1")
            .await
            .unwrap();

        assert!(service.authenticate(&old_token).await.unwrap().is_none());
        assert!(service.authenticate(&new_token).await.unwrap().is_some());
        assert!(verify_password("newpass1", &store.user(user.id).unwrap().password_hash));
    }

    #[tokio::test]
    async fn create_admin_rejects_duplicates() {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(FixedClock::at(datetime(2026, 3, 2, 9)));
        let service = create_service(&store, clock);

        let admin = service.create_admin("root", "rootpass").await.unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert!(service.create_admin("root", "rootpass").await.is_err());
    }
}
