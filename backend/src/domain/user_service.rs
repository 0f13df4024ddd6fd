use anyhow::anyhow;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use tracing::{info, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::storage::repositories::user_repository::NewUser;
use crate::storage::{DbConnection, UserRepository};
use shared::{AdminAttribution, CreateUserRequest, User};

/// Hash a password into an Argon2 PHC string
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("Failed to hash password: {}", e))?;
    Ok(hash.to_string())
}

/// Check a password against a stored hash. New accounts carry Argon2 PHC
/// strings; accounts carried over from older stores may still hold bcrypt
/// hashes. Malformed hashes never verify.
pub fn verify_password(password: &str, hash: &str) -> bool {
    if is_bcrypt_hash(hash) {
        return match bcrypt::verify(password, hash) {
            Ok(matches) => matches,
            Err(e) => {
                warn!(error = %e, "Unreadable bcrypt hash");
                false
            }
        };
    }
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

fn is_bcrypt_hash(hash: &str) -> bool {
    ["$2a$", "$2b$", "$2y$"].iter().any(|prefix| hash.starts_with(prefix))
}

/// Service for staff accounts: creation, sign-in checks and attribution
#[derive(Clone)]
pub struct UserService {
    repository: UserRepository,
}

impl UserService {
    pub fn new(db: DbConnection) -> Self {
        Self {
            repository: UserRepository::new(db),
        }
    }

    /// Create an account with a freshly hashed password
    pub async fn create_user(&self, request: CreateUserRequest) -> LedgerResult<User> {
        let username = request.username.trim();
        let full_name = request.full_name.trim();
        if username.is_empty() {
            return Err(LedgerError::Validation("Username cannot be empty".to_string()));
        }
        if request.password.is_empty() {
            return Err(LedgerError::Validation("Password cannot be empty".to_string()));
        }
        if full_name.is_empty() {
            return Err(LedgerError::Validation("Full name cannot be empty".to_string()));
        }
        let email = request
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty());

        let password_hash = hash_password(&request.password)?;
        let user_id = self
            .repository
            .store_user(&NewUser {
                username,
                password_hash: &password_hash,
                full_name,
                email,
                role: request.role.as_str(),
            })
            .await
            .map_err(|e| LedgerError::from_storage(e, username))?;

        info!(user_id, username, "Created user");

        self.repository
            .get_user(user_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("user {}", user_id)))
    }

    /// The active user with these credentials, if any
    pub async fn verify_user(&self, username: &str, password: &str) -> LedgerResult<Option<User>> {
        let Some((user, password_hash)) = self.repository.get_active_credentials(username.trim()).await? else {
            warn!(username, "Sign-in for unknown or inactive user");
            return Ok(None);
        };

        if verify_password(password, &password_hash) {
            info!(user_id = user.id, "User signed in");
            Ok(Some(user))
        } else {
            warn!(username, "Sign-in with wrong password");
            Ok(None)
        }
    }

    pub async fn get_user(&self, user_id: i64) -> LedgerResult<Option<User>> {
        Ok(self.repository.get_user(user_id).await?)
    }

    /// Enable or disable sign-in for an account
    pub async fn set_user_active(&self, user_id: i64, is_active: bool) -> LedgerResult<()> {
        if !self.repository.set_active(user_id, is_active).await? {
            return Err(LedgerError::NotFound(format!("user {}", user_id)));
        }
        info!(user_id, is_active, "Updated user status");
        Ok(())
    }

    /// Attribution for ledger writes made by this user
    pub async fn attribution_for(&self, user_id: i64) -> LedgerResult<AdminAttribution> {
        let user = self
            .get_user(user_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("user {}", user_id)))?;
        Ok(AdminAttribution {
            user_id: Some(user.id),
            display_name: user.full_name,
        })
    }
}
