//! Credential store: the account persistence contract and its
//! PostgreSQL implementation
//!
//! Every operation touches exactly one row, so the store's atomic
//! single-row writes provide all the isolation the lifecycle needs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::models::{NewUser, ProfileUpdate, User};

/// Error type for credential store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Another account already holds the email or username
    #[error("email or username already exists")]
    Conflict,

    /// Underlying database failure
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence contract for accounts.
///
/// Object-safe so handlers run against the PostgreSQL store in
/// production and an in-memory store in tests.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find an account matching either identity field
    async fn find_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<Option<User>, StoreError>;

    /// Find an account by email
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Find an account by id
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Insert a new account. Fails with [`StoreError::Conflict`] when
    /// the email or username is already taken.
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError>;

    /// Refresh the pending OTP; code and expiry are written together
    async fn set_otp(
        &self,
        id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Flip the verification flag and clear both OTP fields in one write
    async fn mark_verified(&self, id: Uuid) -> Result<(), StoreError>;

    /// Merge the supplied profile fields into the account; absent fields
    /// keep their stored values. Returns `None` when the account is gone.
    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<User>, StoreError>;
}

const USER_COLUMNS: &str = "id, username, email, password_hash, role, is_verified, \
     first_name, last_name, phone_number, address, \
     otp_code, otp_expires_at, created_at, updated_at";

/// PostgreSQL-backed credential store
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Create a new store over a connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 OR username = $2"
        ))
        .bind(email)
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        info!("Creating new user: {}", new_user.username);

        let result = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, username, email, password_hash, role, otp_code, otp_expires_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(new_user.role)
        .bind(&new_user.otp_code)
        .bind(new_user.otp_expires_at)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => Ok(user),
            // The controller pre-checks uniqueness; this covers the
            // concurrent double-submit race against the unique indexes.
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::Conflict)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn set_otp(
        &self,
        id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE users SET otp_code = $2, otp_expires_at = $3, updated_at = now()
             WHERE id = $1",
        )
        .bind(id)
        .bind(code)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_verified(&self, id: Uuid) -> Result<(), StoreError> {
        info!("Marking user {} as verified", id);

        sqlx::query(
            "UPDATE users
             SET is_verified = TRUE, otp_code = NULL, otp_expires_at = NULL, updated_at = now()
             WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users
             SET first_name = COALESCE($2, first_name),
                 last_name = COALESCE($3, last_name),
                 phone_number = COALESCE($4, phone_number),
                 address = COALESCE($5, address),
                 updated_at = now()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(update.first_name)
        .bind(update.last_name)
        .bind(update.phone_number)
        .bind(update.address)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}
