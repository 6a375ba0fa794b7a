//! User persistence behind a trait so handlers never hold a concrete pool.
//!
//! `AppState` carries an `Arc<dyn UserStore>`; production uses [`PgUserStore`].

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::{NewUser, User};

pub const DUPLICATE_EMAIL: &str = "Email already registered";
pub const DUPLICATE_USERNAME: &str = "Username already taken";

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    /// Inserts a new user. A duplicate email or username is a
    /// [`AppError::Validation`] carrying the matching duplicate message.
    async fn insert(&self, new_user: NewUser) -> Result<User, AppError>;
}

pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const USER_COLUMNS: &str = "id, email, username, hashed_password, full_name";

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn insert(&self, new_user: NewUser) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, email, username, hashed_password, full_name)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&new_user.email)
        .bind(&new_user.username)
        .bind(&new_user.hashed_password)
        .bind(&new_user.full_name)
        .fetch_one(&self.db)
        .await
        .map_err(map_unique_violation)?;

        info!(user_id = %user.id, "user row inserted");
        Ok(user)
    }
}

/// A concurrent signup can slip past the handler's pre-checks; the unique
/// constraints still decide, and the result must look the same to the caller.
fn map_unique_violation(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return AppError::Validation(duplicate_message(db_err.constraint()).into());
        }
    }
    AppError::Database(err)
}

/// Constraint names come from the `users` migration.
fn duplicate_message(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("users_username_key") => DUPLICATE_USERNAME,
        _ => DUPLICATE_EMAIL,
    }
}
