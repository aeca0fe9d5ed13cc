//! Database models for accounts.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::types::AccountId;

/// Database entity model
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub password_changed_at: Option<DateTime<Utc>>,
}

/// Request for creating an account
#[derive(Debug, Clone)]
pub struct AccountCreateDBRequest {
    pub username: String,
    /// Already normalized (lowercased) by the caller.
    pub email: String,
    pub password_hash: String,
}
