//! Database models for API keys.
//!
//! The plaintext key is never a column anywhere: only its SHA-256 hash (for
//! lookup) and a redacted preview (for display) are stored.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::types::{AccountId, ApiKeyId};

/// Database entity model
#[derive(Debug, Clone, FromRow)]
pub struct ApiKey {
    pub id: ApiKeyId,
    pub account_id: AccountId,
    pub name: String,
    pub preview: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Request for creating an API key
#[derive(Debug, Clone)]
pub struct ApiKeyCreateDBRequest {
    pub account_id: AccountId,
    pub name: String,
    pub key_hash: String,
    pub preview: String,
}
