//! Database models for stored relay (SMTP) credentials.
//!
//! The username and password columns hold `iv:ciphertext` blobs produced by
//! [`crate::crypto::SecretCipher`]; no plaintext secret is ever stored.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::types::AccountId;

/// Database entity model
#[derive(Debug, Clone, FromRow)]
pub struct MailCredentials {
    pub account_id: AccountId,
    pub host: String,
    pub port: i32,
    pub username_encrypted: String,
    pub password_encrypted: String,
    pub use_tls: bool,
    pub updated_at: DateTime<Utc>,
}

/// Request for upserting an account's relay credentials
#[derive(Debug, Clone)]
pub struct MailCredentialsUpsertDBRequest {
    pub account_id: AccountId,
    pub host: String,
    pub port: i32,
    pub username_encrypted: String,
    pub password_encrypted: String,
    pub use_tls: bool,
}
