//! Database models for relay delivery logs.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::types::{AccountId, RelayLogId};

/// Database entity model. Holds only redacted envelope metadata - never
/// message bodies or credentials.
#[derive(Debug, Clone, FromRow)]
pub struct RelayLog {
    pub id: RelayLogId,
    pub account_id: AccountId,
    pub mail_from: String,
    pub mail_to: String,
    pub subject: String,
    pub has_attachments: bool,
    pub message_id: Option<String>,
    pub sent_at: DateTime<Utc>,
}

/// Request for recording a relayed message
#[derive(Debug, Clone)]
pub struct RelayLogCreateDBRequest {
    pub account_id: AccountId,
    pub mail_from: String,
    pub mail_to: String,
    pub subject: String,
    pub has_attachments: bool,
    pub message_id: Option<String>,
}
