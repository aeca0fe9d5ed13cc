//! API request/response models for per-account SMTP relay credentials.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const PASSWORD_MASK: &str = "********";

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct MailCredentialsUpdate {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    #[serde(default = "default_use_tls")]
    pub use_tls: bool,
}

fn default_use_tls() -> bool {
    true
}

/// Stored credentials view. The username is returned in the clear; the
/// password field always carries the mask.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MailCredentialsResponse {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub use_tls: bool,
    pub updated_at: DateTime<Utc>,
}
