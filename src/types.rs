//! Common type definitions.
//!
//! All entity IDs are UUIDs wrapped in type aliases for better type safety:
//!
//! - [`AccountId`]: Account identifier
//! - [`ApiKeyId`]: API key identifier
//! - [`RelayLogId`]: Relay log entry identifier

use uuid::Uuid;

pub type AccountId = Uuid;
pub type ApiKeyId = Uuid;
pub type RelayLogId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

/// Normalize an email address for use as a lookup key.
///
/// Accounts, OTP challenges and reset grants are all keyed by the
/// lowercased, trimmed address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
