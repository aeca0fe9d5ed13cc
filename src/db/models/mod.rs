//! Database record structures matching table schemas.

pub mod accounts;
pub mod api_keys;
pub mod mail_credentials;
pub mod otp_challenges;
pub mod relay_logs;
