//! Repository types wrapping raw SQL behind typed methods.
//!
//! Each repository borrows a `&mut PgConnection`, so callers decide whether
//! an operation runs on a pool connection or inside a transaction.

pub mod accounts;
pub mod api_keys;
pub mod mail_credentials;
pub mod otp_challenges;
pub mod relay_logs;
