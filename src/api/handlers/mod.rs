//! HTTP request handlers for all API endpoints.
//!
//! - [`auth`]: Signup, login, and password reset
//! - [`otp`]: One-time code issuance and verification
//! - [`api_keys`]: API key creation, listing, and revocation
//! - [`mail_credentials`]: Per-account relay (SMTP) credentials
//! - [`send`]: Relay delivery through the account's own SMTP server
//! - [`health`]: Liveness probe
//!
//! Account-scoped handlers authenticate through the
//! [`crate::auth::resolver::CurrentAccount`] extractor, which accepts either
//! an API key or a session token. Handlers return [`crate::errors::Error`],
//! which converts to the appropriate HTTP status code and user-safe message.

pub mod api_keys;
pub mod auth;
pub mod health;
pub mod mail_credentials;
pub mod otp;
pub mod send;
