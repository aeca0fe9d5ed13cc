//! Request and response models for the HTTP API.

pub mod accounts;
pub mod api_keys;
pub mod auth;
pub mod mail_credentials;
pub mod otp;
pub mod send;
