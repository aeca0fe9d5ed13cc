//! API request/response models for signup, login, and password reset.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::models::accounts::AccountResponse;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Signup response. No session token is issued until the email is verified.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SignupResponse {
    pub message: String,
    pub account: AccountResponse,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub account: AccountResponse,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub new_password: String,
}

/// Generic acknowledgement payload.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}
