//! API request/response models for one-time password challenges.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::otp_challenges::OtpKind;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OtpSendRequest {
    pub email: String,
    #[serde(rename = "type")]
    pub kind: OtpKind,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OtpSendResponse {
    pub message: String,
    /// Seconds until the issued code expires
    pub expires_in: u64,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OtpVerifyRequest {
    pub email: String,
    #[serde(rename = "type")]
    pub kind: OtpKind,
    pub otp: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OtpVerifyResponse {
    pub message: String,
}
