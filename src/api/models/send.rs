//! API request/response models for the relay send endpoint.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AttachmentPayload {
    pub filename: String,
    /// Base64-encoded file content
    pub content: String,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SendEmailRequest {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: Option<String>,
    pub html: Option<String>,
    #[serde(default)]
    pub attachments: Vec<AttachmentPayload>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SendEmailResponse {
    pub message: String,
    pub message_id: String,
}
