//! API request/response models for API keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{db::models::api_keys::ApiKey, types::ApiKeyId};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ApiKeyCreate {
    pub name: String,
}

/// Creation response. This is the only place the full key value ever appears;
/// afterwards only the preview is available.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiKeyResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ApiKeyId,
    pub name: String,
    pub key: String,
    pub preview: String,
    pub created_at: DateTime<Utc>,
}

/// Listing view. Never contains the key value or its hash.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiKeyInfoResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ApiKeyId,
    pub name: String,
    pub preview: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl From<ApiKey> for ApiKeyInfoResponse {
    fn from(db: ApiKey) -> Self {
        Self {
            id: db.id,
            name: db.name,
            preview: db.preview,
            created_at: db.created_at,
            last_used_at: db.last_used_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct RevokeApiKeyQuery {
    /// Preview of the key to revoke (as shown in listings)
    pub preview: String,
}
