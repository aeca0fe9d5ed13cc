//! API key lifecycle handlers.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use tracing::info;

use crate::{
    AppState,
    api::models::{
        api_keys::{ApiKeyCreate, ApiKeyInfoResponse, ApiKeyResponse, RevokeApiKeyQuery},
        auth::MessageResponse,
    },
    auth::resolver::CurrentAccount,
    crypto::{api_key_preview, generate_api_key, hash_api_key},
    db::{errors::DbError, handlers::api_keys::ApiKeys, models::api_keys::ApiKeyCreateDBRequest},
    errors::{Error, Result},
    types::abbrev_uuid,
};

/// Mint a new key for the authenticated account.
///
/// The response is the only place the full key value ever appears. Only the
/// SHA-256 hash and a display preview are stored.
#[utoipa::path(
    post,
    path = "/api-keys",
    tag = "api-keys",
    summary = "Create API key",
    description = "Create a new API key for the authenticated account. The full key is returned once and never again.",
    responses(
        (status = 201, description = "API key created", body = ApiKeyResponse),
        (status = 400, description = "Bad request - invalid name or key limit reached"),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Internal server error"),
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip_all, fields(account_id = %abbrev_uuid(&identity.account_id)))]
pub async fn create_api_key(
    State(state): State<AppState>,
    CurrentAccount(identity): CurrentAccount,
    Json(data): Json<ApiKeyCreate>,
) -> Result<(StatusCode, Json<ApiKeyResponse>)> {
    let name = data.name.trim();
    if name.is_empty() {
        return Err(Error::BadRequest {
            message: "API key name cannot be empty".to_string(),
        });
    }

    let key = generate_api_key();
    let key_hash = hash_api_key(&key);
    let preview = api_key_preview(&key);
    let max_keys = state.config.api_keys.max_per_account;

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let api_key = ApiKeys::new(&mut conn)
        .create_within_quota(
            &ApiKeyCreateDBRequest {
                account_id: identity.account_id,
                name: name.to_string(),
                key_hash,
                preview,
            },
            max_keys,
        )
        .await?
        .ok_or(Error::QuotaExceeded {
            resource: "API keys".to_string(),
            limit: max_keys,
        })?;

    info!(key_id = %abbrev_uuid(&api_key.id), "API key created");

    Ok((
        StatusCode::CREATED,
        Json(ApiKeyResponse {
            id: api_key.id,
            name: api_key.name,
            key,
            preview: api_key.preview,
            created_at: api_key.created_at,
        }),
    ))
}

/// List the authenticated account's keys, newest first.
#[utoipa::path(
    get,
    path = "/api-keys",
    tag = "api-keys",
    summary = "List API keys",
    description = "List the authenticated account's API keys. Key values are never returned, only previews.",
    responses(
        (status = 200, description = "List of API keys", body = Vec<ApiKeyInfoResponse>),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Internal server error"),
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip_all, fields(account_id = %abbrev_uuid(&identity.account_id)))]
pub async fn list_api_keys(
    State(state): State<AppState>,
    CurrentAccount(identity): CurrentAccount,
) -> Result<Json<Vec<ApiKeyInfoResponse>>> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let keys = ApiKeys::new(&mut conn).list_for_account(identity.account_id).await?;

    Ok(Json(keys.into_iter().map(ApiKeyInfoResponse::from).collect()))
}

/// Revoke a key by its preview.
#[utoipa::path(
    delete,
    path = "/api-keys",
    tag = "api-keys",
    summary = "Revoke API key",
    description = "Revoke one of the authenticated account's API keys, identified by its preview",
    params(RevokeApiKeyQuery),
    responses(
        (status = 200, description = "API key revoked", body = MessageResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "No key with this preview"),
        (status = 500, description = "Internal server error"),
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip_all, fields(account_id = %abbrev_uuid(&identity.account_id)))]
pub async fn revoke_api_key(
    State(state): State<AppState>,
    CurrentAccount(identity): CurrentAccount,
    Query(query): Query<RevokeApiKeyQuery>,
) -> Result<Json<MessageResponse>> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let revoked = ApiKeys::new(&mut conn).revoke_by_preview(identity.account_id, &query.preview).await?;

    if !revoked {
        return Err(Error::NotFound {
            resource: "API key".to_string(),
            id: query.preview,
        });
    }

    info!("API key revoked");

    Ok(Json(MessageResponse {
        message: "API key revoked successfully".to_string(),
    }))
}
