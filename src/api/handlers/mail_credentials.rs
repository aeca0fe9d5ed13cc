//! Handlers for per-account relay (SMTP) credentials.

use axum::{extract::State, response::Json};
use tracing::info;

use crate::{
    AppState,
    api::models::{
        auth::MessageResponse,
        mail_credentials::{MailCredentialsResponse, MailCredentialsUpdate, PASSWORD_MASK},
    },
    auth::resolver::CurrentAccount,
    db::{
        errors::DbError,
        handlers::mail_credentials::MailCredentialsRepo,
        models::mail_credentials::MailCredentialsUpsertDBRequest,
    },
    errors::{Error, Result},
    types::abbrev_uuid,
};

/// Return the stored relay credentials for the authenticated account.
///
/// The username is decrypted for display; the password field always carries
/// the mask, the plaintext never leaves the send path.
#[utoipa::path(
    get,
    path = "/smtp",
    tag = "smtp",
    summary = "Get SMTP settings",
    description = "Get the authenticated account's relay credentials. The password is masked.",
    responses(
        (status = 200, description = "Stored relay credentials", body = MailCredentialsResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "No credentials configured"),
        (status = 500, description = "Internal server error"),
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip_all, fields(account_id = %abbrev_uuid(&identity.account_id)))]
pub async fn get_mail_credentials(
    State(state): State<AppState>,
    CurrentAccount(identity): CurrentAccount,
) -> Result<Json<MailCredentialsResponse>> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let credentials = MailCredentialsRepo::new(&mut conn)
        .get(identity.account_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "SMTP credentials".to_string(),
            id: abbrev_uuid(&identity.account_id),
        })?;

    let username = state.cipher.decrypt(&credentials.username_encrypted)?;

    Ok(Json(MailCredentialsResponse {
        host: credentials.host,
        port: credentials.port as u16,
        username,
        password: PASSWORD_MASK.to_string(),
        use_tls: credentials.use_tls,
        updated_at: credentials.updated_at,
    }))
}

/// Store or replace the relay credentials for the authenticated account.
#[utoipa::path(
    put,
    path = "/smtp",
    tag = "smtp",
    summary = "Save SMTP settings",
    description = "Store or replace the authenticated account's relay credentials. Username and password are encrypted at rest.",
    responses(
        (status = 200, description = "Credentials saved", body = MessageResponse),
        (status = 400, description = "Bad request - missing fields"),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Internal server error"),
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip_all, fields(account_id = %abbrev_uuid(&identity.account_id)))]
pub async fn put_mail_credentials(
    State(state): State<AppState>,
    CurrentAccount(identity): CurrentAccount,
    Json(data): Json<MailCredentialsUpdate>,
) -> Result<Json<MessageResponse>> {
    if data.host.trim().is_empty() || data.username.is_empty() || data.password.is_empty() {
        return Err(Error::BadRequest {
            message: "Host, username and password are required".to_string(),
        });
    }

    let username_encrypted = state.cipher.encrypt(&data.username)?;
    let password_encrypted = state.cipher.encrypt(&data.password)?;

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    MailCredentialsRepo::new(&mut conn)
        .upsert(&MailCredentialsUpsertDBRequest {
            account_id: identity.account_id,
            host: data.host.trim().to_string(),
            port: i32::from(data.port),
            username_encrypted,
            password_encrypted,
            use_tls: data.use_tls,
        })
        .await?;

    info!("Relay credentials saved");

    Ok(Json(MessageResponse {
        message: "SMTP credentials saved successfully".to_string(),
    }))
}
