//! Relay send handler: deliver a message through the account's own SMTP server.

use axum::{extract::State, response::Json};
use base64::Engine as _;
use tracing::info;

use crate::{
    AppState,
    api::models::send::{SendEmailRequest, SendEmailResponse},
    auth::resolver::CurrentAccount,
    db::{
        errors::DbError,
        handlers::{mail_credentials::MailCredentialsRepo, relay_logs::RelayLogs},
        models::relay_logs::RelayLogCreateDBRequest,
    },
    email::{RelayAttachment, RelayEnvelope, RelayMailer},
    errors::{Error, Result},
    types::abbrev_uuid,
};

/// Relay one message through the authenticated account's stored SMTP
/// credentials.
///
/// The stored password is decrypted only here and lives exactly as long as
/// the transport. A decryption failure aborts the send; a half-garbled
/// credential must never reach a remote server. Only redacted envelope
/// metadata is logged.
#[utoipa::path(
    post,
    path = "/send",
    tag = "send",
    summary = "Send email",
    description = "Relay an email through the authenticated account's configured SMTP server",
    responses(
        (status = 200, description = "Email sent", body = SendEmailResponse),
        (status = 400, description = "Bad request - missing fields or SMTP credentials not configured"),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Internal server error"),
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip_all, fields(account_id = %abbrev_uuid(&identity.account_id)))]
pub async fn send_email(
    State(state): State<AppState>,
    CurrentAccount(identity): CurrentAccount,
    Json(data): Json<SendEmailRequest>,
) -> Result<Json<SendEmailResponse>> {
    if data.from.trim().is_empty() || data.to.trim().is_empty() || data.subject.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "From, to and subject are required".to_string(),
        });
    }
    if data.text.is_none() && data.html.is_none() {
        return Err(Error::BadRequest {
            message: "Either text or html content is required".to_string(),
        });
    }

    let mut attachments = Vec::with_capacity(data.attachments.len());
    for payload in &data.attachments {
        let content = base64::engine::general_purpose::STANDARD
            .decode(&payload.content)
            .map_err(|_| Error::BadRequest {
                message: format!("Attachment '{}' content is not valid base64", payload.filename),
            })?;
        attachments.push(RelayAttachment {
            filename: payload.filename.clone(),
            content,
            content_type: payload.content_type.clone(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let credentials = MailCredentialsRepo::new(&mut conn)
        .get(identity.account_id)
        .await?
        .ok_or_else(|| Error::BadRequest {
            message: "SMTP credentials not configured. Please set up your SMTP settings first.".to_string(),
        })?;

    let username = state.cipher.decrypt(&credentials.username_encrypted)?;
    let password = state.cipher.decrypt(&credentials.password_encrypted)?;

    let mailer = RelayMailer::connect(
        &credentials.host,
        credentials.port as u16,
        username,
        password,
        credentials.use_tls,
    )?;

    let envelope = RelayEnvelope {
        from: data.from,
        to: data.to,
        subject: data.subject,
        text: data.text,
        html: data.html,
        attachments,
    };

    let message_id = mailer.send(&envelope).await?;

    let log = RelayLogs::new(&mut conn)
        .create(&RelayLogCreateDBRequest {
            account_id: identity.account_id,
            mail_from: envelope.from,
            mail_to: envelope.to,
            subject: envelope.subject,
            has_attachments: !envelope.attachments.is_empty(),
            message_id: Some(message_id.clone()),
        })
        .await?;

    info!(log_id = %abbrev_uuid(&log.id), "Message relayed");

    Ok(Json(SendEmailResponse {
        message: "Email sent successfully".to_string(),
        message_id,
    }))
}
