//! OTP challenge handlers: issue a code, verify a submission.

use axum::{extract::State, response::Json};
use chrono::Utc;
use tracing::info;

use crate::{
    AppState,
    api::models::otp::{OtpSendRequest, OtpSendResponse, OtpVerifyRequest, OtpVerifyResponse},
    db::{
        errors::DbError,
        handlers::{
            accounts::Accounts,
            otp_challenges::{OtpChallenges, PasswordResetGrants},
        },
        models::otp_challenges::{OtpKind, VerifyOutcome},
    },
    errors::{Error, Result},
    types::normalize_email,
};

/// Issue a fresh code for the given email and kind.
///
/// Re-sending replaces the pending challenge outright: new code, attempts
/// back to zero, expiry window restarted.
#[utoipa::path(
    post,
    path = "/otp/send",
    tag = "otp",
    summary = "Send OTP",
    description = "Send a one-time code to the given email address",
    responses(
        (status = 200, description = "OTP sent", body = OtpSendResponse),
        (status = 400, description = "Bad request - invalid email"),
        (status = 404, description = "No account with this email"),
        (status = 500, description = "Internal server error"),
    )
)]
#[tracing::instrument(skip_all, fields(kind = %data.kind))]
pub async fn send_otp(State(state): State<AppState>, Json(data): Json<OtpSendRequest>) -> Result<Json<OtpSendResponse>> {
    let email = normalize_email(&data.email);
    if email.is_empty() || !email.contains('@') {
        return Err(Error::BadRequest {
            message: "A valid email address is required".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;

    // Both kinds require an existing account. Signup codes additionally only
    // make sense while the email is still unverified.
    let account = Accounts::new(&mut conn)
        .get_by_email(&email)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "account".to_string(),
            id: email.clone(),
        })?;
    if data.kind == OtpKind::Signup && account.email_verified {
        return Err(Error::BadRequest {
            message: "Email is already verified".to_string(),
        });
    }

    let code = crate::crypto::generate_otp_code();
    let validity = state.config.otp.validity;
    let expires_at = Utc::now() + validity;

    OtpChallenges::new(&mut conn).issue(&email, data.kind, &code, expires_at).await?;

    state.mailer.send_otp_email(&email, data.kind, &code).await?;

    info!(kind = %data.kind, "OTP issued and sent");

    Ok(Json(OtpSendResponse {
        message: "OTP sent successfully".to_string(),
        expires_in: validity.as_secs(),
    }))
}

/// Verify a submitted code and apply the kind's side effect.
///
/// A verified signup challenge marks the account's email as verified; a
/// verified forgot-password challenge mints a single-use reset grant. Both
/// happen in the same transaction as the challenge consumption. The
/// transaction commits before a rejection is turned into an error so that
/// failed-attempt increments always persist.
#[utoipa::path(
    post,
    path = "/otp/verify",
    tag = "otp",
    summary = "Verify OTP",
    description = "Verify a one-time code for the given email address",
    responses(
        (status = 200, description = "OTP verified", body = OtpVerifyResponse),
        (status = 400, description = "Invalid or expired OTP"),
        (status = 404, description = "No pending OTP for this email"),
        (status = 429, description = "Too many failed attempts"),
        (status = 500, description = "Internal server error"),
    )
)]
#[tracing::instrument(skip_all, fields(kind = %data.kind))]
pub async fn verify_otp(State(state): State<AppState>, Json(data): Json<OtpVerifyRequest>) -> Result<Json<OtpVerifyResponse>> {
    let email = normalize_email(&data.email);

    let mut tx = state.db.begin().await.map_err(DbError::from)?;

    let outcome = OtpChallenges::new(&mut tx).verify(&email, data.kind, &data.otp).await?;

    if outcome == VerifyOutcome::Verified {
        match data.kind {
            OtpKind::Signup => {
                Accounts::new(&mut tx).mark_email_verified(&email).await?;
            }
            OtpKind::ForgotPassword => {
                let expires_at = Utc::now() + state.config.otp.reset_grant_validity;
                PasswordResetGrants::new(&mut tx).issue(&email, expires_at).await?;
            }
        }
    }

    tx.commit().await.map_err(DbError::from)?;

    if outcome != VerifyOutcome::Verified {
        return Err(Error::OtpRejected(outcome));
    }

    info!(kind = %data.kind, "OTP verified");

    Ok(Json(OtpVerifyResponse {
        message: "OTP verified successfully".to_string(),
    }))
}
