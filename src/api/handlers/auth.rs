//! Signup, login, and password reset handlers.

use axum::{extract::State, http::StatusCode, response::Json};
use chrono::Utc;
use tracing::info;

use crate::{
    AppState,
    api::models::{
        accounts::AccountResponse,
        auth::{LoginRequest, LoginResponse, MessageResponse, ResetPasswordRequest, SignupRequest, SignupResponse},
    },
    auth::{password, token},
    crypto::generate_otp_code,
    db::{
        errors::DbError,
        handlers::{
            accounts::Accounts,
            otp_challenges::{OtpChallenges, PasswordResetGrants},
        },
        models::{accounts::AccountCreateDBRequest, otp_challenges::OtpKind},
    },
    errors::{Error, Result},
    types::normalize_email,
};

fn check_password_policy(password: &str, state: &AppState) -> Result<()> {
    let policy = &state.config.auth.password;
    if password.len() < policy.min_length {
        return Err(Error::BadRequest {
            message: format!("Password must be at least {} characters", policy.min_length),
        });
    }
    if password.len() > policy.max_length {
        return Err(Error::BadRequest {
            message: format!("Password must be at most {} characters", policy.max_length),
        });
    }
    Ok(())
}

/// Create an account and send the email verification code.
///
/// No session token is issued here: the account cannot log in until the
/// signup challenge is verified.
#[utoipa::path(
    post,
    path = "/auth/signup",
    tag = "auth",
    summary = "Create account",
    description = "Create an account and send a verification code to the given email address",
    responses(
        (status = 201, description = "Account created, verification code sent", body = SignupResponse),
        (status = 400, description = "Bad request - invalid signup data"),
        (status = 409, description = "Email or username already taken"),
        (status = 500, description = "Internal server error"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn signup(State(state): State<AppState>, Json(data): Json<SignupRequest>) -> Result<(StatusCode, Json<SignupResponse>)> {
    let username = data.username.trim();
    if username.is_empty() {
        return Err(Error::BadRequest {
            message: "Username cannot be empty".to_string(),
        });
    }
    let email = normalize_email(&data.email);
    if email.is_empty() || !email.contains('@') {
        return Err(Error::BadRequest {
            message: "A valid email address is required".to_string(),
        });
    }
    check_password_policy(&data.password, &state)?;

    let password_hash = password::hash_string_with_params(&data.password, Some(state.config.auth.password.argon2_params()))?;

    let code = generate_otp_code();
    let expires_at = Utc::now() + state.config.otp.validity;

    let mut tx = state.db.begin().await.map_err(DbError::from)?;
    let account = Accounts::new(&mut tx)
        .create(&AccountCreateDBRequest {
            username: username.to_string(),
            email: email.clone(),
            password_hash,
        })
        .await?;
    OtpChallenges::new(&mut tx).issue(&email, OtpKind::Signup, &code, expires_at).await?;
    tx.commit().await.map_err(DbError::from)?;

    // Delivery happens after commit; a resend is always possible via /otp/send
    state.mailer.send_otp_email(&email, OtpKind::Signup, &code).await?;

    info!(account_id = %account.id, "Account created, verification code sent");

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "Account created successfully. Check your inbox for the verification code.".to_string(),
            account: AccountResponse::from(account),
        }),
    ))
}

/// Exchange email and password for a session token.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    summary = "Log in",
    description = "Exchange email and password for a session token",
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid email or password"),
        (status = 403, description = "Email not verified"),
        (status = 500, description = "Internal server error"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(data): Json<LoginRequest>) -> Result<Json<LoginResponse>> {
    let email = normalize_email(&data.email);

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let account = Accounts::new(&mut conn)
        .get_by_email(&email)
        .await?
        .ok_or_else(|| Error::Unauthenticated {
            message: Some("Invalid email or password".to_string()),
        })?;

    if !account.email_verified {
        return Err(Error::Forbidden {
            message: "Please verify your email before logging in. Check your inbox for the OTP.".to_string(),
        });
    }

    if !password::verify_string(&data.password, &account.password_hash)? {
        return Err(Error::Unauthenticated {
            message: Some("Invalid email or password".to_string()),
        });
    }

    let token = token::create_session_token(&account, &state.config)?;

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        token,
        account: AccountResponse::from(account),
    }))
}

/// Replace the password for an account that holds a live reset grant.
///
/// The grant is minted by a verified forgot-password challenge and consumed
/// here atomically, so one verified code authorizes exactly one reset.
#[utoipa::path(
    post,
    path = "/auth/reset-password",
    tag = "auth",
    summary = "Reset password",
    description = "Replace the account password after a verified forgot-password code",
    responses(
        (status = 200, description = "Password reset successfully", body = MessageResponse),
        (status = 400, description = "Bad request - invalid password"),
        (status = 403, description = "No live reset grant for this email"),
        (status = 404, description = "No account with this email"),
        (status = 500, description = "Internal server error"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn reset_password(State(state): State<AppState>, Json(data): Json<ResetPasswordRequest>) -> Result<Json<MessageResponse>> {
    let email = normalize_email(&data.email);
    check_password_policy(&data.new_password, &state)?;

    let password_hash = password::hash_string_with_params(&data.new_password, Some(state.config.auth.password.argon2_params()))?;

    let mut tx = state.db.begin().await.map_err(DbError::from)?;

    let authorized = PasswordResetGrants::new(&mut tx).consume(&email).await?;
    if !authorized {
        return Err(Error::Forbidden {
            message: "Password reset not authorized. Verify the reset code first.".to_string(),
        });
    }

    let updated = Accounts::new(&mut tx).replace_password(&email, &password_hash).await?;
    if !updated {
        return Err(Error::NotFound {
            resource: "account".to_string(),
            id: email,
        });
    }

    tx.commit().await.map_err(DbError::from)?;

    Ok(Json(MessageResponse {
        message: "Password reset successfully".to_string(),
    }))
}
