//! # mailship: Hosted Email Relay
//!
//! `mailship` is a hosted email-relay service: users sign up, prove ownership of
//! their email address with a one-time passcode, attach their own outbound SMTP
//! credentials (stored encrypted at rest), and then relay mail through a single
//! API using either a session token or a programmatic API key.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for the
//! HTTP layer and uses PostgreSQL for all persistence.
//!
//! The **API layer** ([`api`]) exposes the REST surface under `/api/v1`:
//! account signup/login, OTP issuance and verification, API key lifecycle,
//! per-account SMTP credential storage, and the relay send endpoint.
//!
//! The **authentication layer** ([`auth`]) resolves a single
//! `Authorization: Bearer` header into an account, accepting either shape of
//! credential: API keys (recognized by their `ms_` prefix, checked against
//! stored SHA-256 hashes) or HS256 session tokens issued at login. All
//! credential failures collapse into one uniform 401.
//!
//! The **database layer** ([`db`]) uses the repository pattern: each entity
//! (accounts, API keys, OTP challenges, relay credentials, relay logs) has a
//! repository over `&mut PgConnection`, so handlers control transaction
//! boundaries. The OTP verify path locks its row with `SELECT ... FOR UPDATE`
//! to serialize concurrent submissions.
//!
//! A **background purge task** runs alongside the HTTP server and periodically
//! drops expired OTP challenges, expired password-reset grants, and relay logs
//! past their retention window. Verification never depends on it; expiry is
//! always assessed at verify time.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use mailship::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = mailship::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     mailship::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod auth;
pub mod config;
pub mod crypto;
pub mod db;
pub mod email;
pub mod errors;
mod openapi;
pub mod telemetry;
mod types;

#[cfg(test)]
pub mod test_utils;

use crate::{
    db::handlers::{otp_challenges::{OtpChallenges, PasswordResetGrants}, relay_logs::RelayLogs},
    email::EmailService,
    openapi::ApiDoc,
};
use axum::{
    Router,
    routing::{get, post},
};
use bon::Builder;
use chrono::Utc;
pub use config::Config;
use crypto::SecretCipher;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument, warn};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use types::{AccountId, ApiKeyId, RelayLogId};

/// Application state shared across all request handlers.
///
/// - `db`: PostgreSQL connection pool
/// - `config`: Application configuration loaded from file/environment
/// - `cipher`: At-rest cipher for stored relay credentials, keyed once at startup
/// - `mailer`: Transport for the service's own mail (OTP codes)
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    pub cipher: Arc<SecretCipher>,
    pub mailer: Arc<EmailService>,
}

/// Get the mailship database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Build the application router with all endpoints and middleware.
///
/// All API routes live under `/api/v1`; interactive documentation is served
/// at `/docs`.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/auth/signup", post(api::handlers::auth::signup))
        .route("/auth/login", post(api::handlers::auth::login))
        .route("/auth/reset-password", post(api::handlers::auth::reset_password))
        .route("/otp/send", post(api::handlers::otp::send_otp))
        .route("/otp/verify", post(api::handlers::otp::verify_otp))
        .route(
            "/api-keys",
            get(api::handlers::api_keys::list_api_keys)
                .post(api::handlers::api_keys::create_api_key)
                .delete(api::handlers::api_keys::revoke_api_key),
        )
        .route(
            "/smtp",
            get(api::handlers::mail_credentials::get_mail_credentials).put(api::handlers::mail_credentials::put_mail_credentials),
        )
        .route("/send", post(api::handlers::send::send_email))
        .route("/health", get(api::handlers::health::health))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// Periodically drop rows whose lifetime has ended: expired OTP challenges,
/// expired reset grants, and relay logs past the retention window.
///
/// Housekeeping only. Challenge expiry is assessed at verify time, so nothing
/// is incorrect between runs, the rows are just still on disk.
async fn run_purge_task(pool: PgPool, config: Config, shutdown: tokio_util::sync::CancellationToken) {
    let mut interval = tokio::time::interval(config.otp.purge_interval);
    // The first tick fires immediately; that is fine, purging at startup is harmless.
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.cancelled() => {
                debug!("Purge task shutting down");
                return;
            }
        }

        if let Err(e) = purge_once(&pool, &config).await {
            warn!("Periodic purge failed: {:#}", e);
        }
    }
}

async fn purge_once(pool: &PgPool, config: &Config) -> anyhow::Result<()> {
    let mut conn = pool.acquire().await?;

    let challenges = OtpChallenges::new(&mut conn).purge_expired().await?;
    let grants = PasswordResetGrants::new(&mut conn).purge_expired().await?;

    let cutoff = Utc::now() - config.retention.relay_logs;
    let logs = RelayLogs::new(&mut conn).purge_older_than(cutoff).await?;

    if challenges + grants + logs > 0 {
        info!(challenges, grants, logs, "Purged expired rows");
    }

    Ok(())
}

/// Main application struct that owns all resources and lifecycle.
///
/// 1. **Create**: [`Application::new`] connects to the database, runs
///    migrations, derives the credential cipher key, and starts the purge task
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and handles
///    requests until the shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
    purge_handle: tokio::task::JoinHandle<()>,
    shutdown_token: tokio_util::sync::CancellationToken,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting relay service");

        let pool_settings = &config.pool;
        let mut pool_options = sqlx::postgres::PgPoolOptions::new()
            .max_connections(pool_settings.max_connections)
            .min_connections(pool_settings.min_connections)
            .acquire_timeout(std::time::Duration::from_secs(pool_settings.acquire_timeout_secs));
        if pool_settings.idle_timeout_secs > 0 {
            pool_options = pool_options.idle_timeout(std::time::Duration::from_secs(pool_settings.idle_timeout_secs));
        }
        if pool_settings.max_lifetime_secs > 0 {
            pool_options = pool_options.max_lifetime(std::time::Duration::from_secs(pool_settings.max_lifetime_secs));
        }

        let pool = pool_options.connect(&config.database_url).await?;
        migrator().run(&pool).await?;

        let passphrase = config
            .encryption_passphrase
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("encryption_passphrase is not configured"))?;
        let cipher = Arc::new(SecretCipher::new(passphrase)?);

        let mailer = Arc::new(EmailService::new(&config)?);

        let shutdown_token = tokio_util::sync::CancellationToken::new();
        let purge_handle = tokio::spawn(run_purge_task(pool.clone(), config.clone(), shutdown_token.clone()));

        let state = AppState::builder()
            .db(pool.clone())
            .config(config.clone())
            .cipher(cipher)
            .mailer(mailer)
            .build();

        let router = build_router(state);

        Ok(Self {
            router,
            config,
            pool,
            purge_handle,
            shutdown_token,
        })
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Relay service listening on http://{}, docs at http://localhost:{}/docs",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        // Stop the purge task and wait for it to finish
        self.shutdown_token.cancel();
        let _ = self.purge_handle.await;

        info!("Closing database connections...");
        self.pool.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
