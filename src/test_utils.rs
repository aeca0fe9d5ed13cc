//! Shared helpers for unit tests.

use std::sync::Arc;

use crate::{
    AppState, Config,
    config::EmailTransportConfig,
    crypto::SecretCipher,
    db::{
        handlers::accounts::Accounts,
        models::accounts::{Account, AccountCreateDBRequest},
    },
    email::EmailService,
};
use sqlx::PgPool;
use uuid::Uuid;

fn state_from(pool: PgPool, mut config: Config) -> AppState {
    let emails_dir = std::env::temp_dir().join("mailship-test-emails");
    config.email.transport = EmailTransportConfig::File {
        path: emails_dir.to_string_lossy().into_owned(),
    };

    let cipher = Arc::new(SecretCipher::new("test-passphrase").expect("test cipher"));
    let mailer = Arc::new(EmailService::new(&config).expect("test mailer"));

    AppState::builder().db(pool).config(config).cipher(cipher).mailer(mailer).build()
}

/// Build an [`AppState`] around a lazy pool that never actually connects.
///
/// Suitable for tests that exercise request parsing, token verification, and
/// other logic that must not reach the database; any code path that does
/// acquire a connection will error rather than hang.
pub fn lazy_state_with_config(config: Config) -> AppState {
    let pool = PgPool::connect_lazy("postgres://localhost:1/mailship_test").expect("lazy pool");
    state_from(pool, config)
}

/// Build an [`AppState`] around a live pool, for `#[sqlx::test]` tests.
pub fn state_with_pool(pool: PgPool) -> AppState {
    let config = Config {
        secret_key: Some("test-secret-key-for-testing-only".to_string()),
        ..Default::default()
    };
    state_from(pool, config)
}

/// Insert an account with a unique username and email.
pub async fn create_test_account(pool: &PgPool) -> Account {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let mut accounts = Accounts::new(&mut conn);

    let username = format!("testaccount_{}", Uuid::new_v4().simple());
    let email = format!("{username}@example.com");

    accounts
        .create(&AccountCreateDBRequest {
            username,
            email,
            password_hash: "unused".to_string(),
        })
        .await
        .expect("Failed to create test account")
}
