//! Database repository for per-account SMTP relay credentials.
//!
//! Username and password columns hold encrypted blobs produced by
//! [`crate::crypto::SecretCipher`]; plaintext never reaches this layer.

use sqlx::PgConnection;
use tracing::instrument;

use crate::{
    db::{
        errors::Result,
        models::mail_credentials::{MailCredentials, MailCredentialsUpsertDBRequest},
    },
    types::{AccountId, abbrev_uuid},
};

pub struct MailCredentialsRepo<'c> {
    db: &'c mut PgConnection,
}

impl<'c> MailCredentialsRepo<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Insert or replace the account's relay credentials in one statement.
    #[instrument(skip(self, request), fields(account_id = %abbrev_uuid(&request.account_id), host = %request.host), err)]
    pub async fn upsert(&mut self, request: &MailCredentialsUpsertDBRequest) -> Result<MailCredentials> {
        let credentials = sqlx::query_as::<_, MailCredentials>(
            r#"
            INSERT INTO mail_credentials (account_id, host, port, username_encrypted, password_encrypted, use_tls)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (account_id) DO UPDATE
            SET host = EXCLUDED.host,
                port = EXCLUDED.port,
                username_encrypted = EXCLUDED.username_encrypted,
                password_encrypted = EXCLUDED.password_encrypted,
                use_tls = EXCLUDED.use_tls,
                updated_at = NOW()
            RETURNING account_id, host, port, username_encrypted, password_encrypted, use_tls, updated_at
            "#,
        )
        .bind(request.account_id)
        .bind(&request.host)
        .bind(request.port)
        .bind(&request.username_encrypted)
        .bind(&request.password_encrypted)
        .bind(request.use_tls)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(credentials)
    }

    #[instrument(skip(self), fields(account_id = %abbrev_uuid(&account_id)), err)]
    pub async fn get(&mut self, account_id: AccountId) -> Result<Option<MailCredentials>> {
        let credentials = sqlx::query_as::<_, MailCredentials>(
            r#"
            SELECT account_id, host, port, username_encrypted, password_encrypted, use_tls, updated_at
            FROM mail_credentials
            WHERE account_id = $1
            "#,
        )
        .bind(account_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(credentials)
    }
}
