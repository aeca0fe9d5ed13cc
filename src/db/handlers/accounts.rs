//! Database repository for accounts.

use sqlx::PgConnection;
use tracing::instrument;

use crate::db::{
    errors::Result,
    models::accounts::{Account, AccountCreateDBRequest},
};

/// Accounts are the root entity: created on signup, mutated only through the
/// verified OTP flows (email_verified flip, password replacement), never
/// deleted here.
pub struct Accounts<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Accounts<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(username = %request.username), err)]
    pub async fn create(&mut self, request: &AccountCreateDBRequest) -> Result<Account> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, password_hash, email_verified, created_at, password_changed_at
            "#,
        )
        .bind(&request.username)
        .bind(&request.email)
        .bind(&request.password_hash)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(account)
    }

    /// Lookup by normalized email address.
    #[instrument(skip(self, email), err)]
    pub async fn get_by_email(&mut self, email: &str) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT id, username, email, password_hash, email_verified, created_at, password_changed_at FROM accounts WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(account)
    }

    /// Flip `email_verified` after a verified signup challenge. Returns
    /// whether a row was updated.
    #[instrument(skip(self, email), err)]
    pub async fn mark_email_verified(&mut self, email: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE accounts SET email_verified = TRUE WHERE email = $1")
            .bind(email)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Replace the password hash after a consumed reset grant. Stamps
    /// `password_changed_at`. Returns whether a row was updated.
    #[instrument(skip(self, email, password_hash), err)]
    pub async fn replace_password(&mut self, email: &str, password_hash: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET password_hash = $2, password_changed_at = NOW()
            WHERE email = $1
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
