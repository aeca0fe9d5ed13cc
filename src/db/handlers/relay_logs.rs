//! Database repository for relay delivery logs.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use tracing::instrument;

use crate::{
    db::{
        errors::Result,
        models::relay_logs::{RelayLog, RelayLogCreateDBRequest},
    },
    types::abbrev_uuid,
};

pub struct RelayLogs<'c> {
    db: &'c mut PgConnection,
}

impl<'c> RelayLogs<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(account_id = %abbrev_uuid(&request.account_id)), err)]
    pub async fn create(&mut self, request: &RelayLogCreateDBRequest) -> Result<RelayLog> {
        let log = sqlx::query_as::<_, RelayLog>(
            r#"
            INSERT INTO relay_logs (account_id, mail_from, mail_to, subject, has_attachments, message_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, account_id, mail_from, mail_to, subject, has_attachments, message_id, sent_at
            "#,
        )
        .bind(request.account_id)
        .bind(&request.mail_from)
        .bind(&request.mail_to)
        .bind(&request.subject)
        .bind(request.has_attachments)
        .bind(&request.message_id)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(log)
    }

    /// Drop log rows older than `cutoff`.
    #[instrument(skip(self), err)]
    pub async fn purge_older_than(&mut self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM relay_logs WHERE sent_at < $1")
            .bind(cutoff)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected())
    }
}
