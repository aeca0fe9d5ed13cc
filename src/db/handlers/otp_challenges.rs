//! Database repository for OTP challenges and password-reset grants.
//!
//! The verify path is the hot spot for correctness: the pending row is
//! locked with `SELECT ... FOR UPDATE` inside the caller's transaction, the
//! outcome is decided by the pure [`OtpChallenge::assess`] function, and the
//! matching mutation (delete or single-statement increment) is applied under
//! that lock. Two concurrent verifies for the same challenge therefore
//! serialize, and every recorded failure is charged exactly once.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use tracing::instrument;

use crate::db::{
    errors::Result,
    models::otp_challenges::{OtpChallenge, OtpKind, VerifyOutcome},
};

pub struct OtpChallenges<'c> {
    db: &'c mut PgConnection,
}

impl<'c> OtpChallenges<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Issue (or re-issue) a challenge. The upsert atomically replaces any
    /// pending challenge for the same (email, kind): attempts reset to 0 and
    /// the expiry window restarts.
    #[instrument(skip(self, email, code), fields(kind = %kind), err)]
    pub async fn issue(&mut self, email: &str, kind: OtpKind, code: &str, expires_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO otp_challenges (email, kind, code, attempts, created_at, expires_at)
            VALUES ($1, $2, $3, 0, NOW(), $4)
            ON CONFLICT (email, kind) DO UPDATE
            SET code = EXCLUDED.code,
                attempts = 0,
                created_at = EXCLUDED.created_at,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(email)
        .bind(kind.as_str())
        .bind(code)
        .bind(expires_at)
        .execute(&mut *self.db)
        .await?;

        Ok(())
    }

    /// Run the verification state machine for one submission.
    ///
    /// Must be called inside a transaction: the row lock taken here is what
    /// makes the decide-then-mutate sequence atomic. Terminal outcomes
    /// (Verified, Expired, TooManyAttempts) delete the row; an
    /// expired-but-unpurged row is already treated as absent by the
    /// assessment, independent of the background purge.
    #[instrument(skip(self, email, submitted_code), fields(kind = %kind), err)]
    pub async fn verify(&mut self, email: &str, kind: OtpKind, submitted_code: &str) -> Result<VerifyOutcome> {
        let challenge = sqlx::query_as::<_, OtpChallenge>(
            r#"
            SELECT email, kind, code, attempts, created_at, expires_at
            FROM otp_challenges
            WHERE email = $1 AND kind = $2
            FOR UPDATE
            "#,
        )
        .bind(email)
        .bind(kind.as_str())
        .fetch_optional(&mut *self.db)
        .await?;

        let Some(challenge) = challenge else {
            return Ok(VerifyOutcome::NotFound);
        };

        let outcome = challenge.assess(submitted_code, Utc::now());
        match outcome {
            VerifyOutcome::Verified | VerifyOutcome::Expired | VerifyOutcome::TooManyAttempts => {
                self.delete(email, kind).await?;
            }
            VerifyOutcome::Mismatch => {
                sqlx::query("UPDATE otp_challenges SET attempts = attempts + 1 WHERE email = $1 AND kind = $2")
                    .bind(email)
                    .bind(kind.as_str())
                    .execute(&mut *self.db)
                    .await?;
            }
            VerifyOutcome::NotFound => {}
        }

        Ok(outcome)
    }

    #[instrument(skip(self, email), fields(kind = %kind), err)]
    async fn delete(&mut self, email: &str, kind: OtpKind) -> Result<()> {
        sqlx::query("DELETE FROM otp_challenges WHERE email = $1 AND kind = $2")
            .bind(email)
            .bind(kind.as_str())
            .execute(&mut *self.db)
            .await?;

        Ok(())
    }

    /// Best-effort housekeeping for rows past their expiry. Correctness does
    /// not depend on this; verify-time assessment is authoritative.
    #[instrument(skip(self), err)]
    pub async fn purge_expired(&mut self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM otp_challenges WHERE expires_at < NOW()")
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected())
    }
}

/// Single-use markers minted by a verified forgot-password challenge and
/// consumed by exactly one password replacement.
pub struct PasswordResetGrants<'c> {
    db: &'c mut PgConnection,
}

impl<'c> PasswordResetGrants<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Mint a grant for `email`, replacing any earlier one.
    #[instrument(skip(self, email), err)]
    pub async fn issue(&mut self, email: &str, expires_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO password_reset_grants (email, created_at, expires_at)
            VALUES ($1, NOW(), $2)
            ON CONFLICT (email) DO UPDATE
            SET created_at = EXCLUDED.created_at,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(email)
        .bind(expires_at)
        .execute(&mut *self.db)
        .await?;

        Ok(())
    }

    /// Atomically consume the grant for `email`. Returns false when there is
    /// no live grant - a second reset without a fresh OTP cycle lands here.
    #[instrument(skip(self, email), err)]
    pub async fn consume(&mut self, email: &str) -> Result<bool> {
        let consumed = sqlx::query_scalar::<_, String>(
            "DELETE FROM password_reset_grants WHERE email = $1 AND expires_at > NOW() RETURNING email",
        )
        .bind(email)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(consumed.is_some())
    }

    #[instrument(skip(self), err)]
    pub async fn purge_expired(&mut self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM password_reset_grants WHERE expires_at < NOW()")
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use sqlx::PgPool;

    #[sqlx::test]
    async fn test_verified_challenge_is_single_use(pool: PgPool) {
        let mut tx = pool.begin().await.unwrap();
        let mut repo = OtpChallenges::new(&mut tx);
        let expires_at = Utc::now() + Duration::minutes(10);

        repo.issue("once@example.com", OtpKind::Signup, "1234", expires_at).await.unwrap();

        let first = repo.verify("once@example.com", OtpKind::Signup, "1234").await.unwrap();
        assert_eq!(first, VerifyOutcome::Verified);

        // The consumed row is gone; replaying the same code finds nothing.
        let second = repo.verify("once@example.com", OtpKind::Signup, "1234").await.unwrap();
        assert_eq!(second, VerifyOutcome::NotFound);

        tx.commit().await.unwrap();
    }

    #[sqlx::test]
    async fn test_exhausted_challenge_is_burned(pool: PgPool) {
        let mut tx = pool.begin().await.unwrap();
        let mut repo = OtpChallenges::new(&mut tx);
        let expires_at = Utc::now() + Duration::minutes(10);

        repo.issue("burn@example.com", OtpKind::ForgotPassword, "1234", expires_at).await.unwrap();

        for _ in 0..3 {
            let outcome = repo.verify("burn@example.com", OtpKind::ForgotPassword, "0000").await.unwrap();
            assert_eq!(outcome, VerifyOutcome::Mismatch);
        }

        // Attempt limit reached; even the correct code is rejected and the
        // row deleted, so a further submission sees no challenge at all.
        let fourth = repo.verify("burn@example.com", OtpKind::ForgotPassword, "1234").await.unwrap();
        assert_eq!(fourth, VerifyOutcome::TooManyAttempts);

        let fifth = repo.verify("burn@example.com", OtpKind::ForgotPassword, "1234").await.unwrap();
        assert_eq!(fifth, VerifyOutcome::NotFound);

        tx.commit().await.unwrap();
    }

    #[sqlx::test]
    async fn test_reissue_replaces_code_and_resets_attempts(pool: PgPool) {
        let mut tx = pool.begin().await.unwrap();
        let mut repo = OtpChallenges::new(&mut tx);
        let expires_at = Utc::now() + Duration::minutes(10);

        repo.issue("again@example.com", OtpKind::Signup, "1111", expires_at).await.unwrap();
        for _ in 0..2 {
            let outcome = repo.verify("again@example.com", OtpKind::Signup, "0000").await.unwrap();
            assert_eq!(outcome, VerifyOutcome::Mismatch);
        }

        repo.issue("again@example.com", OtpKind::Signup, "2222", expires_at).await.unwrap();

        // The old code died with the re-issue and the fresh one verifies.
        let stale = repo.verify("again@example.com", OtpKind::Signup, "1111").await.unwrap();
        assert_eq!(stale, VerifyOutcome::Mismatch);
        let fresh = repo.verify("again@example.com", OtpKind::Signup, "2222").await.unwrap();
        assert_eq!(fresh, VerifyOutcome::Verified);

        tx.commit().await.unwrap();
    }

    #[sqlx::test]
    async fn test_kinds_do_not_collide(pool: PgPool) {
        let mut tx = pool.begin().await.unwrap();
        let mut repo = OtpChallenges::new(&mut tx);
        let expires_at = Utc::now() + Duration::minutes(10);

        repo.issue("both@example.com", OtpKind::Signup, "1111", expires_at).await.unwrap();
        repo.issue("both@example.com", OtpKind::ForgotPassword, "2222", expires_at).await.unwrap();

        let signup = repo.verify("both@example.com", OtpKind::Signup, "1111").await.unwrap();
        assert_eq!(signup, VerifyOutcome::Verified);

        // Consuming the signup challenge left the recovery one pending.
        let recovery = repo.verify("both@example.com", OtpKind::ForgotPassword, "2222").await.unwrap();
        assert_eq!(recovery, VerifyOutcome::Verified);

        tx.commit().await.unwrap();
    }

    #[sqlx::test]
    async fn test_grant_consume_is_single_use(pool: PgPool) {
        let mut tx = pool.begin().await.unwrap();
        let mut grants = PasswordResetGrants::new(&mut tx);

        grants.issue("reset@example.com", Utc::now() + Duration::minutes(15)).await.unwrap();

        assert!(grants.consume("reset@example.com").await.unwrap());
        assert!(!grants.consume("reset@example.com").await.unwrap());

        tx.commit().await.unwrap();
    }
}
