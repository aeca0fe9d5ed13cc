//! OTP challenge model and the pure decision logic of its state machine.
//!
//! A challenge lives under the key (normalized email, kind) and moves
//! through: absent -> pending -> one of {verified, expired, exhausted},
//! every terminal outcome deleting the row. The decision itself is a pure
//! function ([`OtpChallenge::assess`]); the repository applies the matching
//! store mutation under a row lock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Maximum recorded failures before a challenge is burned. The 4th
/// submission after 3 recorded failures is rejected before the code is even
/// compared.
pub const MAX_OTP_ATTEMPTS: i32 = 3;

/// What a challenge proves: a fresh signup's email ownership, or control of
/// the mailbox during password recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum OtpKind {
    Signup,
    ForgotPassword,
}

impl OtpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpKind::Signup => "signup",
            OtpKind::ForgotPassword => "forgot-password",
        }
    }
}

impl std::fmt::Display for OtpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Database entity model
#[derive(Debug, Clone, FromRow)]
pub struct OtpChallenge {
    pub email: String,
    pub kind: String,
    pub code: String,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Closed set of verification outcomes. Callers must handle each one; there
/// is no string-typed error channel here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// Code matched; the challenge has been consumed.
    Verified,
    /// No pending challenge for this (email, kind).
    NotFound,
    /// Challenge outlived its validity window; it has been removed.
    Expired,
    /// Attempt limit reached; the challenge has been burned and a new one
    /// must be issued.
    TooManyAttempts,
    /// Wrong code; one attempt charged, challenge still pending.
    Mismatch,
}

impl OtpChallenge {
    /// Decide the outcome of submitting `code` against this pending
    /// challenge at time `now`.
    ///
    /// Order matters and is an invariant: expiry is checked before the
    /// attempt limit (an expired row costs no attempt), and the limit is
    /// checked before the code comparison (an exhausted challenge never
    /// verifies, even with the right code).
    pub fn assess(&self, code: &str, now: DateTime<Utc>) -> VerifyOutcome {
        if now > self.expires_at {
            return VerifyOutcome::Expired;
        }
        if self.attempts >= MAX_OTP_ATTEMPTS {
            return VerifyOutcome::TooManyAttempts;
        }
        if self.code != code {
            return VerifyOutcome::Mismatch;
        }
        VerifyOutcome::Verified
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn pending(code: &str, attempts: i32, now: DateTime<Utc>) -> OtpChallenge {
        OtpChallenge {
            email: "a@x.com".to_string(),
            kind: OtpKind::Signup.as_str().to_string(),
            code: code.to_string(),
            attempts,
            created_at: now,
            expires_at: now + Duration::minutes(10),
        }
    }

    #[test]
    fn test_correct_code_verifies() {
        let now = Utc::now();
        let challenge = pending("0417", 0, now);

        assert_eq!(challenge.assess("0417", now), VerifyOutcome::Verified);
    }

    #[test]
    fn test_wrong_code_is_mismatch() {
        let now = Utc::now();
        let challenge = pending("0417", 0, now);

        assert_eq!(challenge.assess("9999", now), VerifyOutcome::Mismatch);
    }

    #[test]
    fn test_attempt_boundary_is_exactly_three() {
        let now = Utc::now();

        // Up to 2 recorded failures the challenge is still consumable.
        for attempts in 0..MAX_OTP_ATTEMPTS {
            let challenge = pending("0417", attempts, now);
            assert_eq!(challenge.assess("0417", now), VerifyOutcome::Verified);
        }

        // After 3 recorded failures even the correct code is rejected.
        let burned = pending("0417", MAX_OTP_ATTEMPTS, now);
        assert_eq!(burned.assess("0417", now), VerifyOutcome::TooManyAttempts);
        assert_eq!(burned.assess("9999", now), VerifyOutcome::TooManyAttempts);
    }

    #[test]
    fn test_expired_regardless_of_code() {
        let now = Utc::now();
        let mut challenge = pending("0417", 0, now);
        challenge.expires_at = now - Duration::seconds(1);

        assert_eq!(challenge.assess("0417", now), VerifyOutcome::Expired);
        assert_eq!(challenge.assess("9999", now), VerifyOutcome::Expired);
    }

    #[test]
    fn test_expiry_checked_before_attempt_limit() {
        // An expired AND exhausted challenge reports Expired, so the caller
        // deletes it without charging anything.
        let now = Utc::now();
        let mut challenge = pending("0417", MAX_OTP_ATTEMPTS, now);
        challenge.expires_at = now - Duration::seconds(1);

        assert_eq!(challenge.assess("0417", now), VerifyOutcome::Expired);
    }

    #[test]
    fn test_boundary_instant_is_not_expired() {
        // `now > expires_at` is strict: at the exact expiry instant the
        // challenge is still live.
        let now = Utc::now();
        let mut challenge = pending("0417", 0, now);
        challenge.expires_at = now;

        assert_eq!(challenge.assess("0417", now), VerifyOutcome::Verified);
    }

    #[test]
    fn test_kind_round_trip() {
        assert_eq!(OtpKind::Signup.as_str(), "signup");
        assert_eq!(OtpKind::ForgotPassword.as_str(), "forgot-password");

        let kind: OtpKind = serde_json::from_str("\"forgot-password\"").unwrap();
        assert_eq!(kind, OtpKind::ForgotPassword);
        assert_eq!(serde_json::to_string(&OtpKind::Signup).unwrap(), "\"signup\"");
    }
}
