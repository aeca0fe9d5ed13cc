//! Dual-mode credential resolution for account-scoped endpoints.
//!
//! Every protected route accepts a single `Authorization: Bearer <credential>`
//! header. The credential is classified by shape before any lookup: values
//! carrying the API key prefix are resolved against stored key hashes, and
//! everything else is treated as a session JWT. A failure in either path
//! produces the same bare 401 so callers cannot probe which scheme a
//! credential almost matched.

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::{debug, instrument, trace};

use crate::{
    AppState,
    auth::token,
    crypto::{API_KEY_PREFIX, hash_api_key},
    db::{errors::DbError, handlers::api_keys::ApiKeys},
    errors::{Error, Result},
    types::AccountId,
};

/// A bearer credential classified by shape, before any verification.
#[derive(Debug, PartialEq, Eq)]
pub enum BearerCredential<'a> {
    ApiKey(&'a str),
    SessionToken(&'a str),
}

impl<'a> BearerCredential<'a> {
    /// Classify the value of an Authorization header. Returns `None` when the
    /// header does not use the Bearer scheme.
    pub fn classify(header_value: &'a str) -> Option<Self> {
        let credential = header_value.strip_prefix("Bearer ")?;
        if credential.starts_with(API_KEY_PREFIX) {
            Some(BearerCredential::ApiKey(credential))
        } else {
            Some(BearerCredential::SessionToken(credential))
        }
    }
}

/// The authenticated caller, however they presented.
///
/// API key resolution yields only the owning account id; email and username
/// are present only when the caller authenticated with a session token.
#[derive(Debug, Clone)]
pub struct Identity {
    pub account_id: AccountId,
    pub email: Option<String>,
    pub username: Option<String>,
}

/// Resolve an API key credential to its owning account, stamping last use.
#[instrument(skip_all)]
async fn resolve_api_key(state: &AppState, key: &str) -> Result<Identity> {
    let key_hash = hash_api_key(key);

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut repo = ApiKeys::new(&mut conn);

    match repo.verify_by_hash(&key_hash).await? {
        Some(account_id) => Ok(Identity {
            account_id,
            email: None,
            username: None,
        }),
        None => {
            trace!("Presented API key matched no stored hash");
            Err(Error::Unauthenticated { message: None })
        }
    }
}

/// Resolve a session token credential to the claims it carries.
fn resolve_session_token(state: &AppState, raw_token: &str) -> Result<Identity> {
    let claims = token::verify_session_token(raw_token, &state.config).map_err(|e| match e {
        // Collapse all credential failures into the uniform rejection
        Error::Unauthenticated { .. } => Error::Unauthenticated { message: None },
        other => other,
    })?;

    Ok(Identity {
        account_id: claims.sub,
        email: Some(claims.email),
        username: Some(claims.username),
    })
}

/// Extractor for handlers that require an authenticated account.
#[derive(Debug)]
pub struct CurrentAccount(pub Identity);

impl FromRequestParts<AppState> for CurrentAccount {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let header_value = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(Error::Unauthenticated { message: None })?;

        let credential = BearerCredential::classify(header_value).ok_or(Error::Unauthenticated { message: None })?;

        let identity = match credential {
            BearerCredential::ApiKey(key) => resolve_api_key(state, key).await?,
            BearerCredential::SessionToken(raw_token) => resolve_session_token(state, raw_token)?,
        };

        debug!(account_id = %identity.account_id, "Resolved authenticated account");
        Ok(CurrentAccount(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Config, crypto::generate_api_key};
    use axum::http::request::Parts;

    fn parts_with_auth(value: Option<&str>) -> Parts {
        let mut builder = axum::http::Request::builder().uri("http://localhost/test");
        if let Some(value) = value {
            builder = builder.header("authorization", value);
        }
        let (parts, ()) = builder.body(()).unwrap().into_parts();
        parts
    }

    fn test_state() -> AppState {
        let config = Config {
            secret_key: Some("resolver-test-secret".to_string()),
            ..Default::default()
        };
        crate::test_utils::lazy_state_with_config(config)
    }

    #[test]
    fn classify_routes_prefixed_values_to_api_key() {
        let key = generate_api_key();
        let header = format!("Bearer {key}");
        match BearerCredential::classify(&header) {
            Some(BearerCredential::ApiKey(k)) => assert_eq!(k, key),
            other => panic!("expected ApiKey, got {other:?}"),
        }
    }

    #[test]
    fn classify_routes_other_values_to_session_token() {
        assert_eq!(
            BearerCredential::classify("Bearer eyJhbGciOiJIUzI1NiJ9.x.y"),
            Some(BearerCredential::SessionToken("eyJhbGciOiJIUzI1NiJ9.x.y"))
        );
    }

    #[test]
    fn classify_rejects_non_bearer_schemes() {
        assert_eq!(BearerCredential::classify("Basic dXNlcjpwYXNz"), None);
        assert_eq!(BearerCredential::classify("ms_abcdef"), None);
        assert_eq!(BearerCredential::classify(""), None);
    }

    #[tokio::test]
    async fn missing_header_is_unauthenticated() {
        let state = test_state();
        let mut parts = parts_with_auth(None);

        let result = CurrentAccount::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result.unwrap_err(), Error::Unauthenticated { message: None }));
    }

    #[tokio::test]
    async fn non_bearer_header_is_unauthenticated() {
        let state = test_state();
        let mut parts = parts_with_auth(Some("Basic dXNlcjpwYXNz"));

        let result = CurrentAccount::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result.unwrap_err(), Error::Unauthenticated { message: None }));
    }

    #[tokio::test]
    async fn malformed_token_is_unauthenticated() {
        let state = test_state();
        let mut parts = parts_with_auth(Some("Bearer not.a.token"));

        let result = CurrentAccount::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result.unwrap_err(), Error::Unauthenticated { message: None }));
    }

    #[tokio::test]
    async fn expired_token_is_unauthenticated() {
        use jsonwebtoken::{EncodingKey, Header, encode};

        let state = test_state();
        let now = chrono::Utc::now();
        let claims = crate::auth::token::SessionClaims {
            sub: uuid::Uuid::new_v4(),
            email: "old@example.com".to_string(),
            username: "old".to_string(),
            exp: (now - chrono::Duration::hours(1)).timestamp(),
            iat: (now - chrono::Duration::hours(2)).timestamp(),
        };
        let key = EncodingKey::from_secret(state.config.secret_key.as_ref().unwrap().as_bytes());
        let token = encode(&Header::default(), &claims, &key).unwrap();

        let mut parts = parts_with_auth(Some(&format!("Bearer {token}")));
        let result = CurrentAccount::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result.unwrap_err(), Error::Unauthenticated { message: None }));
    }

    #[sqlx::test]
    async fn api_key_resolves_until_revoked(pool: sqlx::PgPool) {
        use crate::{
            crypto::{api_key_preview, hash_api_key},
            db::models::api_keys::ApiKeyCreateDBRequest,
        };

        let state = crate::test_utils::state_with_pool(pool.clone());
        let account = crate::test_utils::create_test_account(&pool).await;

        let key = generate_api_key();
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = ApiKeys::new(&mut conn);
        repo.create_within_quota(
            &ApiKeyCreateDBRequest {
                account_id: account.id,
                name: "resolver-key".to_string(),
                key_hash: hash_api_key(&key),
                preview: api_key_preview(&key),
            },
            10,
        )
        .await
        .unwrap()
        .unwrap();

        let header = format!("Bearer {key}");
        let mut parts = parts_with_auth(Some(&header));
        let CurrentAccount(identity) = CurrentAccount::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(identity.account_id, account.id);
        // Key resolution carries no session claims
        assert_eq!(identity.email, None);
        assert_eq!(identity.username, None);

        repo.revoke_by_preview(account.id, &api_key_preview(&key)).await.unwrap();

        // A revoked key fails exactly like any other bad credential.
        let mut parts = parts_with_auth(Some(&header));
        let result = CurrentAccount::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result.unwrap_err(), Error::Unauthenticated { message: None }));
    }

    #[sqlx::test]
    async fn unknown_api_key_is_unauthenticated(pool: sqlx::PgPool) {
        let state = crate::test_utils::state_with_pool(pool);

        let header = format!("Bearer {}", generate_api_key());
        let mut parts = parts_with_auth(Some(&header));
        let result = CurrentAccount::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result.unwrap_err(), Error::Unauthenticated { message: None }));
    }

    #[tokio::test]
    async fn valid_token_resolves_identity_without_touching_db() {
        let state = test_state();
        let account = crate::db::models::accounts::Account {
            id: uuid::Uuid::new_v4(),
            username: "resolver".to_string(),
            email: "resolver@example.com".to_string(),
            password_hash: "unused".to_string(),
            email_verified: true,
            created_at: chrono::Utc::now(),
            password_changed_at: None,
        };
        let token = token::create_session_token(&account, &state.config).unwrap();

        let mut parts = parts_with_auth(Some(&format!("Bearer {token}")));
        let CurrentAccount(identity) = CurrentAccount::from_request_parts(&mut parts, &state).await.unwrap();

        assert_eq!(identity.account_id, account.id);
        assert_eq!(identity.email.as_deref(), Some("resolver@example.com"));
        assert_eq!(identity.username.as_deref(), Some("resolver"));
    }
}
