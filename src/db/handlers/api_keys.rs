//! Database repository for API keys.

use sqlx::PgConnection;
use tracing::instrument;

use crate::{
    db::{
        errors::Result,
        models::api_keys::{ApiKey, ApiKeyCreateDBRequest},
    },
    types::{AccountId, abbrev_uuid},
};

pub struct ApiKeys<'c> {
    db: &'c mut PgConnection,
}

impl<'c> ApiKeys<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Insert a key if and only if the owner is still under `max_keys`.
    ///
    /// The quota check and the insert are one statement, so two concurrent
    /// creations cannot both squeeze past the limit. Returns `None` when the
    /// quota is already full.
    #[instrument(skip(self, request), fields(account_id = %abbrev_uuid(&request.account_id), name = %request.name), err)]
    pub async fn create_within_quota(&mut self, request: &ApiKeyCreateDBRequest, max_keys: i64) -> Result<Option<ApiKey>> {
        let api_key = sqlx::query_as::<_, ApiKey>(
            r#"
            INSERT INTO api_keys (account_id, name, key_hash, preview)
            SELECT $1, $2, $3, $4
            WHERE (SELECT COUNT(*) FROM api_keys WHERE account_id = $1) < $5
            RETURNING id, account_id, name, preview, created_at, last_used_at
            "#,
        )
        .bind(request.account_id)
        .bind(&request.name)
        .bind(&request.key_hash)
        .bind(&request.preview)
        .bind(max_keys)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(api_key)
    }

    /// Resolve a presented key by its hash, stamping `last_used_at` in the
    /// same statement. A miss writes nothing.
    #[instrument(skip_all, err)]
    pub async fn verify_by_hash(&mut self, key_hash: &str) -> Result<Option<AccountId>> {
        let account_id = sqlx::query_scalar::<_, AccountId>(
            r#"
            UPDATE api_keys
            SET last_used_at = NOW()
            WHERE key_hash = $1
            RETURNING account_id
            "#,
        )
        .bind(key_hash)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(account_id)
    }

    #[instrument(skip(self), fields(account_id = %abbrev_uuid(&account_id)), err)]
    pub async fn list_for_account(&mut self, account_id: AccountId) -> Result<Vec<ApiKey>> {
        let api_keys = sqlx::query_as::<_, ApiKey>(
            r#"
            SELECT id, account_id, name, preview, created_at, last_used_at
            FROM api_keys
            WHERE account_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(account_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(api_keys)
    }

    /// Delete a key identified by its preview, constrained by owner so one
    /// account can never revoke another's key. Returns whether a row was
    /// deleted.
    #[instrument(skip(self, preview), fields(account_id = %abbrev_uuid(&account_id)), err)]
    pub async fn revoke_by_preview(&mut self, account_id: AccountId, preview: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM api_keys WHERE account_id = $1 AND preview = $2")
            .bind(account_id)
            .bind(preview)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        crypto::{api_key_preview, generate_api_key, hash_api_key},
        test_utils::create_test_account,
    };
    use sqlx::PgPool;

    fn create_request(account_id: AccountId, name: &str) -> (String, ApiKeyCreateDBRequest) {
        let key = generate_api_key();
        let request = ApiKeyCreateDBRequest {
            account_id,
            name: name.to_string(),
            key_hash: hash_api_key(&key),
            preview: api_key_preview(&key),
        };
        (key, request)
    }

    #[sqlx::test]
    async fn test_quota_blocks_creation_until_a_key_is_revoked(pool: PgPool) {
        let account = create_test_account(&pool).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = ApiKeys::new(&mut conn);

        let max_keys = 10;
        for i in 0..max_keys {
            let (_, request) = create_request(account.id, &format!("key-{i}"));
            let created = repo.create_within_quota(&request, max_keys).await.unwrap();
            assert!(created.is_some(), "key {i} should fit under the quota");
        }

        let (_, over) = create_request(account.id, "one-too-many");
        assert!(repo.create_within_quota(&over, max_keys).await.unwrap().is_none());

        // Revoking any key frees a slot and the retry succeeds.
        let keys = repo.list_for_account(account.id).await.unwrap();
        assert_eq!(keys.len(), max_keys as usize);
        assert!(repo.revoke_by_preview(account.id, &keys[0].preview).await.unwrap());

        let (_, retry) = create_request(account.id, "after-revoke");
        assert!(repo.create_within_quota(&retry, max_keys).await.unwrap().is_some());
    }

    #[sqlx::test]
    async fn test_quota_is_per_account(pool: PgPool) {
        let full = create_test_account(&pool).await;
        let fresh = create_test_account(&pool).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = ApiKeys::new(&mut conn);

        let (_, request) = create_request(full.id, "only");
        repo.create_within_quota(&request, 1).await.unwrap().unwrap();

        let (_, blocked) = create_request(full.id, "blocked");
        assert!(repo.create_within_quota(&blocked, 1).await.unwrap().is_none());

        let (_, other) = create_request(fresh.id, "unaffected");
        assert!(repo.create_within_quota(&other, 1).await.unwrap().is_some());
    }

    #[sqlx::test]
    async fn test_revoke_is_scoped_to_the_owning_account(pool: PgPool) {
        let owner = create_test_account(&pool).await;
        let other = create_test_account(&pool).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = ApiKeys::new(&mut conn);

        let (key, request) = create_request(owner.id, "mine");
        let created = repo.create_within_quota(&request, 10).await.unwrap().unwrap();

        // Another account presenting the right preview deletes nothing and
        // the key keeps resolving to its owner.
        assert!(!repo.revoke_by_preview(other.id, &created.preview).await.unwrap());
        assert_eq!(repo.verify_by_hash(&hash_api_key(&key)).await.unwrap(), Some(owner.id));

        assert!(repo.revoke_by_preview(owner.id, &created.preview).await.unwrap());
        assert_eq!(repo.verify_by_hash(&hash_api_key(&key)).await.unwrap(), None);
    }

    #[sqlx::test]
    async fn test_verify_by_hash_stamps_last_used(pool: PgPool) {
        let account = create_test_account(&pool).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = ApiKeys::new(&mut conn);

        let (key, request) = create_request(account.id, "stamped");
        let created = repo.create_within_quota(&request, 10).await.unwrap().unwrap();
        assert!(created.last_used_at.is_none());

        repo.verify_by_hash(&hash_api_key(&key)).await.unwrap().unwrap();

        let keys = repo.list_for_account(account.id).await.unwrap();
        assert!(keys[0].last_used_at.is_some());
    }
}
