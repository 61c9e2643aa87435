use async_trait::async_trait;
use deadpool_postgres::Pool;

use super::{classify, RepoResult};

/// Server-side session keys. A JWT is only honoured while its `jti` is the
/// key stored here for its user.
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Returns the user's existing key, or stores `candidate` and returns it.
    async fn get_or_create(&self, user_id: i64, candidate: &str) -> RepoResult<String>;
    async fn is_active(&self, user_id: i64, key: &str) -> RepoResult<bool>;
    /// Deletes the user's key. Returns false when there was none.
    async fn revoke(&self, user_id: i64) -> RepoResult<bool>;
}

#[derive(Clone)]
pub struct PgTokenRepository {
    pool: Pool,
}

impl PgTokenRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenRepository for PgTokenRepository {
    async fn get_or_create(&self, user_id: i64, candidate: &str) -> RepoResult<String> {
        let client = self.pool.get().await?;
        client
            .execute(
                "INSERT INTO auth_tokens (key, user_id) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING",
                &[&candidate, &user_id],
            )
            .await
            .map_err(classify)?;
        let row = client
            .query_one("SELECT key FROM auth_tokens WHERE user_id = $1", &[&user_id])
            .await?;
        Ok(row.try_get(0)?)
    }

    async fn is_active(&self, user_id: i64, key: &str) -> RepoResult<bool> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "SELECT EXISTS(SELECT 1 FROM auth_tokens WHERE user_id = $1 AND key = $2)",
                &[&user_id, &key],
            )
            .await?;
        Ok(row.try_get(0)?)
    }

    async fn revoke(&self, user_id: i64) -> RepoResult<bool> {
        let client = self.pool.get().await?;
        let deleted = client
            .execute("DELETE FROM auth_tokens WHERE user_id = $1", &[&user_id])
            .await?;
        Ok(deleted > 0)
    }
}
