use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::Row;

use super::{classify, RepoResult};
use crate::models::follow::{Follow, FollowView};

#[async_trait]
pub trait FollowRepository: Send + Sync {
    /// Fails with `Conflict(unique_follow | follower_not_followee)`.
    async fn create(&self, follower_id: i64, followee_id: i64) -> RepoResult<Follow>;
    /// Only rows where `follower_id` is the given user are visible.
    async fn find_for_follower(&self, id: i64, follower_id: i64) -> RepoResult<Option<FollowView>>;
    /// Newest first.
    async fn list_for_follower(&self, follower_id: i64) -> RepoResult<Vec<FollowView>>;
    async fn delete_for_follower(&self, id: i64, follower_id: i64) -> RepoResult<bool>;
    async fn following_usernames(&self, user_id: i64) -> RepoResult<Vec<String>>;
    async fn follower_usernames(&self, user_id: i64) -> RepoResult<Vec<String>>;
}

const VIEW_SELECT: &str = r#"
    SELECT f.id, f.follower_id, fr.username AS follower, f.followee_id, fe.username AS followee, f.created_at
    FROM follows f
    JOIN users fr ON fr.id = f.follower_id
    JOIN users fe ON fe.id = f.followee_id
"#;

fn view_from_row(row: &Row) -> Result<FollowView, tokio_postgres::Error> {
    Ok(FollowView {
        id: row.try_get("id")?,
        follower_id: row.try_get("follower_id")?,
        follower: row.try_get("follower")?,
        followee_id: row.try_get("followee_id")?,
        followee: row.try_get("followee")?,
        created_at: row.try_get("created_at")?,
    })
}

#[derive(Clone)]
pub struct PgFollowRepository {
    pool: Pool,
}

impl PgFollowRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn usernames(&self, sql: &str, user_id: i64) -> RepoResult<Vec<String>> {
        let client = self.pool.get().await?;
        let rows = client.query(sql, &[&user_id]).await?;
        Ok(rows
            .iter()
            .map(|row| row.try_get::<_, String>(0))
            .collect::<Result<Vec<_>, _>>()?)
    }
}

#[async_trait]
impl FollowRepository for PgFollowRepository {
    async fn create(&self, follower_id: i64, followee_id: i64) -> RepoResult<Follow> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                r#"
                INSERT INTO follows (follower_id, followee_id)
                VALUES ($1, $2)
                RETURNING id, follower_id, followee_id, created_at
                "#,
                &[&follower_id, &followee_id],
            )
            .await
            .map_err(classify)?;
        Ok(Follow {
            id: row.try_get("id")?,
            follower_id: row.try_get("follower_id")?,
            followee_id: row.try_get("followee_id")?,
            created_at: row.try_get("created_at")?,
        })
    }

    async fn find_for_follower(&self, id: i64, follower_id: i64) -> RepoResult<Option<FollowView>> {
        let client = self.pool.get().await?;
        let sql = format!("{} WHERE f.id = $1 AND f.follower_id = $2", VIEW_SELECT);
        let row = client.query_opt(sql.as_str(), &[&id, &follower_id]).await?;
        Ok(row.as_ref().map(view_from_row).transpose()?)
    }

    async fn list_for_follower(&self, follower_id: i64) -> RepoResult<Vec<FollowView>> {
        let client = self.pool.get().await?;
        let sql = format!(
            "{} WHERE f.follower_id = $1 ORDER BY f.created_at DESC, f.id DESC",
            VIEW_SELECT
        );
        let rows = client.query(sql.as_str(), &[&follower_id]).await?;
        Ok(rows
            .iter()
            .map(view_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn delete_for_follower(&self, id: i64, follower_id: i64) -> RepoResult<bool> {
        let client = self.pool.get().await?;
        let deleted = client
            .execute(
                "DELETE FROM follows WHERE id = $1 AND follower_id = $2",
                &[&id, &follower_id],
            )
            .await?;
        Ok(deleted > 0)
    }

    async fn following_usernames(&self, user_id: i64) -> RepoResult<Vec<String>> {
        self.usernames(
            r#"
            SELECT u.username FROM follows f
            JOIN users u ON u.id = f.followee_id
            WHERE f.follower_id = $1
            ORDER BY f.created_at DESC, f.id DESC
            "#,
            user_id,
        )
        .await
    }

    async fn follower_usernames(&self, user_id: i64) -> RepoResult<Vec<String>> {
        self.usernames(
            r#"
            SELECT u.username FROM follows f
            JOIN users u ON u.id = f.follower_id
            WHERE f.followee_id = $1
            ORDER BY f.created_at DESC, f.id DESC
            "#,
            user_id,
        )
        .await
    }
}
