use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::Row;

use super::{classify, RepoResult};
use crate::models::like::{Like, LikeFilter};

#[async_trait]
pub trait LikeRepository: Send + Sync {
    /// Fails with `Conflict(unique_like)` when the reviewer already rated the post.
    async fn create(&self, post_id: i64, reviewer_id: i64, is_likes: bool) -> RepoResult<Like>;
    async fn find(&self, id: i64) -> RepoResult<Option<Like>>;
    async fn find_for(&self, post_id: i64, reviewer_id: i64) -> RepoResult<Option<Like>>;
    async fn list(&self, filter: &LikeFilter) -> RepoResult<Vec<Like>>;
    async fn set_is_likes(&self, id: i64, is_likes: bool) -> RepoResult<Option<Like>>;
    async fn delete(&self, id: i64) -> RepoResult<bool>;
}

fn like_from_row(row: &Row) -> Result<Like, tokio_postgres::Error> {
    Ok(Like {
        id: row.try_get("id")?,
        post_id: row.try_get("post_id")?,
        reviewer_id: row.try_get("reviewer_id")?,
        is_likes: row.try_get("is_likes")?,
    })
}

#[derive(Clone)]
pub struct PgLikeRepository {
    pool: Pool,
}

impl PgLikeRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LikeRepository for PgLikeRepository {
    async fn create(&self, post_id: i64, reviewer_id: i64, is_likes: bool) -> RepoResult<Like> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                r#"
                INSERT INTO likes (post_id, reviewer_id, is_likes)
                VALUES ($1, $2, $3)
                RETURNING id, post_id, reviewer_id, is_likes
                "#,
                &[&post_id, &reviewer_id, &is_likes],
            )
            .await
            .map_err(classify)?;
        Ok(like_from_row(&row)?)
    }

    async fn find(&self, id: i64) -> RepoResult<Option<Like>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT id, post_id, reviewer_id, is_likes FROM likes WHERE id = $1",
                &[&id],
            )
            .await?;
        Ok(row.as_ref().map(like_from_row).transpose()?)
    }

    async fn find_for(&self, post_id: i64, reviewer_id: i64) -> RepoResult<Option<Like>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT id, post_id, reviewer_id, is_likes FROM likes WHERE post_id = $1 AND reviewer_id = $2",
                &[&post_id, &reviewer_id],
            )
            .await?;
        Ok(row.as_ref().map(like_from_row).transpose()?)
    }

    async fn list(&self, filter: &LikeFilter) -> RepoResult<Vec<Like>> {
        let client = self.pool.get().await?;
        let rows = match filter.post_id {
            Some(post_id) => {
                client
                    .query(
                        "SELECT id, post_id, reviewer_id, is_likes FROM likes WHERE post_id = $1 ORDER BY id",
                        &[&post_id],
                    )
                    .await?
            }
            None => {
                client
                    .query(
                        "SELECT id, post_id, reviewer_id, is_likes FROM likes ORDER BY id",
                        &[],
                    )
                    .await?
            }
        };
        Ok(rows
            .iter()
            .map(like_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn set_is_likes(&self, id: i64, is_likes: bool) -> RepoResult<Option<Like>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "UPDATE likes SET is_likes = $2 WHERE id = $1 RETURNING id, post_id, reviewer_id, is_likes",
                &[&id, &is_likes],
            )
            .await?;
        Ok(row.as_ref().map(like_from_row).transpose()?)
    }

    async fn delete(&self, id: i64) -> RepoResult<bool> {
        let client = self.pool.get().await?;
        let deleted = client
            .execute("DELETE FROM likes WHERE id = $1", &[&id])
            .await?;
        Ok(deleted > 0)
    }
}
