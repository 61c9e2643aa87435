use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::types::ToSql;
use tokio_postgres::Row;

use super::{classify, contains_pattern, RepoResult};
use crate::models::comment::{Comment, CommentFilter};

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create(&self, reviewer_id: i64, post_id: i64, content: &str) -> RepoResult<Comment>;
    async fn find(&self, id: i64) -> RepoResult<Option<Comment>>;
    async fn list(&self, filter: &CommentFilter) -> RepoResult<Vec<Comment>>;
    async fn update_content(&self, id: i64, content: &str) -> RepoResult<Option<Comment>>;
    async fn delete(&self, id: i64) -> RepoResult<bool>;
}

fn comment_from_row(row: &Row) -> Result<Comment, tokio_postgres::Error> {
    Ok(Comment {
        id: row.try_get("id")?,
        reviewer_id: row.try_get("reviewer_id")?,
        post_id: row.try_get("post_id")?,
        content: row.try_get("content")?,
    })
}

#[derive(Clone)]
pub struct PgCommentRepository {
    pool: Pool,
}

impl PgCommentRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentRepository for PgCommentRepository {
    async fn create(&self, reviewer_id: i64, post_id: i64, content: &str) -> RepoResult<Comment> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                r#"
                INSERT INTO comments (reviewer_id, post_id, content)
                VALUES ($1, $2, $3)
                RETURNING id, reviewer_id, post_id, content
                "#,
                &[&reviewer_id, &post_id, &content],
            )
            .await
            .map_err(classify)?;
        Ok(comment_from_row(&row)?)
    }

    async fn find(&self, id: i64) -> RepoResult<Option<Comment>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT id, reviewer_id, post_id, content FROM comments WHERE id = $1",
                &[&id],
            )
            .await?;
        Ok(row.as_ref().map(comment_from_row).transpose()?)
    }

    async fn list(&self, filter: &CommentFilter) -> RepoResult<Vec<Comment>> {
        let mut clauses: Vec<String> = Vec::new();
        let mut params: Vec<Box<dyn ToSql + Sync + Send>> = Vec::new();

        if let Some(post_id) = filter.post_id {
            params.push(Box::new(post_id));
            clauses.push(format!("c.post_id = ${}", params.len()));
        }
        if let Some(reviewer_id) = filter.reviewer_id {
            params.push(Box::new(reviewer_id));
            clauses.push(format!("c.reviewer_id = ${}", params.len()));
        }
        if let Some(reviewer) = &filter.reviewer {
            params.push(Box::new(contains_pattern(reviewer)));
            clauses.push(format!("u.username ILIKE ${}", params.len()));
        }

        let mut sql = String::from(
            "SELECT c.id, c.reviewer_id, c.post_id, c.content FROM comments c JOIN users u ON u.id = c.reviewer_id",
        );
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY c.id");

        let client = self.pool.get().await?;
        let refs: Vec<&(dyn ToSql + Sync)> = params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();
        let rows = client.query(sql.as_str(), &refs).await?;
        Ok(rows
            .iter()
            .map(comment_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn update_content(&self, id: i64, content: &str) -> RepoResult<Option<Comment>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "UPDATE comments SET content = $2 WHERE id = $1 RETURNING id, reviewer_id, post_id, content",
                &[&id, &content],
            )
            .await?;
        Ok(row.as_ref().map(comment_from_row).transpose()?)
    }

    async fn delete(&self, id: i64) -> RepoResult<bool> {
        let client = self.pool.get().await?;
        let deleted = client
            .execute("DELETE FROM comments WHERE id = $1", &[&id])
            .await?;
        Ok(deleted > 0)
    }
}
