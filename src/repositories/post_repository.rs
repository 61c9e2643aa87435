use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use tokio_postgres::types::ToSql;
use tokio_postgres::{GenericClient, Row};

use super::{classify, contains_pattern, RepoResult};
use crate::models::post::{Image, NewPost, Post, PostChanges, PostDetail, PostQuery};

#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Writes the post, its hashtag links and optional image atomically.
    async fn create(&self, new_post: NewPost) -> RepoResult<Post>;
    async fn find(&self, id: i64) -> RepoResult<Option<PostDetail>>;
    /// Newest first, each post at most once.
    async fn list(&self, query: &PostQuery) -> RepoResult<Vec<PostDetail>>;
    /// `changes.hashtags`, when set, replaces the post's hashtag set.
    async fn update(&self, id: i64, changes: PostChanges) -> RepoResult<Option<PostDetail>>;
    async fn delete(&self, id: i64) -> RepoResult<bool>;
    async fn add_image(&self, post_id: i64, picture: &str) -> RepoResult<Image>;
    /// Flips `is_published`. Returns false when the post no longer exists.
    async fn publish(&self, id: i64) -> RepoResult<bool>;
    /// Unpublished posts that carry a publication time.
    async fn pending_publications(&self) -> RepoResult<Vec<(i64, DateTime<Utc>)>>;
}

const POST_SELECT: &str = r#"
    SELECT p.id, p.author_id, p.content, p.created_at, p.is_published, p.time_to_publicate,
           u.username AS author_username
    FROM posts p
    JOIN users u ON u.id = p.author_id
"#;

const POST_RETURNING: &str = "id, author_id, content, created_at, is_published, time_to_publicate";

fn post_from_row(row: &Row) -> Result<Post, tokio_postgres::Error> {
    Ok(Post {
        id: row.try_get("id")?,
        author_id: row.try_get("author_id")?,
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
        is_published: row.try_get("is_published")?,
        time_to_publicate: row.try_get("time_to_publicate")?,
    })
}

async fn link_hashtags<C: GenericClient + Sync>(
    client: &C,
    post_id: i64,
    hashtags: &[String],
) -> RepoResult<()> {
    for text in hashtags {
        let row = client
            .query_one(
                r#"
                INSERT INTO hashtags (text) VALUES ($1)
                ON CONFLICT (text) DO UPDATE SET text = EXCLUDED.text
                RETURNING id
                "#,
                &[text],
            )
            .await
            .map_err(classify)?;
        let hashtag_id: i64 = row.try_get(0)?;
        client
            .execute(
                "INSERT INTO post_hashtags (post_id, hashtag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
                &[&post_id, &hashtag_id],
            )
            .await
            .map_err(classify)?;
    }
    Ok(())
}

/// Attaches hashtags and images to already loaded posts, keeping their order.
async fn attach_details<C: GenericClient + Sync>(
    client: &C,
    rows: Vec<Row>,
) -> RepoResult<Vec<PostDetail>> {
    let mut details = Vec::with_capacity(rows.len());
    for row in &rows {
        details.push(PostDetail {
            post: post_from_row(row)?,
            author_username: row.try_get("author_username")?,
            hashtags: Vec::new(),
            images: Vec::new(),
        });
    }
    if details.is_empty() {
        return Ok(details);
    }

    let ids: Vec<i64> = details.iter().map(|d| d.post.id).collect();
    let mut tags: HashMap<i64, Vec<String>> = HashMap::new();
    for row in client
        .query(
            r#"
            SELECT ph.post_id, h.text
            FROM post_hashtags ph
            JOIN hashtags h ON h.id = ph.hashtag_id
            WHERE ph.post_id = ANY($1)
            ORDER BY h.text
            "#,
            &[&ids],
        )
        .await?
    {
        tags.entry(row.try_get(0)?).or_default().push(row.try_get(1)?);
    }

    let mut images: HashMap<i64, Vec<String>> = HashMap::new();
    for row in client
        .query(
            "SELECT post_id, picture FROM images WHERE post_id = ANY($1) ORDER BY id",
            &[&ids],
        )
        .await?
    {
        images.entry(row.try_get(0)?).or_default().push(row.try_get(1)?);
    }

    for detail in &mut details {
        detail.hashtags = tags.remove(&detail.post.id).unwrap_or_default();
        detail.images = images.remove(&detail.post.id).unwrap_or_default();
    }
    Ok(details)
}

#[derive(Clone)]
pub struct PgPostRepository {
    pool: Pool,
}

impl PgPostRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostRepository for PgPostRepository {
    async fn create(&self, new_post: NewPost) -> RepoResult<Post> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let sql = format!(
            r#"
            INSERT INTO posts (author_id, content, is_published, time_to_publicate)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            POST_RETURNING
        );
        let row = tx
            .query_one(
                sql.as_str(),
                &[
                    &new_post.author_id,
                    &new_post.content,
                    &new_post.is_published,
                    &new_post.time_to_publicate,
                ],
            )
            .await
            .map_err(classify)?;
        let post = post_from_row(&row)?;

        link_hashtags(&*tx, post.id, &new_post.hashtags).await?;
        if let Some(picture) = &new_post.image {
            tx.execute(
                "INSERT INTO images (post_id, picture) VALUES ($1, $2)",
                &[&post.id, picture],
            )
            .await
            .map_err(classify)?;
        }

        tx.commit().await?;
        Ok(post)
    }

    async fn find(&self, id: i64) -> RepoResult<Option<PostDetail>> {
        let client = self.pool.get().await?;
        let sql = format!("{} WHERE p.id = $1", POST_SELECT);
        let rows = client.query(sql.as_str(), &[&id]).await?;
        Ok(attach_details(&**client, rows).await?.into_iter().next())
    }

    async fn list(&self, query: &PostQuery) -> RepoResult<Vec<PostDetail>> {
        let mut clauses: Vec<String> = Vec::new();
        let mut params: Vec<Box<dyn ToSql + Sync + Send>> = Vec::new();

        if query.published_only {
            clauses.push("p.is_published".to_string());
        }
        if let Some(author_id) = query.author_id {
            params.push(Box::new(author_id));
            clauses.push(format!("p.author_id = ${}", params.len()));
        }
        if let Some(follower_id) = query.followed_by {
            params.push(Box::new(follower_id));
            clauses.push(format!(
                "EXISTS (SELECT 1 FROM follows f WHERE f.followee_id = p.author_id AND f.follower_id = ${})",
                params.len()
            ));
        }
        if let Some(reviewer_id) = query.liked_by {
            params.push(Box::new(reviewer_id));
            clauses.push(format!(
                "EXISTS (SELECT 1 FROM likes l WHERE l.post_id = p.id AND l.reviewer_id = ${} AND l.is_likes)",
                params.len()
            ));
        }
        if !query.tags.is_empty() {
            params.push(Box::new(query.tags.clone()));
            clauses.push(format!(
                r#"EXISTS (
                    SELECT 1 FROM post_hashtags ph JOIN hashtags h ON h.id = ph.hashtag_id
                    WHERE ph.post_id = p.id AND h.text = ANY(${})
                )"#,
                params.len()
            ));
        }
        if let Some(author) = &query.author {
            params.push(Box::new(contains_pattern(author)));
            clauses.push(format!("u.username ILIKE ${}", params.len()));
        }
        if let Some(content) = &query.content {
            params.push(Box::new(contains_pattern(content)));
            clauses.push(format!("p.content ILIKE ${}", params.len()));
        }

        let mut sql = POST_SELECT.to_string();
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY p.created_at DESC, p.id DESC");

        let client = self.pool.get().await?;
        let refs: Vec<&(dyn ToSql + Sync)> = params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();
        let rows = client.query(sql.as_str(), &refs).await?;
        attach_details(&**client, rows).await
    }

    async fn update(&self, id: i64, changes: PostChanges) -> RepoResult<Option<PostDetail>> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let updated = tx
            .execute(
                "UPDATE posts SET content = COALESCE($2, content) WHERE id = $1",
                &[&id, &changes.content],
            )
            .await?;
        if updated == 0 {
            return Ok(None);
        }
        if let Some(hashtags) = &changes.hashtags {
            tx.execute("DELETE FROM post_hashtags WHERE post_id = $1", &[&id])
                .await?;
            link_hashtags(&*tx, id, hashtags).await?;
        }
        tx.commit().await?;
        drop(client);

        self.find(id).await
    }

    async fn delete(&self, id: i64) -> RepoResult<bool> {
        let client = self.pool.get().await?;
        let deleted = client
            .execute("DELETE FROM posts WHERE id = $1", &[&id])
            .await?;
        Ok(deleted > 0)
    }

    async fn add_image(&self, post_id: i64, picture: &str) -> RepoResult<Image> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                r#"
                INSERT INTO images (post_id, picture) VALUES ($1, $2)
                RETURNING id, post_id, picture, created_at
                "#,
                &[&post_id, &picture],
            )
            .await
            .map_err(classify)?;
        Ok(Image {
            id: row.try_get("id")?,
            post_id: row.try_get("post_id")?,
            picture: row.try_get("picture")?,
            created_at: row.try_get("created_at")?,
        })
    }

    async fn publish(&self, id: i64) -> RepoResult<bool> {
        let client = self.pool.get().await?;
        let updated = client
            .execute("UPDATE posts SET is_published = TRUE WHERE id = $1", &[&id])
            .await?;
        Ok(updated > 0)
    }

    async fn pending_publications(&self) -> RepoResult<Vec<(i64, DateTime<Utc>)>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                r#"
                SELECT id, time_to_publicate FROM posts
                WHERE NOT is_published AND time_to_publicate IS NOT NULL
                ORDER BY time_to_publicate
                "#,
                &[],
            )
            .await?;
        rows.iter()
            .map(|row| -> RepoResult<(i64, DateTime<Utc>)> {
                Ok((row.try_get(0)?, row.try_get(1)?))
            })
            .collect()
    }
}
