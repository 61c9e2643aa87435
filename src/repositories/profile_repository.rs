use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::types::ToSql;
use tokio_postgres::Row;

use super::user_repository::{user_from_row, USER_COLUMNS};
use super::{classify, contains_pattern, RepoResult};
use crate::models::profile::{Profile, ProfileChanges, ProfileFilter, ProfileWithUser};

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Fails with `Conflict(profiles_user_id_key)` when the user already has one.
    async fn create(
        &self,
        user_id: i64,
        picture: Option<String>,
        bio: Option<String>,
    ) -> RepoResult<Profile>;
    async fn exists_for_user(&self, user_id: i64) -> RepoResult<bool>;
    async fn find(&self, id: i64) -> RepoResult<Option<ProfileWithUser>>;
    async fn list(&self, filter: &ProfileFilter) -> RepoResult<Vec<ProfileWithUser>>;
    async fn update(&self, id: i64, changes: ProfileChanges) -> RepoResult<Option<Profile>>;
    async fn delete(&self, id: i64) -> RepoResult<bool>;
}

fn profile_from_row(row: &Row) -> Result<Profile, tokio_postgres::Error> {
    Ok(Profile {
        id: row.try_get("profile_id")?,
        user_id: row.try_get("user_id")?,
        picture: row.try_get("picture")?,
        bio: row.try_get("bio")?,
    })
}

fn joined_from_row(row: &Row) -> Result<ProfileWithUser, tokio_postgres::Error> {
    Ok(ProfileWithUser {
        profile: profile_from_row(row)?,
        user: user_from_row(row)?,
    })
}

fn select_joined() -> String {
    format!(
        "SELECT p.id AS profile_id, p.user_id, p.picture, p.bio, {} FROM profiles p JOIN users u ON u.id = p.user_id",
        USER_COLUMNS
    )
}

#[derive(Clone)]
pub struct PgProfileRepository {
    pool: Pool,
}

impl PgProfileRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileRepository for PgProfileRepository {
    async fn create(
        &self,
        user_id: i64,
        picture: Option<String>,
        bio: Option<String>,
    ) -> RepoResult<Profile> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                r#"
                INSERT INTO profiles (user_id, picture, bio)
                VALUES ($1, $2, $3)
                RETURNING id AS profile_id, user_id, picture, bio
                "#,
                &[&user_id, &picture, &bio],
            )
            .await
            .map_err(classify)?;
        Ok(profile_from_row(&row)?)
    }

    async fn exists_for_user(&self, user_id: i64) -> RepoResult<bool> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "SELECT EXISTS(SELECT 1 FROM profiles WHERE user_id = $1)",
                &[&user_id],
            )
            .await?;
        Ok(row.try_get(0)?)
    }

    async fn find(&self, id: i64) -> RepoResult<Option<ProfileWithUser>> {
        let client = self.pool.get().await?;
        let sql = format!("{} WHERE p.id = $1", select_joined());
        let row = client.query_opt(sql.as_str(), &[&id]).await?;
        Ok(row.as_ref().map(joined_from_row).transpose()?)
    }

    async fn list(&self, filter: &ProfileFilter) -> RepoResult<Vec<ProfileWithUser>> {
        let mut clauses: Vec<String> = Vec::new();
        let mut params: Vec<Box<dyn ToSql + Sync + Send>> = Vec::new();

        if let Some(user_id) = filter.user_id {
            params.push(Box::new(user_id));
            clauses.push(format!("p.user_id = ${}", params.len()));
        }
        for (column, value) in [
            ("u.username", &filter.username),
            ("u.first_name", &filter.first_name),
            ("u.last_name", &filter.last_name),
        ] {
            if let Some(value) = value {
                params.push(Box::new(contains_pattern(value)));
                clauses.push(format!("{} ILIKE ${}", column, params.len()));
            }
        }
        if let Some((start, end)) = filter.joined {
            params.push(Box::new(start));
            clauses.push(format!("u.date_joined >= ${}", params.len()));
            params.push(Box::new(end));
            clauses.push(format!("u.date_joined < ${}", params.len()));
        }

        let mut sql = select_joined();
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY p.id");

        let client = self.pool.get().await?;
        let refs: Vec<&(dyn ToSql + Sync)> = params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();
        let rows = client.query(sql.as_str(), &refs).await?;
        Ok(rows
            .iter()
            .map(joined_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn update(&self, id: i64, changes: ProfileChanges) -> RepoResult<Option<Profile>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                UPDATE profiles
                SET picture = COALESCE($2, picture),
                    bio = COALESCE($3, bio)
                WHERE id = $1
                RETURNING id AS profile_id, user_id, picture, bio
                "#,
                &[&id, &changes.picture, &changes.bio],
            )
            .await?;
        Ok(row.as_ref().map(profile_from_row).transpose()?)
    }

    async fn delete(&self, id: i64) -> RepoResult<bool> {
        let client = self.pool.get().await?;
        let deleted = client
            .execute("DELETE FROM profiles WHERE id = $1", &[&id])
            .await?;
        Ok(deleted > 0)
    }
}
