use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::Row;

use super::{classify, RepoResult};
use crate::models::user::{NewUser, User};

pub(crate) const USER_COLUMNS: &str =
    "u.id, u.email, u.username, u.first_name, u.last_name, u.password_hash, u.is_staff, u.date_joined";

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict(users_email_key | users_username_key)` on duplicates.
    async fn create_user(&self, new_user: NewUser) -> RepoResult<User>;
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    async fn email_exists(&self, email: &str) -> RepoResult<bool>;
    async fn username_exists(&self, username: &str) -> RepoResult<bool>;
}

pub(crate) fn user_from_row(row: &Row) -> Result<User, tokio_postgres::Error> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        username: row.try_get("username")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        password_hash: row.try_get("password_hash")?,
        is_staff: row.try_get("is_staff")?,
        date_joined: row.try_get("date_joined")?,
    })
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: Pool,
}

impl PgUserRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn exists(&self, sql: &str, value: &str) -> RepoResult<bool> {
        let client = self.pool.get().await?;
        let row = client.query_one(sql, &[&value]).await?;
        Ok(row.try_get(0)?)
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create_user(&self, new_user: NewUser) -> RepoResult<User> {
        let client = self.pool.get().await?;
        let sql = format!(
            r#"
            INSERT INTO users AS u (email, username, first_name, last_name, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let row = client
            .query_one(
                sql.as_str(),
                &[
                    &new_user.email,
                    &new_user.username,
                    &new_user.first_name,
                    &new_user.last_name,
                    &new_user.password_hash,
                ],
            )
            .await
            .map_err(classify)?;
        Ok(user_from_row(&row)?)
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<User>> {
        let client = self.pool.get().await?;
        let sql = format!("SELECT {} FROM users u WHERE u.id = $1", USER_COLUMNS);
        let row = client.query_opt(sql.as_str(), &[&id]).await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let client = self.pool.get().await?;
        let sql = format!("SELECT {} FROM users u WHERE u.email = $1", USER_COLUMNS);
        let row = client.query_opt(sql.as_str(), &[&email]).await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn email_exists(&self, email: &str) -> RepoResult<bool> {
        self.exists("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)", email)
            .await
    }

    async fn username_exists(&self, username: &str) -> RepoResult<bool> {
        self.exists("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)", username)
            .await
    }
}
