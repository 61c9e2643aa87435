use std::sync::Arc;

use deadpool_postgres::Pool;
use log::{debug, info};
use thiserror::Error;
use tokio_postgres::error::SqlState;

pub mod comment_repository;
pub mod follow_repository;
pub mod like_repository;
pub mod memory;
pub mod post_repository;
pub mod profile_repository;
pub mod token_repository;
pub mod user_repository;

pub use comment_repository::{CommentRepository, PgCommentRepository};
pub use follow_repository::{FollowRepository, PgFollowRepository};
pub use like_repository::{LikeRepository, PgLikeRepository};
pub use memory::MemoryStore;
pub use post_repository::{PgPostRepository, PostRepository};
pub use profile_repository::{PgProfileRepository, ProfileRepository};
pub use token_repository::{PgTokenRepository, TokenRepository};
pub use user_repository::{PgUserRepository, UserRepository};

const INIT_SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

/// Constraint names shared by the SQL schema and the in-memory store.
pub mod constraints {
    pub const USER_EMAIL: &str = "users_email_key";
    pub const USER_USERNAME: &str = "users_username_key";
    pub const PROFILE_USER: &str = "profiles_user_id_key";
    pub const UNIQUE_FOLLOW: &str = "unique_follow";
    pub const FOLLOWER_NOT_FOLLOWEE: &str = "follower_not_followee";
    pub const UNIQUE_LIKE: &str = "unique_like";
    pub const HASHTAG_TEXT: &str = "hashtags_text_key";
}

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("database error: {0}")]
    Database(#[from] tokio_postgres::Error),
    #[error("pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),
    /// Unique or check violation, carrying the constraint name.
    #[error("constraint violated: {0}")]
    Conflict(String),
    /// A referenced row is gone, e.g. deleted between a lookup and an insert.
    #[error("not found")]
    NotFound,
}

pub type RepoResult<T> = Result<T, RepoError>;

impl RepoError {
    pub fn is_conflict_on(&self, constraint: &str) -> bool {
        matches!(self, RepoError::Conflict(name) if name == constraint)
    }
}

/// Unique and check violations become `RepoError::Conflict`, foreign-key
/// violations `RepoError::NotFound`; everything else stays a database error.
pub(crate) fn classify(err: tokio_postgres::Error) -> RepoError {
    let constraint = err
        .as_db_error()
        .and_then(|db| db.constraint())
        .unwrap_or("unknown")
        .to_string();
    match err.code() {
        Some(code) if *code == SqlState::FOREIGN_KEY_VIOLATION => {
            debug!("referenced row missing ({})", constraint);
            RepoError::NotFound
        }
        Some(code)
            if *code == SqlState::UNIQUE_VIOLATION || *code == SqlState::CHECK_VIOLATION =>
        {
            RepoError::Conflict(constraint)
        }
        _ => RepoError::Database(err),
    }
}

/// `%value%` for ILIKE with the wildcard characters of `value` escaped.
pub(crate) fn contains_pattern(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// One handle per aggregate, shared by all handlers.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub tokens: Arc<dyn TokenRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub follows: Arc<dyn FollowRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub likes: Arc<dyn LikeRepository>,
}

impl Repositories {
    pub fn postgres(pool: Pool) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            tokens: Arc::new(PgTokenRepository::new(pool.clone())),
            profiles: Arc::new(PgProfileRepository::new(pool.clone())),
            follows: Arc::new(PgFollowRepository::new(pool.clone())),
            posts: Arc::new(PgPostRepository::new(pool.clone())),
            comments: Arc::new(PgCommentRepository::new(pool.clone())),
            likes: Arc::new(PgLikeRepository::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            users: store.clone(),
            tokens: store.clone(),
            profiles: store.clone(),
            follows: store.clone(),
            posts: store.clone(),
            comments: store.clone(),
            likes: store,
        }
    }
}

pub async fn run_migrations(pool: &Pool) -> RepoResult<()> {
    let client = pool.get().await?;
    client.batch_execute(INIT_SCHEMA).await?;
    info!("database schema is up to date");
    Ok(())
}
