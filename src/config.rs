use std::env;
use std::path::PathBuf;
use std::time::Duration;
use anyhow::{Context, Result};
use deadpool_postgres::{Config, Pool, Runtime, PoolConfig};
use tokio_postgres::NoTls;

/// Which repository implementation backs the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub media_root: PathBuf,
    pub media_url: String,
    pub storage: StorageBackend,
    pub publish_max_retries: u32,
    pub publish_retry_delay: Duration,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET not set")?;
        if jwt_secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }

        let storage = match env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "postgres".into())
            .to_lowercase()
            .as_str()
        {
            "postgres" | "pg" => StorageBackend::Postgres,
            "memory" => StorageBackend::Memory,
            other => anyhow::bail!("unknown STORAGE_BACKEND `{}`", other),
        };

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let media_url = env::var("MEDIA_URL").unwrap_or_else(|_| "/media".into());

        Ok(Self {
            bind_host: env::var("BIND_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parse_var("PORT", 8080)?,
            allowed_origins,
            jwt_secret,
            token_ttl: Duration::from_secs(parse_var::<u64>("TOKEN_TTL_HOURS", 168)? * 3600),
            media_root: PathBuf::from(env::var("MEDIA_ROOT").unwrap_or_else(|_| "uploads".into())),
            media_url: normalize_media_url(&media_url),
            storage,
            publish_max_retries: parse_var("PUBLISH_MAX_RETRIES", 3)?,
            publish_retry_delay: Duration::from_secs(parse_var("PUBLISH_RETRY_DELAY_SECS", 30)?),
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value `{}`", key, raw)),
        Err(_) => Ok(default),
    }
}

/// "/media/" and "media" both become "/media".
fn normalize_media_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/media".to_string()
    } else {
        format!("/{}", trimmed)
    }
}

pub fn get_pg_pool() -> Result<Pool> {
    let mut cfg = Config::new();
    cfg.host = Some(env::var("PG_HOST").context("PG_HOST not set")?);
    cfg.port = Some(parse_var("PG_PORT", 5432)?);
    cfg.user = Some(env::var("PG_USER").context("PG_USER not set")?);
    cfg.password = env::var("PG_PASS").ok();
    cfg.dbname = Some(env::var("PG_DB").context("PG_DB not set")?);

    let mut pool_cfg: PoolConfig = cfg.pool.take().unwrap_or_default();
    pool_cfg.max_size = parse_var("PG_POOL_MAX_SIZE", 16)?;
    cfg.pool = Some(pool_cfg);

    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
       .context("failed to create postgres pool")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_url_is_normalized() {
        assert_eq!(normalize_media_url("/media/"), "/media");
        assert_eq!(normalize_media_url("files"), "/files");
        assert_eq!(normalize_media_url(""), "/media");
    }
}
