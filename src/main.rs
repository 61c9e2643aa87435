// src/main.rs
use actix_cors::Cors;
use actix_web::{middleware::Logger, middleware::NormalizePath, web, App, HttpServer};
use log::{error, info, warn};

use socialnet_be::config::{self, AppConfig, StorageBackend};
use socialnet_be::repositories::{run_migrations, Repositories};
use socialnet_be::routes;
use socialnet_be::services::auth_services::AuthService;
use socialnet_be::services::media_services::MediaStorage;
use socialnet_be::services::publish_scheduler::{
    recover_pending, spawn_publish_worker, SchedulerConfig,
};
use socialnet_be::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let cfg = match AppConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    let repos = match cfg.storage {
        StorageBackend::Postgres => {
            let pg_pool = match config::get_pg_pool() {
                Ok(p) => p,
                Err(e) => {
                    error!("Failed to create PG pool: {:#}", e);
                    std::process::exit(1);
                }
            };
            if let Err(e) = run_migrations(&pg_pool).await {
                error!("Failed to prepare database schema: {}", e);
                std::process::exit(1);
            }
            Repositories::postgres(pg_pool)
        }
        StorageBackend::Memory => {
            warn!("STORAGE_BACKEND=memory: data is lost on restart");
            Repositories::in_memory()
        }
    };

    let (publisher, _worker) = spawn_publish_worker(
        repos.posts.clone(),
        SchedulerConfig {
            max_retries: cfg.publish_max_retries,
            retry_delay: cfg.publish_retry_delay,
        },
    );
    match recover_pending(repos.posts.as_ref(), &publisher).await {
        Ok(count) => info!("Recovered {} scheduled post(s)", count),
        Err(e) => error!("Failed to recover scheduled posts: {}", e),
    }

    let state = web::Data::new(AppState {
        repos,
        auth: AuthService::new(&cfg.jwt_secret, cfg.token_ttl),
        media: MediaStorage::new(cfg.media_root.clone(), &cfg.media_url, cfg.max_upload_bytes),
        publisher,
    });

    let bind_address = cfg.bind_address();
    info!("Media root: {}", cfg.media_root.display());
    info!("Starting server on {}", bind_address);

    let allowed_origins = cfg.allowed_origins.clone();
    let media_url = cfg.media_url.clone();
    // base64 uploads inflate bodies by a third
    let json_limit = cfg.max_upload_bytes * 4 / 3 + 64 * 1024;

    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                "authorization",
                "content-type",
                "accept",
                "x-requested-with",
            ])
            .supports_credentials()
            .max_age(3600);

        for origin in &allowed_origins {
            cors = cors.allowed_origin(origin);
        }

        App::new()
            .wrap(NormalizePath::trim())
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(|svc| routes::configure(svc, &media_url, json_limit))
    })
    .bind(&bind_address)?
    .run()
    .await
}
