//! Deferred publication of scheduled posts.
//!
//! Jobs are handed to a single worker task over a channel; the worker spawns
//! one sleeper per job that flips `is_published` once the ETA passes. Storage
//! failures are retried a fixed number of times.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::ApiError;
use crate::repositories::{PostRepository, RepoResult};

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PublishJob {
    pub post_id: i64,
    pub eta: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Published,
    /// The post was deleted before its publication time.
    Missing,
    Failed,
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("publish worker is not running")]
    Closed,
}

impl From<SchedulerError> for ApiError {
    fn from(err: SchedulerError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

#[derive(Clone)]
pub struct PublishQueue {
    sender: mpsc::UnboundedSender<PublishJob>,
}

impl PublishQueue {
    /// A queue whose worker is already gone; every enqueue fails.
    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        let (sender, _) = mpsc::unbounded_channel();
        Self { sender }
    }

    pub fn enqueue(&self, post_id: i64, eta: DateTime<Utc>) -> Result<(), SchedulerError> {
        self.sender
            .send(PublishJob { post_id, eta })
            .map_err(|_| SchedulerError::Closed)?;
        info!("post #{} scheduled for publication at {}", post_id, eta);
        Ok(())
    }
}

pub fn spawn_publish_worker(
    posts: Arc<dyn PostRepository>,
    config: SchedulerConfig,
) -> (PublishQueue, JoinHandle<()>) {
    let (sender, mut receiver) = mpsc::unbounded_channel::<PublishJob>();
    let handle = tokio::spawn(async move {
        info!(
            "publish worker started (max_retries={}, retry_delay={:?})",
            config.max_retries, config.retry_delay
        );
        while let Some(job) = receiver.recv().await {
            let posts = posts.clone();
            let config = config.clone();
            tokio::spawn(async move {
                run_job(posts.as_ref(), job, &config).await;
            });
        }
        info!("publish worker stopped");
    });
    (PublishQueue { sender }, handle)
}

/// Waits for the job's ETA, then publishes with retries.
pub async fn run_job(
    posts: &dyn PostRepository,
    job: PublishJob,
    config: &SchedulerConfig,
) -> JobOutcome {
    let wait = (job.eta - Utc::now()).to_std().unwrap_or(Duration::ZERO);
    if !wait.is_zero() {
        tokio::time::sleep(wait).await;
    }

    let mut retries = 0;
    loop {
        match posts.publish(job.post_id).await {
            Ok(true) => {
                info!("post #{} has been published", job.post_id);
                return JobOutcome::Published;
            }
            Ok(false) => {
                warn!("post #{} no longer exists, dropping publish job", job.post_id);
                return JobOutcome::Missing;
            }
            Err(e) if retries < config.max_retries => {
                retries += 1;
                warn!(
                    "publishing post #{} failed ({}), retry {}/{} in {:?}",
                    job.post_id, e, retries, config.max_retries, config.retry_delay
                );
                tokio::time::sleep(config.retry_delay).await;
            }
            Err(e) => {
                error!(
                    "publishing post #{} failed after {} retries: {}",
                    job.post_id, retries, e
                );
                return JobOutcome::Failed;
            }
        }
    }
}

/// Re-enqueues every scheduled post still waiting in storage.
pub async fn recover_pending(posts: &dyn PostRepository, queue: &PublishQueue) -> RepoResult<usize> {
    let pending = posts.pending_publications().await?;
    let mut count = 0;
    for (post_id, eta) in pending {
        if queue.enqueue(post_id, eta).is_ok() {
            count += 1;
        }
    }
    if count > 0 {
        info!("re-enqueued {} scheduled post(s)", count);
    }
    Ok(count)
}
