// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Supervisor
//!
//! Owns the pipeline's lifecycle end to end: constructs the Cache, Queue,
//! Worker Pool, Discovery and Watcher in dependency order, runs a
//! monitoring loop that restarts faulted workers and reaps stale jobs, and
//! tears everything down in reverse order on shutdown.

use crate::cache::FileCache;
use crate::discovery::{Discovery, SeenSet};
use crate::queue::BoundedJobQueue;
use crate::stage_runner::StageRunner;
use crate::watcher::Watcher;
use crate::worker_pool::WorkerPool;
use pipeline_domain::repositories::artifact_cache::ArtifactCache;
use pipeline_domain::repositories::job_queue::JobQueue;
use pipeline_domain::repositories::stage_executor::{CancellationSignal, StageExecutor};
use pipeline_domain::value_objects::{StageId, WorkerCount};
use pipeline_domain::{PipelineConfig, PipelineError};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

const SHUTDOWN_WAIT: Duration = Duration::from_secs(30);
const MONITOR_ERROR_BACKOFF: Duration = Duration::from_secs(5);

pub struct Supervisor {
    config: PipelineConfig,
    cache: Arc<dyn ArtifactCache>,
    queue: Arc<dyn JobQueue>,
    executor: Arc<dyn StageExecutor>,
    pool: Arc<WorkerPool>,
    discovery: Arc<Discovery>,
    shutdown: Arc<dyn CancellationSignal>,
    workers: std::sync::Mutex<Vec<JoinHandle<()>>>,
    watcher: std::sync::Mutex<Option<Watcher>>,
    monitor: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Supervisor {
    /// Builds the object graph without starting anything: Cache → Queue →
    /// executor handle → Worker Pool (not started) → Discovery.
    pub async fn new(
        config: PipelineConfig,
        cache_dir: PathBuf,
        executor: Arc<dyn StageExecutor>,
        shutdown: Arc<dyn CancellationSignal>,
    ) -> Result<Arc<Self>, PipelineError> {
        let required_stages: Vec<StageId> = executor.supported_stages();
        if required_stages.is_empty() {
            return Err(PipelineError::configuration("executor must support at least one stage"));
        }

        let cache: Arc<dyn ArtifactCache> = Arc::new(
            FileCache::open(
                cache_dir,
                config.max_cache_size_bytes,
                config.max_cache_entries,
                Some(executor.clone()),
            )
            .await?,
        );

        let queue: Arc<dyn JobQueue> = Arc::new(BoundedJobQueue::new(
            config.queue_capacity(),
            config.max_retry_attempts,
            config.retry_delay(),
            config.processing_timeout(),
            config.max_active_jobs,
            config.max_completed_jobs,
        ));

        let runner = Arc::new(StageRunner::new(cache.clone(), executor.clone(), config.processing_timeout()));
        let worker_count = WorkerCount::new(config.max_concurrent_processing);
        let pool = Arc::new(WorkerPool::new(queue.clone(), runner, worker_count));

        let discovery = Arc::new(Discovery::new(cache.clone(), queue.clone(), Arc::new(SeenSet::new()), required_stages));

        Ok(Arc::new(Self {
            config,
            cache,
            queue,
            executor,
            pool,
            discovery,
            shutdown,
            workers: std::sync::Mutex::new(Vec::new()),
            watcher: std::sync::Mutex::new(None),
            monitor: std::sync::Mutex::new(None),
        }))
    }

    /// Runs the full startup sequence: initial Discovery scan, start
    /// workers, start the Watcher (if enabled), start the monitoring loop.
    pub async fn start(self: &Arc<Self>) -> Result<(), PipelineError> {
        let input_dir = PathBuf::from(&self.config.input_directory);

        let counts = self
            .discovery
            .scan(&input_dir, &self.config.file_pattern, self.shutdown.clone())
            .await?;
        info!(cached = counts.cached_files, new = counts.new_files, "discovery scan complete");

        {
            let mut workers = self.workers.lock().unwrap();
            *workers = self.pool.spawn(self.shutdown.clone());
        }

        if self.config.enable_file_watcher {
            let watcher = Watcher::start(&input_dir, self.discovery.clone(), self.shutdown.clone())
                .map_err(|e| PipelineError::configuration(format!("starting watcher: {e}")))?;
            *self.watcher.lock().unwrap() = Some(watcher);
        }

        let monitor_handle = tokio::spawn(Self::monitor_loop(self.clone()));
        *self.monitor.lock().unwrap() = Some(monitor_handle);

        Ok(())
    }

    /// Detects faulted/completed worker tasks and restarts them, reaps
    /// stale jobs, evicts the cache on its own (typically longer) cadence,
    /// and logs a health summary, once per `PollingInterval`. Errors never
    /// stop the loop; they trigger a backoff and continue.
    async fn monitor_loop(self: Arc<Self>) {
        let mut since_last_eviction = Duration::ZERO;
        loop {
            if self.shutdown.is_canceled() {
                return;
            }
            let tick = self.config.polling_interval();
            tokio::time::sleep(tick).await;
            if self.shutdown.is_canceled() {
                return;
            }

            if let Err(error) = self.reconcile_workers().await {
                error!(%error, "monitoring loop error, backing off");
                tokio::time::sleep(MONITOR_ERROR_BACKOFF).await;
                continue;
            }

            match self.queue.cleanup_stale().await {
                Ok(reaped) if reaped > 0 => info!(reaped, "reaped stale jobs"),
                Ok(_) => {}
                Err(error) => warn!(%error, "stale job cleanup failed"),
            }

            since_last_eviction += tick;
            if since_last_eviction >= self.config.cache_eviction_interval() {
                since_last_eviction = Duration::ZERO;
                match self.cache.evict(self.shutdown.clone()).await {
                    Ok(evicted) if evicted > 0 => info!(evicted, "evicted cache entries"),
                    Ok(_) => {}
                    Err(error) => warn!(%error, "cache eviction failed"),
                }
            }

            let stats = self.queue.stats().await;
            let workers_alive = self.workers.lock().unwrap().iter().filter(|h| !h.is_finished()).count();
            info!(
                pending = stats.pending_jobs,
                active = stats.active_jobs,
                completed = stats.completed_jobs,
                failed = stats.failed_jobs,
                workers_alive,
                workers_expected = self.config.max_concurrent_processing,
                "health summary"
            );
        }
    }

    async fn reconcile_workers(self: &Arc<Self>) -> Result<(), PipelineError> {
        let mut workers = self.workers.lock().unwrap();
        let expected = self.config.max_concurrent_processing;
        workers.retain(|handle| !handle.is_finished());

        let missing = expected.saturating_sub(workers.len());
        for offset in 0..missing {
            let worker_id = workers.len() + offset;
            warn!(worker_id, "restarting faulted or completed worker");
            workers.push(self.pool.spawn_worker(worker_id, self.shutdown.clone()));
        }
        Ok(())
    }

    /// Ordered graceful shutdown: stop Watcher, close the queue writer,
    /// drain the pool, wait bounded for workers, log final stats, dispose
    /// resources in reverse dependency order.
    pub async fn shutdown(self: &Arc<Self>) -> Result<(), PipelineError> {
        if let Some(watcher) = self.watcher.lock().unwrap().take() {
            watcher.stop();
        }

        self.queue.complete_channel().await;

        self.pool.drain_signal().drain();

        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut self.workers.lock().unwrap());
        let wait = tokio::time::timeout(SHUTDOWN_WAIT, futures::future::join_all(handles));
        if wait.await.is_err() {
            warn!("graceful shutdown wait exceeded 30s, proceeding");
        }

        if let Some(monitor) = self.monitor.lock().unwrap().take() {
            monitor.abort();
        }

        let stats = self.queue.stats().await;
        info!(
            pending = stats.pending_jobs,
            active = stats.active_jobs,
            completed = stats.completed_jobs,
            failed = stats.failed_jobs,
            "final queue statistics"
        );

        Ok(())
    }

    pub fn cache(&self) -> Arc<dyn ArtifactCache> {
        self.cache.clone()
    }

    pub fn queue(&self) -> Arc<dyn JobQueue> {
        self.queue.clone()
    }

    pub fn executor(&self) -> Arc<dyn StageExecutor> {
        self.executor.clone()
    }
}
