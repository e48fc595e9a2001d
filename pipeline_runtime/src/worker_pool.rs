// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Worker Pool
//!
//! A fixed-size pool of workers, each running an independent
//! Dequeue → Stage Runner → Complete/Retry loop. Every worker composes two
//! cancellation sources — the supervisor's shutdown signal and the pool's
//! own drain signal — and exits after finishing its current stage once
//! either fires.

use crate::stage_runner::{RunOutcome, StageRunner};
use pipeline_domain::repositories::job_queue::JobQueue;
use pipeline_domain::repositories::stage_executor::CancellationSignal;
use pipeline_domain::value_objects::WorkerCount;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

const ERROR_BACKOFF_CAP: Duration = Duration::from_secs(5);

/// Cancellation signal that is the logical OR of two independent sources,
/// matching the Worker Pool's "supervisor shutdown or pool drain" contract.
pub struct CompositeCancellation {
    a: Arc<dyn CancellationSignal>,
    b: Arc<dyn CancellationSignal>,
}

impl CompositeCancellation {
    pub fn new(a: Arc<dyn CancellationSignal>, b: Arc<dyn CancellationSignal>) -> Self {
        Self { a, b }
    }
}

impl CancellationSignal for CompositeCancellation {
    fn is_canceled(&self) -> bool {
        self.a.is_canceled() || self.b.is_canceled()
    }
}

/// Local drain signal the Supervisor can trigger independently of the
/// process-wide shutdown signal (e.g. to retire the pool while keeping the
/// cache and queue alive for a `stats` query).
#[derive(Default)]
pub struct DrainSignal(AtomicBool);

impl DrainSignal {
    pub fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    pub fn drain(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl CancellationSignal for DrainSignal {
    fn is_canceled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct WorkerPool {
    queue: Arc<dyn JobQueue>,
    runner: Arc<StageRunner>,
    worker_count: WorkerCount,
    drain: Arc<DrainSignal>,
}

impl WorkerPool {
    pub fn new(queue: Arc<dyn JobQueue>, runner: Arc<StageRunner>, worker_count: WorkerCount) -> Self {
        Self {
            queue,
            runner,
            worker_count,
            drain: Arc::new(DrainSignal::new()),
        }
    }

    pub fn drain_signal(&self) -> Arc<DrainSignal> {
        self.drain.clone()
    }

    /// Spawns `worker_count` worker tasks, each composing `shutdown` (the
    /// supervisor-wide signal) with this pool's own drain signal. Returns
    /// one join handle per worker so the Supervisor's monitoring loop can
    /// detect faulted/completed tasks and restart them.
    pub fn spawn(&self, shutdown: Arc<dyn CancellationSignal>) -> Vec<JoinHandle<()>> {
        (0..self.worker_count.get())
            .map(|id| self.spawn_worker(id, shutdown.clone()))
            .collect()
    }

    pub fn spawn_worker(&self, worker_id: usize, shutdown: Arc<dyn CancellationSignal>) -> JoinHandle<()> {
        let queue = self.queue.clone();
        let runner = self.runner.clone();
        let cancellation: Arc<dyn CancellationSignal> = Arc::new(CompositeCancellation::new(shutdown, self.drain.clone()));

        tokio::spawn(async move { worker_loop(worker_id, queue, runner, cancellation).await })
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: Arc<dyn JobQueue>,
    runner: Arc<StageRunner>,
    cancellation: Arc<dyn CancellationSignal>,
) {
    let mut backoff = Duration::from_millis(100);

    loop {
        if cancellation.is_canceled() {
            info!(worker_id, "worker exiting on cancellation");
            return;
        }

        let job = match queue.dequeue(cancellation.clone()).await {
            Ok(Some(job)) => job,
            Ok(None) => continue,
            Err(error) => {
                error!(worker_id, %error, "dequeue failed, backing off");
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(ERROR_BACKOFF_CAP);
                continue;
            }
        };

        backoff = Duration::from_millis(100);
        let job_id = job.job_id;
        let mut job = job;

        match runner.run(&mut job, cancellation.clone()).await {
            RunOutcome::Completed { .. } => {
                if let Err(error) = queue.complete(job_id, true, None, None).await {
                    error!(worker_id, %error, "failed to record job completion");
                }
            }
            RunOutcome::Failed { error } => {
                if !error.is_recoverable() {
                    warn!(worker_id, %error, "job failed permanently");
                    let _ = queue.complete(job_id, false, None, Some(error.to_string())).await;
                    continue;
                }

                let mut retry_job = job;
                if queue.should_retry(&mut retry_job, &error.to_string()) {
                    if let Err(enqueue_error) = queue.enqueue_retry(retry_job, cancellation.clone()).await {
                        error!(worker_id, %enqueue_error, "failed to re-enqueue job for retry");
                    }
                } else {
                    let _ = queue.complete(job_id, false, None, Some(error.to_string())).await;
                }
            }
        }
    }
}
