// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Job Queue Interface
//!
//! The bounded, backpressuring handoff between Discovery/Watcher producers
//! and the Worker Pool's consumers. A job is in exactly one of
//! {queue-buffer, active, completed} at any instant; no transition ever
//! moves a job backwards out of `Completed` or `Failed`.

use super::stage_executor::CancellationSignal;
use crate::entities::job::{Job, StageResult};
use crate::error::PipelineError;
use crate::value_objects::JobId;
use async_trait::async_trait;
use std::sync::Arc;

/// Snapshot counters returned by [`JobQueue::stats`].
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueStats {
    pub pending_jobs: u64,
    pub active_jobs: u64,
    pub completed_jobs: u64,
    pub failed_jobs: u64,
    pub avg_duration_ms: f64,
}

/// The bounded FIFO handoff between file discovery and the worker pool.
///
/// # Thread Safety
/// A single [`JobQueue`] instance is shared by every producer and worker;
/// implementations must guarantee a given job is never handed to two
/// workers by a concurrent `dequeue`.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Blocks until a slot is free or `cancellation` fires. Fails with
    /// `Timeout` after the configured bounded wait, `QueueClosed` if
    /// [`JobQueue::complete_channel`] was already called, or surfaces
    /// cancellation as `Canceled`.
    async fn enqueue(&self, job: Job, cancellation: Arc<dyn CancellationSignal>) -> Result<(), PipelineError>;

    /// Returns the next pending job, transitioning it to `Processing` with
    /// `started_at=now`, or `None` after the configured bounded poll so the
    /// caller can observe cancellation. Never returns the same job twice.
    async fn dequeue(&self, cancellation: Arc<dyn CancellationSignal>) -> Result<Option<Job>, PipelineError>;

    /// Moves `job_id` into the completed set with a terminal status,
    /// evicting the oldest completed entry if the completed-set cap is
    /// exceeded.
    async fn complete(
        &self,
        job_id: JobId,
        success: bool,
        result: Option<StageResult>,
        error_message: Option<String>,
    ) -> Result<(), PipelineError>;

    /// Increments `job.retry_count`. Returns `false` (and marks `job`
    /// `Failed`) once the retry cap is reached; otherwise sets
    /// `job.status=Retrying` and returns `true`.
    fn should_retry(&self, job: &mut Job, error_message: &str) -> bool;

    /// Clears `job`'s transient timing fields, waits the exponential
    /// backoff delay for its current `retry_count`, then re-enqueues it.
    async fn enqueue_retry(&self, job: Job, cancellation: Arc<dyn CancellationSignal>) -> Result<(), PipelineError>;

    /// Force-fails active jobs stuck past twice the processing timeout,
    /// and enforces the active-jobs cap. Returns the number of jobs moved
    /// to `Failed`.
    async fn cleanup_stale(&self) -> Result<u64, PipelineError>;

    /// Snapshot counters; `avg_duration_ms` averages duration across
    /// completed entries only.
    async fn stats(&self) -> QueueStats;

    /// Closes the writer side: further `enqueue` calls fail with
    /// `QueueClosed`. Items already buffered continue to drain normally.
    async fn complete_channel(&self);
}
