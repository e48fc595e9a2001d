// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bounded Job Queue
//!
//! A bounded FIFO backed by a `tokio::sync::mpsc` channel for the
//! buffer-to-worker handoff, with separate maps tracking active and
//! completed jobs. A job is in exactly one of {channel buffer, active map,
//! completed map} at any instant; `dequeue` moves it buffer → active,
//! `complete`/`enqueue_retry` move it out of active.

use async_trait::async_trait;
use pipeline_domain::entities::job::{Job, JobStatus, StageResult};
use pipeline_domain::repositories::job_queue::{JobQueue, QueueStats};
use pipeline_domain::repositories::stage_executor::CancellationSignal;
use pipeline_domain::value_objects::JobId;
use pipeline_domain::PipelineError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

const ENQUEUE_TIMEOUT: Duration = Duration::from_secs(30);
const DEQUEUE_POLL_TIMEOUT: Duration = Duration::from_secs(5);
const COMPLETED_JOBS_CAP_DEFAULT: usize = 1_000;

struct CompletedEntry {
    job: Job,
    success: bool,
    completed_at: std::time::Instant,
}

struct State {
    active: HashMap<JobId, Job>,
    completed: Vec<CompletedEntry>,
    failed_count: u64,
}

/// Bounded FIFO job handoff with backpressure, retry bookkeeping, and
/// active/completed tracking.
pub struct BoundedJobQueue {
    sender: mpsc::Sender<Job>,
    receiver: Mutex<mpsc::Receiver<Job>>,
    capacity: usize,
    state: Mutex<State>,
    closed: AtomicBool,
    max_retry_attempts: u32,
    retry_delay: Duration,
    processing_timeout: Duration,
    max_active_jobs: usize,
    max_completed_jobs: usize,
    dequeue_timeout: Duration,
    enqueue_timeout: Duration,
    stale_reaped: AtomicU32,
}

impl BoundedJobQueue {
    pub fn new(
        capacity: usize,
        max_retry_attempts: u32,
        retry_delay: Duration,
        processing_timeout: Duration,
        max_active_jobs: usize,
        max_completed_jobs: usize,
    ) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            sender,
            receiver: Mutex::new(receiver),
            capacity,
            state: Mutex::new(State {
                active: HashMap::new(),
                completed: Vec::with_capacity(max_completed_jobs.min(COMPLETED_JOBS_CAP_DEFAULT)),
                failed_count: 0,
            }),
            closed: AtomicBool::new(false),
            max_retry_attempts,
            retry_delay,
            processing_timeout,
            max_active_jobs,
            max_completed_jobs,
            dequeue_timeout: DEQUEUE_POLL_TIMEOUT,
            enqueue_timeout: ENQUEUE_TIMEOUT,
            stale_reaped: AtomicU32::new(0),
        }
    }

    async fn push(&self, job: Job, cancellation: &Arc<dyn CancellationSignal>) -> Result<(), PipelineError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(PipelineError::queue_closed("queue writer has been closed"));
        }

        tokio::select! {
            result = self.sender.send(job) => {
                result.map_err(|_| PipelineError::queue_closed("queue channel dropped"))
            }
            _ = tokio::time::sleep(self.enqueue_timeout) => {
                Err(PipelineError::timeout(format!("enqueue blocked for more than {:?}", self.enqueue_timeout)))
            }
            _ = Self::wait_canceled(cancellation) => {
                Err(PipelineError::canceled("enqueue canceled"))
            }
        }
    }

    async fn wait_canceled(cancellation: &Arc<dyn CancellationSignal>) {
        loop {
            if cancellation.is_canceled() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

#[async_trait]
impl JobQueue for BoundedJobQueue {
    async fn enqueue(&self, job: Job, cancellation: Arc<dyn CancellationSignal>) -> Result<(), PipelineError> {
        self.push(job, &cancellation).await
    }

    async fn dequeue(&self, cancellation: Arc<dyn CancellationSignal>) -> Result<Option<Job>, PipelineError> {
        let mut receiver = self.receiver.lock().await;

        let received = tokio::select! {
            item = receiver.recv() => item,
            _ = tokio::time::sleep(self.dequeue_timeout) => None,
            _ = Self::wait_canceled(&cancellation) => None,
        };

        let Some(mut job) = received else {
            return Ok(None);
        };

        job.mark_processing();
        let job_id = job.job_id;

        let mut state = self.state.lock().await;
        state.active.insert(job_id, job.clone());

        Ok(Some(job))
    }

    async fn complete(
        &self,
        job_id: JobId,
        success: bool,
        result: Option<StageResult>,
        error_message: Option<String>,
    ) -> Result<(), PipelineError> {
        let mut state = self.state.lock().await;
        let Some(mut job) = state.active.remove(&job_id) else {
            debug!(job_id = %job_id, "complete() called for a job not in the active map");
            return Ok(());
        };

        if let Some(result) = result {
            if let Some(stage) = job.current_stage.clone() {
                job.record_stage_result(stage, result);
            }
        }

        if success {
            job.mark_completed();
        } else {
            job.mark_failed(error_message.unwrap_or_else(|| "unspecified failure".to_string()));
            state.failed_count += 1;
        }

        let cap = self.max_completed_jobs.min(COMPLETED_JOBS_CAP_DEFAULT).max(1);
        if state.completed.len() >= cap {
            state.completed.remove(0);
        }
        state.completed.push(CompletedEntry {
            job,
            success,
            completed_at: std::time::Instant::now(),
        });

        Ok(())
    }

    fn should_retry(&self, job: &mut Job, error_message: &str) -> bool {
        job.retry_count += 1;
        if job.retry_count >= self.max_retry_attempts {
            job.mark_failed(error_message);
            false
        } else {
            job.status = JobStatus::Retrying;
            job.last_error = Some(error_message.to_string());
            true
        }
    }

    async fn enqueue_retry(&self, mut job: Job, cancellation: Arc<dyn CancellationSignal>) -> Result<(), PipelineError> {
        {
            let mut state = self.state.lock().await;
            state.active.remove(&job.job_id);
        }

        job.reset_for_retry();

        let backoff = self.retry_delay * 2u32.saturating_pow(job.retry_count.saturating_sub(1));
        tokio::select! {
            _ = tokio::time::sleep(backoff) => {}
            _ = Self::wait_canceled(&cancellation) => {
                return Err(PipelineError::canceled("retry backoff canceled"));
            }
        }

        self.push(job, &cancellation).await
    }

    async fn cleanup_stale(&self) -> Result<u64, PipelineError> {
        let stale_after = self.processing_timeout * 2;
        let mut reaped = 0u64;

        let mut state = self.state.lock().await;
        let now = chrono::Utc::now();
        let stale_ids: Vec<JobId> = state
            .active
            .values()
            .filter(|job| {
                job.started_at
                    .map(|started| {
                        let elapsed = now - started;
                        elapsed.to_std().map(|d| d > stale_after).unwrap_or(false)
                    })
                    .unwrap_or(false)
            })
            .map(|job| job.job_id)
            .collect();

        for job_id in stale_ids {
            if let Some(mut job) = state.active.remove(&job_id) {
                job.mark_failed("stale");
                state.failed_count += 1;
                reaped += 1;
            }
        }

        if state.active.len() > self.max_active_jobs.saturating_mul(2) {
            let mut oldest: Vec<JobId> = state.active.keys().copied().collect();
            oldest.sort_by_key(|id| state.active[id].started_at);
            let overflow = state.active.len() - self.max_active_jobs;
            for job_id in oldest.into_iter().take(overflow) {
                if let Some(mut job) = state.active.remove(&job_id) {
                    job.mark_failed("active jobs cap exceeded");
                    state.failed_count += 1;
                    reaped += 1;
                }
            }
        }

        self.stale_reaped.fetch_add(reaped as u32, Ordering::Relaxed);
        Ok(reaped)
    }

    async fn stats(&self) -> QueueStats {
        let state = self.state.lock().await;
        let completed_jobs = state.completed.iter().filter(|e| e.success).count() as u64;
        let failed_jobs = state.failed_count;
        let durations: Vec<u64> = state
            .completed
            .iter()
            .filter(|e| e.success)
            .filter_map(|e| e.job.processing_duration())
            .filter_map(|d| d.to_std().ok())
            .map(|d| d.as_millis() as u64)
            .collect();
        let avg_duration_ms = if durations.is_empty() {
            0.0
        } else {
            durations.iter().sum::<u64>() as f64 / durations.len() as f64
        };

        QueueStats {
            pending_jobs: (self.capacity - self.sender.capacity()) as u64,
            active_jobs: state.active.len() as u64,
            completed_jobs,
            failed_jobs,
            avg_duration_ms,
        }
    }

    async fn complete_channel(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline_domain::repositories::stage_executor::{ManualCancel, NeverCancel};
    use pipeline_domain::value_objects::{ContentHash, StageId};
    use std::path::PathBuf;

    fn test_job() -> Job {
        Job::new(PathBuf::from("a.md"), ContentHash::of_bytes(b"x"), vec![StageId::new("s1")])
    }

    #[tokio::test]
    async fn dequeue_returns_none_on_empty_queue_without_consuming() {
        let queue = BoundedJobQueue::new(10, 3, Duration::from_millis(1), Duration::from_secs(1), 10, 10);
        let manual = ManualCancel::new();
        manual.cancel();
        let result = queue.dequeue(Arc::new(manual)).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn enqueue_then_dequeue_transitions_to_processing() {
        let queue = BoundedJobQueue::new(10, 3, Duration::from_millis(1), Duration::from_secs(1), 10, 10);
        let cancel: Arc<dyn CancellationSignal> = Arc::new(NeverCancel);
        queue.enqueue(test_job(), cancel.clone()).await.unwrap();

        let job = queue.dequeue(cancel).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Processing);
    }

    #[tokio::test]
    async fn should_retry_fails_job_once_cap_reached() {
        let queue = BoundedJobQueue::new(10, 2, Duration::from_millis(1), Duration::from_secs(1), 10, 10);
        let mut job = test_job();

        assert!(queue.should_retry(&mut job, "boom"));
        assert_eq!(job.status, JobStatus::Retrying);
        assert!(!queue.should_retry(&mut job, "boom again"));
        assert_eq!(job.status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn complete_channel_rejects_further_enqueues() {
        let queue = BoundedJobQueue::new(10, 3, Duration::from_millis(1), Duration::from_secs(1), 10, 10);
        queue.complete_channel().await;
        let cancel: Arc<dyn CancellationSignal> = Arc::new(NeverCancel);
        let result = queue.enqueue(test_job(), cancel).await;
        assert!(matches!(result, Err(PipelineError::QueueClosed(_))));
    }

    #[tokio::test]
    async fn completed_jobs_are_reflected_in_stats() {
        let queue = BoundedJobQueue::new(10, 3, Duration::from_millis(1), Duration::from_secs(1), 10, 10);
        let cancel: Arc<dyn CancellationSignal> = Arc::new(NeverCancel);
        queue.enqueue(test_job(), cancel.clone()).await.unwrap();
        let job = queue.dequeue(cancel).await.unwrap().unwrap();
        let job_id = job.job_id;

        queue
            .complete(job_id, true, Some(StageResult::success("{}", 5)), None)
            .await
            .unwrap();

        let stats = queue.stats().await;
        assert_eq!(stats.completed_jobs, 1);
        assert_eq!(stats.failed_jobs, 0);
    }

    proptest::proptest! {
        /// Invariant 4: `RetryCount` is monotonically non-decreasing for a
        /// given `JobID`, across an arbitrary number of `should_retry` calls
        /// against an arbitrary retry cap.
        #[test]
        fn retry_count_is_monotonically_non_decreasing(attempts in 0usize..50, max_retry_attempts in 1u32..10) {
            let queue = BoundedJobQueue::new(10, max_retry_attempts, Duration::from_millis(1), Duration::from_secs(1), 10, 10);
            let mut job = test_job();

            let mut previous = job.retry_count;
            for _ in 0..attempts {
                queue.should_retry(&mut job, "boom");
                proptest::prop_assert!(job.retry_count >= previous);
                previous = job.retry_count;
            }
        }
    }
}
