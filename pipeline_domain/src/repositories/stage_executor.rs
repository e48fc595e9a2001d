// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stage Executor Interface
//!
//! The single external boundary the core pipeline consumes to turn a job's
//! file into per-stage content. Implementations may call a local function, an
//! in-process model, or a remote service with its own caching — the core
//! treats anything behind this trait as opaque and only requires it to be
//! idempotent, cancellation-aware, and to produce UTF-8 JSON content on
//! success.

use crate::entities::job::{Job, StageResult};
use crate::entities::cache_entry::Index;
use crate::error::PipelineError;
use crate::value_objects::StageId;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation signal threaded through a stage execution call.
///
/// Kept trait-based rather than a concrete runtime type so the domain crate
/// stays free of a dependency on any particular async runtime's
/// cancellation primitive; `pipeline_runtime` supplies the real
/// implementation backed by its shutdown coordinator.
pub trait CancellationSignal: Send + Sync {
    fn is_canceled(&self) -> bool;
}

/// A [`CancellationSignal`] that never fires, for tests and standalone runs.
#[derive(Debug, Default, Clone)]
pub struct NeverCancel;

impl CancellationSignal for NeverCancel {
    fn is_canceled(&self) -> bool {
        false
    }
}

/// A manually-triggerable [`CancellationSignal`] for tests.
#[derive(Debug, Clone, Default)]
pub struct ManualCancel(Arc<AtomicBool>);

impl ManualCancel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl CancellationSignal for ManualCancel {
    fn is_canceled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-call context passed to a stage executor: which attempt this is and
/// how to observe cancellation.
pub struct ProcessingContext {
    pub attempt: u32,
    pub timeout: std::time::Duration,
    pub cancellation: Arc<dyn CancellationSignal>,
}

impl ProcessingContext {
    pub fn new(attempt: u32, timeout: std::time::Duration, cancellation: Arc<dyn CancellationSignal>) -> Self {
        Self {
            attempt,
            timeout,
            cancellation,
        }
    }

    pub fn is_canceled(&self) -> bool {
        self.cancellation.is_canceled()
    }
}

/// The outcome of validating a stage's produced content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    Invalid(String),
}

/// The external interface the core consumes to run a single stage against a
/// job's file and, optionally, validate or index that stage's output.
///
/// # Thread Safety
/// Implementations must be `Send + Sync`: the Worker Pool calls into the
/// same executor instance from every worker concurrently.
#[async_trait]
pub trait StageExecutor: Send + Sync {
    /// Runs `stage` against `job`, returning the stage's result. Must be
    /// idempotent: running the same stage twice on the same content
    /// produces an equivalent result, so retries are always safe.
    async fn execute_stage(
        &self,
        job: &Job,
        stage: &StageId,
        ctx: &ProcessingContext,
    ) -> Result<StageResult, PipelineError>;

    /// Validates `content` produced for `stage`. A stage with no registered
    /// validator is always `Valid`.
    async fn validate(&self, stage: &StageId, content: &str) -> Result<ValidationOutcome, PipelineError>;

    /// Builds an optional precomputed index from `stage`'s content. Returns
    /// `None` when no indexer is registered for `stage`. A failing indexer
    /// must not propagate: callers treat indexing failure as an empty index
    /// plus a warning, never a stage failure.
    async fn build_index(&self, stage: &StageId, content: &str) -> Option<Index>;

    /// The ordered set of stages this executor knows how to run.
    fn supported_stages(&self) -> Vec<StageId>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_cancel_starts_uncanceled_and_latches() {
        let signal = ManualCancel::new();
        assert!(!signal.is_canceled());
        signal.cancel();
        assert!(signal.is_canceled());
    }

    #[test]
    fn never_cancel_is_always_false() {
        assert!(!NeverCancel.is_canceled());
    }
}
