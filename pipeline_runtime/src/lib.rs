// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Runtime
//!
//! The concrete adapters for `pipeline_domain`'s repository traits, plus
//! the components that drive them:
//!
//! - [`cache`]: a content-addressed, atomically-written on-disk
//!   implementation of `ArtifactCache` with LRU/TTL eviction.
//! - [`queue`]: a bounded, backpressuring implementation of `JobQueue` with
//!   retry backoff and stale-job reaping.
//! - [`stage_runner`]: drives a single job's required stages to completion,
//!   resuming from cached stage results.
//! - [`worker_pool`]: a fixed-size pool of workers, each running an
//!   independent dequeue/execute/complete loop.
//! - [`discovery`] and [`watcher`]: the initial directory scan and the
//!   debounced filesystem watch that feed the queue.
//! - [`supervisor`]: owns the full object graph's startup, monitoring, and
//!   graceful shutdown.
//! - [`executors`]: example stage executors (`PassThroughExecutor`,
//!   `DebugExecutor`) used by tests and the CLI default.
//! - [`config`] and [`logging`]: ambient configuration loading and tracing
//!   setup.

pub mod cache;
pub mod config;
pub mod discovery;
pub mod executors;
pub mod logging;
pub mod queue;
pub mod stage_runner;
pub mod supervisor;
pub mod watcher;
pub mod worker_pool;

// Tests are organized as:
// - Unit tests: #[cfg(test)] modules within each source file
// - Integration tests: separate files in tests/ directory

pub use cache::FileCache;
pub use queue::BoundedJobQueue;
pub use stage_runner::{RunOutcome, StageRunner};
pub use supervisor::Supervisor;
pub use worker_pool::WorkerPool;

pub use pipeline_domain::{PipelineConfig, PipelineError};
