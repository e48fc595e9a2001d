// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Domain
//!
//! The technology-agnostic core of the file-processing pipeline: entities,
//! value objects, repository interfaces, configuration, and the error model
//! that `pipeline_runtime` and `pipeline_bootstrap` build on.
//!
//! This crate has no knowledge of the file system, a concrete async
//! runtime, or a concrete cache/queue implementation. It defines *what* a
//! job, a cache entry, and a stage executor are, and the contracts between
//! them; `pipeline_runtime` supplies the concrete adapters.

pub mod config;
pub mod entities;
pub mod error;
pub mod repositories;
pub mod value_objects;

pub use config::PipelineConfig;
pub use entities::{CacheEntry, Job, JobStatus, PersistedStageData, StageResult};
pub use error::PipelineError;
pub use repositories::{ArtifactCache, CancellationSignal, JobQueue, ProcessingContext, StageExecutor, ValidationOutcome};
pub use value_objects::{CacheKey, ContentHash, JobId, StageId, WorkerCount};
