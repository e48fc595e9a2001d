// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Configuration
//!
//! Pure data: the validated set of knobs named in the configuration
//! surface. Loading and layering (defaults → TOML → environment) lives in
//! `pipeline_runtime`; this type only knows its own defaults and how to
//! validate itself.

use crate::error::PipelineError;
use crate::value_objects::WorkerCount;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub input_directory: String,
    pub file_pattern: String,
    pub max_concurrent_processing: usize,
    pub max_retry_attempts: u32,
    pub retry_delay_secs: u64,
    pub processing_timeout_secs: u64,
    pub dequeue_timeout_secs: u64,
    pub enable_file_watcher: bool,
    pub polling_interval_secs: u64,
    pub max_completed_jobs: usize,
    pub max_active_jobs: usize,
    pub max_processed_files: usize,
    pub collection_cleanup_interval_secs: u64,
    pub max_cache_size_bytes: u64,
    pub max_cache_entries: u64,
    pub cache_eviction_interval_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_directory: ".".to_string(),
            file_pattern: "*.md".to_string(),
            max_concurrent_processing: WorkerCount::DEFAULT_WORKERS,
            max_retry_attempts: 3,
            retry_delay_secs: 5,
            processing_timeout_secs: 600,
            dequeue_timeout_secs: 5,
            enable_file_watcher: true,
            polling_interval_secs: 30,
            max_completed_jobs: 1_000,
            max_active_jobs: 10_000,
            max_processed_files: 100_000,
            collection_cleanup_interval_secs: 600,
            max_cache_size_bytes: 500 * 1024 * 1024,
            max_cache_entries: 10_000,
            cache_eviction_interval_secs: 1_800,
        }
    }
}

impl PipelineConfig {
    /// Bounded FIFO capacity, per the queue's `max(workers * 100, 1000)`
    /// rule.
    pub fn queue_capacity(&self) -> usize {
        (self.max_concurrent_processing * 100).max(1_000)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn processing_timeout(&self) -> Duration {
        Duration::from_secs(self.processing_timeout_secs)
    }

    pub fn dequeue_timeout(&self) -> Duration {
        Duration::from_secs(self.dequeue_timeout_secs)
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.polling_interval_secs)
    }

    pub fn cache_eviction_interval(&self) -> Duration {
        Duration::from_secs(self.cache_eviction_interval_secs)
    }

    /// Rejects configuration that would make the pipeline unable to ever
    /// make progress, surfaced before the Supervisor is constructed.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.max_concurrent_processing == 0 {
            return Err(PipelineError::configuration("max_concurrent_processing must be >= 1"));
        }
        if self.retry_delay_secs == 0 {
            return Err(PipelineError::configuration("retry_delay_secs must be > 0"));
        }
        if self.processing_timeout_secs == 0 {
            return Err(PipelineError::configuration("processing_timeout_secs must be > 0"));
        }
        if self.file_pattern.is_empty() {
            return Err(PipelineError::configuration("file_pattern must not be empty"));
        }
        if self.max_cache_entries == 0 {
            return Err(PipelineError::configuration("max_cache_entries must be >= 1"));
        }
        Ok(())
    }
}
