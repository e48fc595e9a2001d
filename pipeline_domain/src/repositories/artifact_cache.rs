// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Artifact Cache Interface
//!
//! The content-addressed, persistent store of per-file processing results.
//! An entry exists on disk iff the file at its path was processed at its
//! recorded content hash; `Store` always overwrites whole-entry, never
//! patches in place, so a reader never observes a torn write.

use crate::entities::job::Job;
use crate::error::PipelineError;
use crate::entities::cache_entry::CacheEntry;
use crate::value_objects::ContentHash;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::time::Duration;

/// A best-effort snapshot returned by a `Query*` operation. Concurrent
/// writes may cause individual entries to be skipped with a warning; the
/// query itself never fails because of it.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub items: Vec<CacheEntry>,
    pub total_count: usize,
    pub duration: Duration,
    pub metadata: std::collections::HashMap<String, String>,
}

/// Aggregate counters returned by [`ArtifactCache::stats`].
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub total_files: u64,
    pub processed_files: u64,
    pub failed_files: u64,
    pub total_size_bytes: u64,
    pub oldest_entry: Option<DateTime<Utc>>,
    pub newest_entry: Option<DateTime<Utc>>,
    pub per_stage_counts: std::collections::HashMap<String, u64>,
}

/// The content-addressed cache that lets a re-run of the pipeline skip
/// stages already completed for an unchanged file.
///
/// # Thread Safety
/// Implementations are shared across every worker; per-entry writes must be
/// safe without a global lock (the file system's atomic rename provides
/// that), while the advisory statistics counters may use an internal mutex.
#[async_trait]
pub trait ArtifactCache: Send + Sync {
    /// Persists a whole-entry [`CacheEntry`] for `job`, overwriting any
    /// prior entry at the same key. Fails only with `IOFailure`; a failed
    /// `store` must never leave a partially-written file visible to
    /// concurrent readers.
    async fn store(&self, job: &Job) -> Result<(), PipelineError>;

    /// Returns the current entry for `path`, or `None` if absent or
    /// unreadable. A malformed on-disk entry is logged and treated as
    /// missing, never returned as an error.
    async fn load(&self, path: &Path) -> Result<Option<CacheEntry>, PipelineError>;

    /// True iff a stored entry exists, is `Status=Completed`, and its
    /// recorded content hash matches `current_hash`.
    async fn is_fresh(&self, path: &Path, current_hash: &ContentHash) -> Result<bool, PipelineError>;

    /// Removes the entry for `path`, if any, and updates counters.
    async fn invalidate(&self, path: &Path) -> Result<(), PipelineError>;

    /// Scans entries whose file path matches `glob_pattern`.
    async fn query_by_path(&self, glob_pattern: &str) -> Result<QueryResult, PipelineError>;

    /// Scans entries that carry `key=value` in a stage's precomputed index.
    async fn query_by_index(&self, key: &str, value: &str) -> Result<QueryResult, PipelineError>;

    /// Aggregate counters. Above a fast-path entry-count threshold only
    /// directory-level totals are computed; below it, a sampled scan fills
    /// in the per-status breakdown.
    async fn stats(&self) -> Result<CacheStats, PipelineError>;

    /// Runs one eviction pass: a TTL sweep followed by capacity-based LRU
    /// eviction if size or entry caps are exceeded. Preemptible by
    /// cancellation between individual deletes.
    async fn evict(&self, cancellation: std::sync::Arc<dyn super::stage_executor::CancellationSignal>) -> Result<u64, PipelineError>;
}
