// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Discovery
//!
//! The initial directory scan: enumerate files matching the configured
//! glob, skip anything the cache already has fresh, and enqueue the rest.
//! Shares its seen-set with the [`watcher`](crate::watcher) so overlapping
//! scan/watch events never double-enqueue the same path.

use pipeline_domain::repositories::artifact_cache::ArtifactCache;
use pipeline_domain::repositories::job_queue::JobQueue;
use pipeline_domain::repositories::stage_executor::CancellationSignal;
use pipeline_domain::value_objects::{ContentHash, StageId};
use pipeline_domain::{Job, PipelineError};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Tracks which paths have already been enqueued this process lifetime, so
/// an overlapping scan/watch event yields at most one enqueue per path.
#[derive(Default)]
pub struct SeenSet(Mutex<HashSet<PathBuf>>);

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` the first time `path` is recorded, `false` on every
    /// subsequent call for the same path.
    pub fn record(&self, path: &Path) -> bool {
        self.0.lock().unwrap().insert(path.to_path_buf())
    }

    pub fn forget(&self, path: &Path) {
        self.0.lock().unwrap().remove(path);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ScanCounts {
    pub cached_files: u64,
    pub new_files: u64,
}

pub struct Discovery {
    cache: Arc<dyn ArtifactCache>,
    queue: Arc<dyn JobQueue>,
    seen: Arc<SeenSet>,
    required_stages: Vec<StageId>,
}

impl Discovery {
    pub fn new(cache: Arc<dyn ArtifactCache>, queue: Arc<dyn JobQueue>, seen: Arc<SeenSet>, required_stages: Vec<StageId>) -> Self {
        Self {
            cache,
            queue,
            seen,
            required_stages,
        }
    }

    /// Enumerates `input_dir` for files matching `file_pattern`, enqueueing
    /// every one that isn't already fresh in the cache.
    pub async fn scan(
        &self,
        input_dir: &Path,
        file_pattern: &str,
        cancellation: Arc<dyn CancellationSignal>,
    ) -> Result<ScanCounts, PipelineError> {
        let pattern = glob::Pattern::new(file_pattern)
            .map_err(|e| PipelineError::configuration(format!("invalid file pattern {file_pattern:?}: {e}")))?;

        let mut counts = ScanCounts::default();
        let mut entries = tokio::fs::read_dir(input_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            if cancellation.is_canceled() {
                break;
            }

            let path = entry.path();
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            if !pattern.matches(file_name) {
                continue;
            }

            match self.consider(&path, &cancellation).await {
                Ok(true) => counts.new_files += 1,
                Ok(false) => counts.cached_files += 1,
                Err(error) => warn!(path = %path.display(), %error, "skipping file during scan"),
            }
        }

        info!(cached = counts.cached_files, new = counts.new_files, "initial scan complete");
        Ok(counts)
    }

    /// Evaluates one path: returns `Ok(true)` if a new job was enqueued,
    /// `Ok(false)` if it was already fresh or already in flight.
    ///
    /// `seen` is held only for the duration of this call, as a lock against
    /// a concurrent scan/watch event for the same path racing in; it is
    /// always released before returning so a later modification is free to
    /// re-trigger discovery through the content-hash freshness check below
    /// rather than being swallowed by the seen-gate forever.
    pub async fn consider(&self, path: &Path, cancellation: &Arc<dyn CancellationSignal>) -> Result<bool, PipelineError> {
        if !self.seen.record(path) {
            debug!(path = %path.display(), "already in flight, skipping");
            return Ok(false);
        }

        let result = self.consider_unseen(path, cancellation).await;
        self.seen.forget(path);
        result
    }

    async fn consider_unseen(&self, path: &Path, cancellation: &Arc<dyn CancellationSignal>) -> Result<bool, PipelineError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(_) => {
                // File disappeared between directory listing/event and open.
                return Ok(false);
            }
        };
        let hash = ContentHash::of_bytes(&bytes);

        if self.cache.is_fresh(path, &hash).await? {
            return Ok(false);
        }

        let job = Job::new(path.to_path_buf(), hash, self.required_stages.clone());
        self.queue.enqueue(job, cancellation.clone()).await?;
        Ok(true)
    }
}
