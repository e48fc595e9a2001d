// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # File-backed Artifact Cache
//!
//! One JSON file per entry under a single directory, named `<CacheKey>.json`.
//! Writes go to a temporary sibling and are renamed into place so a
//! concurrent reader never observes a torn write. Advisory entry-count and
//! size counters are reconciled from disk on construction and kept under a
//! mutex; the files themselves need no lock because the rename is atomic
//! per-entry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pipeline_domain::entities::cache_entry::{CacheEntry, Index};
use pipeline_domain::entities::job::Job;
use pipeline_domain::repositories::artifact_cache::{ArtifactCache, CacheStats, QueryResult};
use pipeline_domain::repositories::stage_executor::{CancellationSignal, StageExecutor};
use pipeline_domain::value_objects::{CacheKey, ContentHash};
use pipeline_domain::PipelineError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;
use tracing::warn;

/// Above this many entries, `stats()` skips the per-status scan and reports
/// only the advisory counters, to keep the call's latency bounded.
const FAST_PATH_ENTRY_THRESHOLD: u64 = 100;

/// TTL sweep threshold: entries older than this (by `processed_at`) are
/// removed unconditionally during eviction, regardless of size/entry caps.
const MAX_ENTRY_AGE: Duration = Duration::from_secs(24 * 3600);

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    entries: u64,
    size_bytes: u64,
}

/// Artifact Cache backed by one `<CacheKey>.json` file per entry.
pub struct FileCache {
    dir: PathBuf,
    max_size_bytes: u64,
    max_entries: u64,
    /// Supplies `build_index` for newly stored entries; `None` skips
    /// indexing entirely (queries by index then always miss).
    indexer: Option<Arc<dyn StageExecutor>>,
    counters: Mutex<Counters>,
}

impl FileCache {
    /// Opens (creating if absent) the cache directory at `dir` and
    /// reconciles the advisory counters from what's already on disk.
    pub async fn open(
        dir: impl Into<PathBuf>,
        max_size_bytes: u64,
        max_entries: u64,
        indexer: Option<Arc<dyn StageExecutor>>,
    ) -> Result<Self, PipelineError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;

        let mut counters = Counters::default();
        let mut read_dir = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = read_dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Ok(meta) = entry.metadata().await {
                counters.entries += 1;
                counters.size_bytes += meta.len();
            }
        }

        Ok(Self {
            dir,
            max_size_bytes,
            max_entries,
            indexer,
            counters: Mutex::new(counters),
        })
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    async fn read_entry_file(path: &Path) -> Option<CacheEntry> {
        let bytes = tokio::fs::read(path).await.ok()?;
        match serde_json::from_slice::<CacheEntry>(&bytes) {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "malformed cache entry, treating as missing");
                None
            }
        }
    }

    async fn all_entry_paths(&self) -> Result<Vec<PathBuf>, PipelineError> {
        let mut paths = Vec::new();
        let mut read_dir = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = read_dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        Ok(paths)
    }
}

#[async_trait]
impl ArtifactCache for FileCache {
    async fn store(&self, job: &Job) -> Result<(), PipelineError> {
        let metadata = tokio::fs::metadata(&job.file_path)
            .await
            .map_err(|e| PipelineError::io_failure(format!("reading metadata for {}: {e}", job.file_path.display())))?;

        let mut stages = HashMap::new();
        for (stage_id, result) in &job.stage_results {
            let index: Option<Index> = if result.is_success {
                match &self.indexer {
                    Some(executor) => executor.build_index(stage_id, &result.content).await,
                    None => None,
                }
            } else {
                None
            };
            stages.insert(
                stage_id.clone(),
                pipeline_domain::entities::cache_entry::PersistedStageData {
                    content: result.content.clone(),
                    processed_at: result.processed_at,
                    duration_ms: result.duration_ms,
                    is_success: result.is_success,
                    error_message: result.error_message.clone(),
                    index,
                },
            );
        }

        let entry = CacheEntry {
            id: job.job_id.to_string(),
            file_path: job.file_path.clone(),
            content_hash: job.content_hash.as_str().to_string(),
            processed_at: Utc::now(),
            last_modified: metadata
                .modified()
                .ok()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(Utc::now),
            file_size: metadata.len(),
            status: job.status,
            stages,
        };

        let key = CacheKey::for_path(&job.file_path);
        let final_path = self.entry_path(&key);
        let tmp_path = self.dir.join(format!("{}.tmp", key.file_name()));

        let bytes = serde_json::to_vec_pretty(&entry)?;
        let previous_len = tokio::fs::metadata(&final_path).await.ok().map(|m| m.len());

        tokio::fs::write(&tmp_path, &bytes).await?;
        tokio::fs::rename(&tmp_path, &final_path).await?;

        let mut counters = self.counters.lock().await;
        match previous_len {
            Some(prev) => {
                counters.size_bytes = counters.size_bytes.saturating_sub(prev).saturating_add(bytes.len() as u64);
            }
            None => {
                counters.entries += 1;
                counters.size_bytes = counters.size_bytes.saturating_add(bytes.len() as u64);
            }
        }

        Ok(())
    }

    async fn load(&self, path: &Path) -> Result<Option<CacheEntry>, PipelineError> {
        let key = CacheKey::for_path(path);
        Ok(Self::read_entry_file(&self.entry_path(&key)).await)
    }

    async fn is_fresh(&self, path: &Path, current_hash: &ContentHash) -> Result<bool, PipelineError> {
        let entry = self.load(path).await?;
        Ok(entry
            .map(|e| e.is_complete() && e.content_hash == current_hash.as_str())
            .unwrap_or(false))
    }

    async fn invalidate(&self, path: &Path) -> Result<(), PipelineError> {
        let key = CacheKey::for_path(path);
        let file_path = self.entry_path(&key);
        if let Ok(meta) = tokio::fs::metadata(&file_path).await {
            tokio::fs::remove_file(&file_path).await?;
            let mut counters = self.counters.lock().await;
            counters.entries = counters.entries.saturating_sub(1);
            counters.size_bytes = counters.size_bytes.saturating_sub(meta.len());
        }
        Ok(())
    }

    async fn query_by_path(&self, glob_pattern: &str) -> Result<QueryResult, PipelineError> {
        let start = std::time::Instant::now();
        let pattern = glob::Pattern::new(glob_pattern)
            .map_err(|e| PipelineError::configuration(format!("invalid glob pattern: {e}")))?;

        let mut items = Vec::new();
        for path in self.all_entry_paths().await? {
            if let Some(entry) = Self::read_entry_file(&path).await {
                if pattern.matches(&entry.file_path.to_string_lossy()) {
                    items.push(entry);
                }
            }
        }

        let total_count = items.len();
        Ok(QueryResult {
            items,
            total_count,
            duration: start.elapsed(),
            metadata: HashMap::new(),
        })
    }

    async fn query_by_index(&self, key: &str, value: &str) -> Result<QueryResult, PipelineError> {
        let start = std::time::Instant::now();
        let mut items = Vec::new();
        for path in self.all_entry_paths().await? {
            if let Some(entry) = Self::read_entry_file(&path).await {
                let matches = entry.stages.values().any(|stage| {
                    stage
                        .index
                        .as_ref()
                        .and_then(|idx| idx.get(key))
                        .map(|v| v.as_str() == Some(value) || v.to_string().trim_matches('"') == value)
                        .unwrap_or(false)
                });
                if matches {
                    items.push(entry);
                }
            }
        }

        let total_count = items.len();
        Ok(QueryResult {
            items,
            total_count,
            duration: start.elapsed(),
            metadata: HashMap::new(),
        })
    }

    async fn stats(&self) -> Result<CacheStats, PipelineError> {
        let counters = *self.counters.lock().await;

        if counters.entries > FAST_PATH_ENTRY_THRESHOLD {
            return Ok(CacheStats {
                total_files: counters.entries,
                processed_files: counters.entries,
                failed_files: 0,
                total_size_bytes: counters.size_bytes,
                oldest_entry: None,
                newest_entry: None,
                per_stage_counts: HashMap::new(),
            });
        }

        let mut stats = CacheStats {
            total_files: 0,
            processed_files: 0,
            failed_files: 0,
            total_size_bytes: counters.size_bytes,
            oldest_entry: None,
            newest_entry: None,
            per_stage_counts: HashMap::new(),
        };

        for path in self.all_entry_paths().await? {
            let Some(entry) = Self::read_entry_file(&path).await else {
                continue;
            };
            stats.total_files += 1;
            if entry.is_complete() {
                stats.processed_files += 1;
            } else {
                stats.failed_files += 1;
            }
            stats.oldest_entry = Some(stats.oldest_entry.map_or(entry.processed_at, |o| o.min(entry.processed_at)));
            stats.newest_entry = Some(stats.newest_entry.map_or(entry.processed_at, |n| n.max(entry.processed_at)));
            for stage_id in entry.stages.keys() {
                *stats.per_stage_counts.entry(stage_id.as_str().to_string()).or_insert(0) += 1;
            }
        }

        Ok(stats)
    }

    async fn evict(&self, cancellation: Arc<dyn CancellationSignal>) -> Result<u64, PipelineError> {
        let mut evicted = 0u64;
        let now = SystemTime::now();

        struct Candidate {
            path: PathBuf,
            size: u64,
            accessed: SystemTime,
        }

        let mut candidates = Vec::new();
        for path in self.all_entry_paths().await? {
            if cancellation.is_canceled() {
                return Ok(evicted);
            }
            let Ok(meta) = tokio::fs::metadata(&path).await else {
                continue;
            };
            let accessed = meta.accessed().unwrap_or_else(|_| meta.modified().unwrap_or(now));

            // TTL sweep: remove entries whose recorded ProcessedAt exceeds MAX_ENTRY_AGE.
            if let Some(entry) = Self::read_entry_file(&path).await {
                let age = now
                    .duration_since(entry.processed_at.into())
                    .unwrap_or(Duration::ZERO);
                if age > MAX_ENTRY_AGE {
                    if tokio::fs::remove_file(&path).await.is_ok() {
                        let mut counters = self.counters.lock().await;
                        counters.entries = counters.entries.saturating_sub(1);
                        counters.size_bytes = counters.size_bytes.saturating_sub(meta.len());
                        evicted += 1;
                    }
                    continue;
                }
            }

            candidates.push(Candidate {
                path,
                size: meta.len(),
                accessed,
            });
        }

        let (mut entries, mut size_bytes) = {
            let counters = self.counters.lock().await;
            (counters.entries, counters.size_bytes)
        };

        if size_bytes <= self.max_size_bytes && entries <= self.max_entries {
            return Ok(evicted);
        }

        candidates.sort_by_key(|c| c.accessed);

        for candidate in candidates {
            if cancellation.is_canceled() {
                break;
            }
            if size_bytes <= self.max_size_bytes && entries <= self.max_entries {
                break;
            }
            if tokio::fs::remove_file(&candidate.path).await.is_ok() {
                entries = entries.saturating_sub(1);
                size_bytes = size_bytes.saturating_sub(candidate.size);
                evicted += 1;
            }
        }

        let mut counters = self.counters.lock().await;
        counters.entries = entries;
        counters.size_bytes = size_bytes;

        Ok(evicted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline_domain::entities::job::StageResult;
    use pipeline_domain::repositories::stage_executor::NeverCancel;
    use pipeline_domain::value_objects::StageId;
    use proptest::prelude::*;
    use tempfile::TempDir;

    async fn sample_job(dir: &TempDir, name: &str) -> Job {
        let path = dir.path().join(name);
        tokio::fs::write(&path, b"hello").await.unwrap();
        let hash = ContentHash::of_bytes(b"hello");
        let mut job = Job::new(path, hash, vec![StageId::new("s1")]);
        job.record_stage_result(StageId::new("s1"), StageResult::success("{}", 1));
        job.mark_completed();
        job
    }

    #[tokio::test]
    async fn store_then_load_round_trips() {
        let input_dir = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        let cache = FileCache::open(cache_dir.path(), 1024 * 1024, 100, None).await.unwrap();

        let job = sample_job(&input_dir, "a.md").await;
        cache.store(&job).await.unwrap();

        let loaded = cache.load(&job.file_path).await.unwrap().unwrap();
        assert!(loaded.is_complete());
        assert_eq!(loaded.content_hash, job.content_hash.as_str());
    }

    #[tokio::test]
    async fn is_fresh_matches_stored_hash_only() {
        let input_dir = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        let cache = FileCache::open(cache_dir.path(), 1024 * 1024, 100, None).await.unwrap();

        let job = sample_job(&input_dir, "a.md").await;
        cache.store(&job).await.unwrap();

        assert!(cache.is_fresh(&job.file_path, &job.content_hash).await.unwrap());
        assert!(!cache
            .is_fresh(&job.file_path, &ContentHash::of_bytes(b"different"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn invalidate_removes_entry_and_counters_stay_non_negative() {
        let input_dir = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        let cache = FileCache::open(cache_dir.path(), 1024 * 1024, 100, None).await.unwrap();

        let job = sample_job(&input_dir, "a.md").await;
        cache.store(&job).await.unwrap();
        cache.invalidate(&job.file_path).await.unwrap();
        cache.invalidate(&job.file_path).await.unwrap();

        assert!(cache.load(&job.file_path).await.unwrap().is_none());
        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.total_files, 0);
    }

    #[tokio::test]
    async fn eviction_respects_entry_cap() {
        let input_dir = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        let cache = FileCache::open(cache_dir.path(), 1024 * 1024, 1, None).await.unwrap();

        let job_a = sample_job(&input_dir, "a.md").await;
        cache.store(&job_a).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let job_b = sample_job(&input_dir, "b.md").await;
        cache.store(&job_b).await.unwrap();

        cache.evict(Arc::new(NeverCancel)).await.unwrap();

        let stats = cache.stats().await.unwrap();
        assert!(stats.total_files <= 1);
    }

    async fn sample_job_with_content(dir: &TempDir, name: &str, content: &[u8]) -> Job {
        let path = dir.path().join(name);
        tokio::fs::write(&path, content).await.unwrap();
        let hash = ContentHash::of_bytes(content);
        let mut job = Job::new(path, hash, vec![StageId::new("s1")]);
        job.record_stage_result(StageId::new("s1"), StageResult::success("{}", 1));
        job.mark_completed();
        job
    }

    proptest::proptest! {
        /// Invariant 3/round-trip: `Store(job) ; Load(job.FilePath)` returns a
        /// semantically equal entry, for arbitrary file sizes.
        #[test]
        fn store_then_load_round_trips_for_arbitrary_sizes(size in 0usize..4096) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let input_dir = TempDir::new().unwrap();
                let cache_dir = TempDir::new().unwrap();
                let cache = FileCache::open(cache_dir.path(), u64::MAX, u64::MAX, None).await.unwrap();

                let content = vec![b'x'; size];
                let job = sample_job_with_content(&input_dir, "a.md", &content).await;
                cache.store(&job).await.unwrap();

                let loaded = cache.load(&job.file_path).await.unwrap().unwrap();
                prop_assert_eq!(loaded.content_hash.as_str(), job.content_hash.as_str());
                prop_assert_eq!(loaded.file_size, size as u64);
                prop_assert!(loaded.is_complete());
                Ok(())
            }).unwrap();
        }

        /// Invariant 6: cache size/entry counters never go negative, even
        /// under arbitrary interleavings of store and (possibly repeated)
        /// invalidate for the same and different paths.
        #[test]
        fn counters_never_go_negative_under_arbitrary_store_invalidate_sequences(
            ops in proptest::collection::vec((0usize..4, 0usize..256), 0..30)
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let input_dir = TempDir::new().unwrap();
                let cache_dir = TempDir::new().unwrap();
                let cache = FileCache::open(cache_dir.path(), u64::MAX, u64::MAX, None).await.unwrap();

                for (file_index, size) in ops {
                    let name = format!("f{file_index}.md");
                    let content = vec![b'y'; size];
                    let job = sample_job_with_content(&input_dir, &name, &content).await;
                    cache.store(&job).await.unwrap();
                    // Invalidate twice: the second call must be a no-op, not
                    // an underflow.
                    cache.invalidate(&job.file_path).await.unwrap();
                    cache.invalidate(&job.file_path).await.unwrap();

                    let counters = *cache.counters.lock().await;
                    prop_assert!(counters.entries < u64::MAX / 2);
                    prop_assert!(counters.size_bytes < u64::MAX / 2);
                }

                let stats = cache.stats().await.unwrap();
                prop_assert_eq!(stats.total_files, 0);
                prop_assert_eq!(stats.total_size_bytes, 0);
                Ok(())
            }).unwrap();
        }
    }
}
