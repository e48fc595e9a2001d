// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Watcher
//!
//! Watches `InputDirectory` for create/modify events after the initial
//! [`Discovery`](crate::discovery::Discovery) scan completes, debouncing
//! bursts of filesystem events before re-checking freshness and enqueueing.

use crate::discovery::Discovery;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, DebouncedEventKind};
use pipeline_domain::repositories::stage_executor::CancellationSignal;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

const DEBOUNCE_INTERVAL: Duration = Duration::from_secs(1);
const MAX_CONCURRENT_EVENTS: usize = 4;

/// Owns the filesystem watch and the task draining debounced events. Drop
/// (or call [`Watcher::stop`]) to tear both down.
pub struct Watcher {
    _debouncer: notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>,
    drain_task: JoinHandle<()>,
    processed: Arc<AtomicUsize>,
}

impl Watcher {
    /// Starts watching `input_dir`. Every debounced event is re-evaluated
    /// against `discovery` (which applies the seen-set and freshness check)
    /// with at most [`MAX_CONCURRENT_EVENTS`] evaluations in flight.
    pub fn start(
        input_dir: &Path,
        discovery: Arc<Discovery>,
        cancellation: Arc<dyn CancellationSignal>,
    ) -> Result<Self, notify::Error> {
        let (tx, mut rx) = mpsc::unbounded_channel::<PathBuf>();

        let mut debouncer = new_debouncer(DEBOUNCE_INTERVAL, move |result: DebounceEventResult| match result {
            Ok(events) => {
                for event in events {
                    if event.kind == DebouncedEventKind::Any && tx.send(event.path.clone()).is_err() {
                        warn!(path = %event.path.display(), "watcher event channel closed, dropping event");
                    }
                }
            }
            Err(error) => error!(%error, "filesystem watch error"),
        })?;
        debouncer.watcher().watch(input_dir, notify::RecursiveMode::NonRecursive)?;

        let processed = Arc::new(AtomicUsize::new(0));
        let processed_handle = processed.clone();
        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_EVENTS));

        let drain_task = tokio::spawn(async move {
            while let Some(path) = rx.recv().await {
                if cancellation.is_canceled() {
                    break;
                }
                let permit = match semaphore.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => break,
                };
                let discovery = discovery.clone();
                let cancellation = cancellation.clone();
                let processed = processed_handle.clone();

                tokio::spawn(async move {
                    let _permit = permit;
                    if !path.exists() {
                        debug!(path = %path.display(), "watched path no longer exists, skipping");
                        return;
                    }
                    match discovery.consider(&path, &cancellation).await {
                        Ok(enqueued) => {
                            if enqueued {
                                processed.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                        Err(error) => warn!(path = %path.display(), %error, "failed to process watch event"),
                    }
                });
            }
        });

        Ok(Self {
            _debouncer: debouncer,
            drain_task,
            processed,
        })
    }

    pub fn enqueued_count(&self) -> usize {
        self.processed.load(Ordering::Relaxed)
    }

    /// Stops the drain task. The underlying OS watch is torn down when
    /// `self` (and its debouncer) drops.
    pub fn stop(self) {
        self.drain_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FileCache;
    use crate::queue::BoundedJobQueue;
    use crate::discovery::SeenSet;
    use pipeline_domain::repositories::artifact_cache::ArtifactCache;
    use pipeline_domain::repositories::job_queue::JobQueue;
    use pipeline_domain::repositories::stage_executor::NeverCancel;
    use pipeline_domain::value_objects::StageId;
    use tempfile::TempDir;
    use tokio::time::sleep;

    #[tokio::test]
    async fn watcher_enqueues_newly_created_files() {
        let input_dir = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        let cache: Arc<dyn ArtifactCache> = Arc::new(FileCache::open(cache_dir.path(), 1024 * 1024, 100, None).await.unwrap());
        let queue: Arc<dyn JobQueue> = Arc::new(BoundedJobQueue::new(100, 3, Duration::from_secs(1), Duration::from_secs(60), 100, 100));
        let discovery = Arc::new(Discovery::new(cache, queue.clone(), Arc::new(SeenSet::new()), vec![StageId::new("s1")]));

        let watcher = Watcher::start(input_dir.path(), discovery, Arc::new(NeverCancel)).unwrap();

        tokio::fs::write(input_dir.path().join("new.md"), b"hi").await.unwrap();
        sleep(Duration::from_secs(2)).await;

        let dequeued = queue.dequeue(Arc::new(NeverCancel)).await.unwrap();
        assert!(dequeued.is_some());
        watcher.stop();
    }
}
