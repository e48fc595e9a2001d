// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! End-to-end scenarios exercising the Supervisor's full startup, process,
//! and shutdown path against a real temp directory and cache.

use pipeline_domain::repositories::artifact_cache::ArtifactCache;
use pipeline_domain::repositories::stage_executor::{CancellationSignal, ManualCancel, NeverCancel};
use pipeline_domain::value_objects::StageId;
use pipeline_domain::PipelineConfig;
use pipeline_runtime::executors::{DebugExecutor, PassThroughExecutor};
use pipeline_runtime::Supervisor;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn config_for(input_dir: &TempDir) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.input_directory = input_dir.path().to_string_lossy().into_owned();
    config.file_pattern = "*.md".to_string();
    config.enable_file_watcher = false;
    config.polling_interval_secs = 1;
    config
}

#[tokio::test]
async fn cold_start_processes_one_file() {
    let input_dir = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    tokio::fs::write(input_dir.path().join("a.md"), b"hello world").await.unwrap();

    let executor = Arc::new(PassThroughExecutor::new(vec![StageId::new("analyze")]));
    let shutdown: Arc<dyn CancellationSignal> = Arc::new(NeverCancel);
    let supervisor = Supervisor::new(config_for(&input_dir), cache_dir.path().to_path_buf(), executor, shutdown)
        .await
        .unwrap();

    supervisor.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let stats = supervisor.queue().stats().await;
    assert_eq!(stats.completed_jobs, 1);

    let cache_stats = supervisor.cache().stats().await.unwrap();
    assert_eq!(cache_stats.processed_files, 1);

    supervisor.shutdown().await.unwrap();
}

#[tokio::test]
async fn warm_start_does_not_reprocess_unchanged_file() {
    let input_dir = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    tokio::fs::write(input_dir.path().join("a.md"), b"unchanged").await.unwrap();

    let executor = Arc::new(PassThroughExecutor::new(vec![StageId::new("analyze")]));
    let shutdown: Arc<dyn CancellationSignal> = Arc::new(NeverCancel);

    let first = Supervisor::new(
        config_for(&input_dir),
        cache_dir.path().to_path_buf(),
        executor.clone(),
        shutdown.clone(),
    )
    .await
    .unwrap();
    first.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    first.shutdown().await.unwrap();

    let second = Supervisor::new(config_for(&input_dir), cache_dir.path().to_path_buf(), executor, shutdown)
        .await
        .unwrap();
    second.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let stats = second.queue().stats().await;
    assert_eq!(stats.completed_jobs, 0);
    second.shutdown().await.unwrap();
}

#[tokio::test]
async fn retries_exhausted_marks_job_failed_without_caching() {
    let input_dir = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    tokio::fs::write(input_dir.path().join("a.md"), b"will fail").await.unwrap();

    let mut config = config_for(&input_dir);
    config.max_retry_attempts = 2;
    config.retry_delay_secs = 1;

    // Never succeeds: fail_before_success greater than attempts the worker will make.
    let executor = Arc::new(DebugExecutor::new(vec![StageId::new("analyze")], "flaky", u32::MAX));
    let shutdown: Arc<dyn CancellationSignal> = Arc::new(NeverCancel);
    let supervisor = Supervisor::new(config, cache_dir.path().to_path_buf(), executor, shutdown).await.unwrap();

    supervisor.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(4)).await;

    let stats = supervisor.queue().stats().await;
    assert_eq!(stats.failed_jobs, 1);
    assert_eq!(stats.completed_jobs, 0);

    let cache_stats = supervisor.cache().stats().await.unwrap();
    assert_eq!(cache_stats.processed_files, 0);

    supervisor.shutdown().await.unwrap();
}

#[tokio::test]
async fn graceful_shutdown_stops_accepting_new_jobs() {
    let input_dir = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    tokio::fs::write(input_dir.path().join("a.md"), b"content").await.unwrap();

    let executor = Arc::new(PassThroughExecutor::new(vec![StageId::new("analyze")]));
    let manual = Arc::new(ManualCancel::new());
    let shutdown: Arc<dyn CancellationSignal> = manual.clone();
    let supervisor = Supervisor::new(config_for(&input_dir), cache_dir.path().to_path_buf(), executor, shutdown)
        .await
        .unwrap();

    supervisor.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    manual.cancel();
    supervisor.shutdown().await.unwrap();

    let queue = supervisor.queue();
    let err = queue.enqueue(
        pipeline_domain::Job::new(
            input_dir.path().join("b.md"),
            pipeline_domain::value_objects::ContentHash::of_bytes(b"x"),
            vec![StageId::new("analyze")],
        ),
        Arc::new(NeverCancel),
    )
    .await;
    assert!(err.is_err());
}
