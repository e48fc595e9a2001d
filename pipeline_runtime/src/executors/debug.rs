// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Debug Stage Executor
//!
//! A diagnostic executor that computes a SHA-256 checksum of the file and
//! can be scripted to fail a fixed number of times before succeeding, so
//! tests can exercise the Worker Pool's retry-then-recover path
//! deterministically without a real analysis backend.

use async_trait::async_trait;
use pipeline_domain::entities::cache_entry::Index;
use pipeline_domain::entities::job::{Job, StageResult};
use pipeline_domain::repositories::stage_executor::{ProcessingContext, StageExecutor, ValidationOutcome};
use pipeline_domain::value_objects::StageId;
use pipeline_domain::PipelineError;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Executor that fails `fail_before_success` times per stage before
/// succeeding, used to drive scripted retry scenarios in tests.
pub struct DebugExecutor {
    stages: Vec<StageId>,
    label: String,
    fail_before_success: u32,
    attempts: HashMap<StageId, Arc<AtomicU32>>,
}

impl DebugExecutor {
    pub fn new(stages: Vec<StageId>, label: impl Into<String>, fail_before_success: u32) -> Self {
        let attempts = stages.iter().cloned().map(|s| (s, Arc::new(AtomicU32::new(0)))).collect();
        Self {
            stages,
            label: label.into(),
            fail_before_success,
            attempts,
        }
    }
}

#[async_trait]
impl StageExecutor for DebugExecutor {
    async fn execute_stage(&self, job: &Job, stage: &StageId, _ctx: &ProcessingContext) -> Result<StageResult, PipelineError> {
        let started = Instant::now();

        if let Some(counter) = self.attempts.get(stage) {
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            if attempt < self.fail_before_success {
                return Ok(StageResult::failure(
                    format!("{}: scripted failure (attempt {})", self.label, attempt + 1),
                    started.elapsed().as_millis() as u64,
                ));
            }
        }

        let bytes = tokio::fs::read(&job.file_path)
            .await
            .map_err(|e| PipelineError::transient(format!("reading {}: {e}", job.file_path.display())))?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let checksum = hex::encode(hasher.finalize());

        let content = serde_json::json!({
            "label": self.label,
            "checksum": checksum,
            "bytes": bytes.len(),
        })
        .to_string();

        Ok(StageResult::success(content, started.elapsed().as_millis() as u64))
    }

    async fn validate(&self, _stage: &StageId, content: &str) -> Result<ValidationOutcome, PipelineError> {
        match serde_json::from_str::<serde_json::Value>(content) {
            Ok(value) if value.get("checksum").is_some() => Ok(ValidationOutcome::Valid),
            Ok(_) => Ok(ValidationOutcome::Invalid("missing checksum field".to_string())),
            Err(e) => Ok(ValidationOutcome::Invalid(e.to_string())),
        }
    }

    async fn build_index(&self, _stage: &StageId, content: &str) -> Option<Index> {
        let value: serde_json::Value = serde_json::from_str(content).ok()?;
        let checksum = value.get("checksum")?.clone();
        let mut index = HashMap::new();
        index.insert("checksum".to_string(), checksum);
        Some(index)
    }

    fn supported_stages(&self) -> Vec<StageId> {
        self.stages.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline_domain::repositories::stage_executor::NeverCancel;
    use pipeline_domain::value_objects::ContentHash;
    use tempfile::TempDir;

    async fn sample_job(dir: &TempDir) -> Job {
        let path = dir.path().join("a.md");
        tokio::fs::write(&path, b"hello").await.unwrap();
        Job::new(path, ContentHash::of_bytes(b"hello"), vec![StageId::new("s1")])
    }

    #[tokio::test]
    async fn fails_scripted_number_of_times_then_succeeds() {
        let dir = TempDir::new().unwrap();
        let job = sample_job(&dir).await;
        let executor = DebugExecutor::new(vec![StageId::new("s1")], "test", 2);
        let ctx = ProcessingContext::new(1, std::time::Duration::from_secs(5), Arc::new(NeverCancel));

        let first = executor.execute_stage(&job, &StageId::new("s1"), &ctx).await.unwrap();
        assert!(!first.is_success);
        let second = executor.execute_stage(&job, &StageId::new("s1"), &ctx).await.unwrap();
        assert!(!second.is_success);
        let third = executor.execute_stage(&job, &StageId::new("s1"), &ctx).await.unwrap();
        assert!(third.is_success);
    }

    #[tokio::test]
    async fn build_index_surfaces_checksum() {
        let dir = TempDir::new().unwrap();
        let job = sample_job(&dir).await;
        let executor = DebugExecutor::new(vec![StageId::new("s1")], "test", 0);
        let ctx = ProcessingContext::new(1, std::time::Duration::from_secs(5), Arc::new(NeverCancel));

        let result = executor.execute_stage(&job, &StageId::new("s1"), &ctx).await.unwrap();
        let index = executor.build_index(&StageId::new("s1"), &result.content).await.unwrap();
        assert!(index.contains_key("checksum"));
    }
}
