// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pass-Through Stage Executor
//!
//! Wraps a file's raw bytes as UTF-8 JSON content and reports success for
//! every supported stage, unchanged. Useful as a default executor for
//! demos and for exercising the Stage Runner/Worker Pool/Cache without a
//! real analysis backend.

use async_trait::async_trait;
use pipeline_domain::entities::cache_entry::Index;
use pipeline_domain::entities::job::{Job, StageResult};
use pipeline_domain::repositories::stage_executor::{ProcessingContext, StageExecutor, ValidationOutcome};
use pipeline_domain::value_objects::StageId;
use pipeline_domain::PipelineError;
use std::time::Instant;

pub struct PassThroughExecutor {
    stages: Vec<StageId>,
}

impl PassThroughExecutor {
    pub fn new(stages: Vec<StageId>) -> Self {
        Self { stages }
    }
}

#[async_trait]
impl StageExecutor for PassThroughExecutor {
    async fn execute_stage(&self, job: &Job, _stage: &StageId, _ctx: &ProcessingContext) -> Result<StageResult, PipelineError> {
        let started = Instant::now();
        let bytes = tokio::fs::read(&job.file_path)
            .await
            .map_err(|e| PipelineError::transient(format!("reading {}: {e}", job.file_path.display())))?;

        let text = String::from_utf8_lossy(&bytes).into_owned();
        let content = serde_json::json!({ "text": text }).to_string();

        Ok(StageResult::success(content, started.elapsed().as_millis() as u64))
    }

    async fn validate(&self, _stage: &StageId, content: &str) -> Result<ValidationOutcome, PipelineError> {
        match serde_json::from_str::<serde_json::Value>(content) {
            Ok(_) => Ok(ValidationOutcome::Valid),
            Err(e) => Ok(ValidationOutcome::Invalid(e.to_string())),
        }
    }

    async fn build_index(&self, _stage: &StageId, _content: &str) -> Option<Index> {
        None
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
    use std::path::PathBuf;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn wraps_file_content_as_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.md");
        tokio::fs::write(&path, b"hello").await.unwrap();

        let executor = PassThroughExecutor::new(vec![StageId::new("s1")]);
        let job = Job::new(path, ContentHash::of_bytes(b"hello"), vec![StageId::new("s1")]);
        let ctx = ProcessingContext::new(1, std::time::Duration::from_secs(5), Arc::new(NeverCancel));

        let result = executor.execute_stage(&job, &StageId::new("s1"), &ctx).await.unwrap();
        assert!(result.is_success);
        assert!(result.content.contains("hello"));
    }

    #[tokio::test]
    async fn validate_accepts_well_formed_json() {
        let executor = PassThroughExecutor::new(vec![StageId::new("s1")]);
        let outcome = executor.validate(&StageId::new("s1"), "{}").await.unwrap();
        assert_eq!(outcome, ValidationOutcome::Valid);
    }

    #[tokio::test]
    async fn validate_rejects_malformed_json() {
        let executor = PassThroughExecutor::new(vec![StageId::new("s1")]);
        let outcome = executor.validate(&StageId::new("s1"), "{not json").await.unwrap();
        assert!(matches!(outcome, ValidationOutcome::Invalid(_)));
    }
}
