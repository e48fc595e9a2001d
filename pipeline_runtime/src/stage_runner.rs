// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stage Runner
//!
//! Drives one job's `required_stages` in order against the external
//! [`StageExecutor`], consulting the [`ArtifactCache`] to skip stages
//! already completed for this file's current content hash.

use pipeline_domain::entities::job::{Job, StageResult};
use pipeline_domain::repositories::artifact_cache::ArtifactCache;
use pipeline_domain::repositories::stage_executor::{ProcessingContext, StageExecutor, ValidationOutcome};
use pipeline_domain::PipelineError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

/// Outcome of running a job's stages to completion or to its first failure.
pub enum RunOutcome {
    /// Every required stage succeeded; the entry has been persisted.
    Completed { aggregated_result: String },
    /// A stage failed; the job should be handed back for retry decisioning.
    Failed { error: PipelineError },
}

pub struct StageRunner {
    cache: Arc<dyn ArtifactCache>,
    executor: Arc<dyn StageExecutor>,
    processing_timeout: Duration,
}

impl StageRunner {
    pub fn new(cache: Arc<dyn ArtifactCache>, executor: Arc<dyn StageExecutor>, processing_timeout: Duration) -> Self {
        Self {
            cache,
            executor,
            processing_timeout,
        }
    }

    /// Runs `job` through its required stages, pre-populating already-cached
    /// successes, executing the rest in order, and persisting the whole
    /// entry once every stage has succeeded.
    #[instrument(skip(self, job, cancellation), fields(job_id = %job.job_id, file = %job.file_path.display()))]
    pub async fn run(&self, job: &mut Job, cancellation: Arc<dyn pipeline_domain::CancellationSignal>) -> RunOutcome {
        if let Ok(Some(entry)) = self.cache.load(&job.file_path).await {
            if entry.content_hash == job.content_hash.as_str() {
                for stage in &job.required_stages {
                    if let Some(persisted) = entry.successful_stage(stage) {
                        job.stage_results.insert(
                            stage.clone(),
                            StageResult {
                                is_success: true,
                                content: persisted.content.clone(),
                                processed_at: persisted.processed_at,
                                duration_ms: persisted.duration_ms,
                                error_message: None,
                            },
                        );
                    }
                }
            }
        }

        for stage in job.required_stages.clone() {
            if job.is_stage_successful(&stage) {
                continue;
            }

            job.current_stage = Some(stage.clone());
            let ctx = ProcessingContext::new(job.retry_count + 1, self.processing_timeout, cancellation.clone());

            let started = Instant::now();
            let result = tokio::select! {
                result = self.executor.execute_stage(job, &stage, &ctx) => result,
                _ = tokio::time::sleep(self.processing_timeout) => {
                    Err(PipelineError::timeout(format!("stage {stage} exceeded processing timeout")))
                }
            };

            let result = match result {
                Ok(result) => result,
                Err(error) => return RunOutcome::Failed { error },
            };

            if !result.is_success {
                let message = result.error_message.clone().unwrap_or_else(|| "stage failed".to_string());
                job.record_stage_result(stage.clone(), result);
                return RunOutcome::Failed {
                    error: PipelineError::transient(message),
                };
            }

            match self.executor.validate(&stage, &result.content).await {
                Ok(ValidationOutcome::Valid) => {}
                Ok(ValidationOutcome::Invalid(reason)) => {
                    job.record_stage_result(
                        stage.clone(),
                        StageResult {
                            is_success: false,
                            content: result.content,
                            processed_at: result.processed_at,
                            duration_ms: result.duration_ms,
                            error_message: Some(reason.clone()),
                        },
                    );
                    return RunOutcome::Failed {
                        error: PipelineError::validation(format!("stage {stage}: {reason}")),
                    };
                }
                Err(error) => return RunOutcome::Failed { error },
            }

            info!(stage = %stage, duration_ms = started.elapsed().as_millis() as u64, "stage succeeded");
            job.record_stage_result(stage, result);
        }

        if !job.all_stages_successful() {
            return RunOutcome::Failed {
                error: PipelineError::permanent("not every required stage has a successful result"),
            };
        }

        let mut aggregated = serde_json::Map::new();
        for stage in &job.required_stages {
            if let Some(result) = job.stage_results.get(stage) {
                if result.content.is_empty() {
                    continue;
                }
                match serde_json::from_str::<serde_json::Value>(&result.content) {
                    Ok(value) => {
                        aggregated.insert(
                            stage.as_str().to_string(),
                            serde_json::json!({ "duration_ms": result.duration_ms, "payload": value }),
                        );
                    }
                    Err(_) => {
                        warn!(stage = %stage, "final validation failed: content is not well-formed JSON");
                        return RunOutcome::Failed {
                            error: PipelineError::validation(format!("stage {stage} content is not valid JSON")),
                        };
                    }
                }
            }
        }

        job.mark_completed();
        if let Err(error) = self.cache.store(job).await {
            return RunOutcome::Failed { error };
        }

        RunOutcome::Completed {
            aggregated_result: serde_json::Value::Object(aggregated).to_string(),
        }
    }
}
