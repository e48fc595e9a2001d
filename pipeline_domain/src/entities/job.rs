// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Job Entity
//!
//! A `Job` is the unit of work the Job Queue, Worker Pool, and Stage Runner
//! cooperate on: one file driven through its `RequiredStages` in order.
//!
//! Ownership is exclusive at every point in a job's life (queue buffer, a
//! single worker, or the completed set) and `Status=Completed` is terminal:
//! once every required stage has a successful [`StageResult`], the job never
//! transitions again.

use crate::value_objects::{ContentHash, JobId, StageId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    Processing,
    Retrying,
    Completed,
    Failed,
}

/// The outcome of running one stage against a job's file.
///
/// `IsSuccess ⇒ Content` is non-empty and passed the executor-provided
/// validator; the Stage Runner never persists a [`StageResult`] that
/// violates this invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageResult {
    pub is_success: bool,
    pub content: String,
    pub processed_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub error_message: Option<String>,
}

impl StageResult {
    pub fn success(content: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            is_success: true,
            content: content.into(),
            processed_at: Utc::now(),
            duration_ms,
            error_message: None,
        }
    }

    pub fn failure(error_message: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            is_success: false,
            content: String::new(),
            processed_at: Utc::now(),
            duration_ms,
            error_message: Some(error_message.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: JobId,
    pub file_path: PathBuf,
    pub content_hash: ContentHash,
    pub status: JobStatus,
    pub required_stages: Vec<StageId>,
    pub current_stage: Option<StageId>,
    pub stage_results: HashMap<StageId, StageResult>,
    pub retry_count: u32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl Job {
    pub fn new(file_path: PathBuf, content_hash: ContentHash, required_stages: Vec<StageId>) -> Self {
        Self {
            job_id: JobId::new(),
            file_path,
            content_hash,
            status: JobStatus::Pending,
            required_stages,
            current_stage: None,
            stage_results: HashMap::new(),
            retry_count: 0,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            last_error: None,
        }
    }

    /// True iff `stage` already has a successful recorded result, whether
    /// from this run or pre-populated from the cache.
    pub fn is_stage_successful(&self, stage: &StageId) -> bool {
        self.stage_results.get(stage).map(|r| r.is_success).unwrap_or(false)
    }

    /// True iff every required stage has a successful result. This is the
    /// only condition under which a job may transition to `Completed`.
    pub fn all_stages_successful(&self) -> bool {
        self.required_stages.iter().all(|s| self.is_stage_successful(s))
    }

    pub fn record_stage_result(&mut self, stage: StageId, result: StageResult) {
        self.current_stage = Some(stage.clone());
        self.stage_results.insert(stage, result);
    }

    pub fn mark_processing(&mut self) {
        self.status = JobStatus::Processing;
        self.started_at = Some(Utc::now());
    }

    pub fn mark_completed(&mut self) {
        self.status = JobStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.completed_at = Some(Utc::now());
        self.last_error = Some(reason.into());
    }

    /// Clears the transient timing fields ahead of a retry, per the queue's
    /// `EnqueueRetry` contract.
    pub fn reset_for_retry(&mut self) {
        self.status = JobStatus::Pending;
        self.started_at = None;
        self.completed_at = None;
    }

    pub fn processing_duration(&self) -> Option<chrono::Duration> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stages(names: &[&str]) -> Vec<StageId> {
        names.iter().map(|n| StageId::new(*n)).collect()
    }

    #[test]
    fn new_job_starts_pending_with_no_results() {
        let job = Job::new(PathBuf::from("a.md"), ContentHash::of_bytes(b"x"), stages(&["s1"]));
        assert_eq!(job.status, JobStatus::Pending);
        assert!(!job.all_stages_successful());
    }

    #[test]
    fn completed_requires_every_required_stage_successful() {
        let mut job = Job::new(PathBuf::from("a.md"), ContentHash::of_bytes(b"x"), stages(&["s1", "s2"]));
        job.record_stage_result(StageId::new("s1"), StageResult::success("{}", 1));
        assert!(!job.all_stages_successful());
        job.record_stage_result(StageId::new("s2"), StageResult::success("{}", 1));
        assert!(job.all_stages_successful());
    }

    #[test]
    fn a_failed_stage_result_does_not_count_as_successful() {
        let mut job = Job::new(PathBuf::from("a.md"), ContentHash::of_bytes(b"x"), stages(&["s1"]));
        job.record_stage_result(StageId::new("s1"), StageResult::failure("boom", 1));
        assert!(!job.is_stage_successful(&StageId::new("s1")));
        assert!(!job.all_stages_successful());
    }

    #[test]
    fn reset_for_retry_clears_timing_but_keeps_identity() {
        let mut job = Job::new(PathBuf::from("a.md"), ContentHash::of_bytes(b"x"), stages(&["s1"]));
        let id = job.job_id;
        job.mark_processing();
        job.reset_for_retry();
        assert_eq!(job.job_id, id);
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.started_at.is_none());
    }

    proptest::proptest! {
        /// Invariant 5: a job reports `all_stages_successful` iff every
        /// required stage has a recorded, successful result, for an
        /// arbitrary number of required stages and an arbitrary subset of
        /// them recorded as successful.
        #[test]
        fn all_stages_successful_matches_recorded_success_set(
            stage_count in 1usize..8,
            successful_count in 0usize..8,
        ) {
            let names: Vec<String> = (0..stage_count).map(|i| format!("s{i}")).collect();
            let required = stages(&names.iter().map(String::as_str).collect::<Vec<_>>());
            let mut job = Job::new(PathBuf::from("a.md"), ContentHash::of_bytes(b"x"), required.clone());

            let successful_count = successful_count.min(stage_count);
            for stage in required.iter().take(successful_count) {
                job.record_stage_result(stage.clone(), StageResult::success("{}", 1));
            }
            for stage in required.iter().skip(successful_count) {
                job.record_stage_result(stage.clone(), StageResult::failure("boom", 1));
            }

            proptest::prop_assert_eq!(job.all_stages_successful(), successful_count == stage_count);
        }
    }
}
