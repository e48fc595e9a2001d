// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Cache Entry
//!
//! The persistent, on-disk record the Artifact Cache stores for one file:
//! one `<CacheKey>.json` document under the cache directory, written with
//! write-to-temp-then-rename so a reader never observes a partial write.
//!
//! An entry exists on disk iff the file at `file_path` was processed at
//! `file_hash`; `status == Completed` iff every required stage recorded in
//! `level_data` has `is_success`. Unknown JSON fields are ignored on read so
//! the format can grow without breaking entries written by an older build.

use super::job::JobStatus;
use crate::value_objects::StageId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Opaque key-value summary a per-stage indexer precomputes from a stage's
/// content, so queries can answer without reparsing `Content`.
pub type Index = HashMap<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedStageData {
    #[serde(rename = "Content")]
    pub content: String,
    #[serde(rename = "ProcessedAt")]
    pub processed_at: DateTime<Utc>,
    #[serde(rename = "ProcessingDuration")]
    pub duration_ms: u64,
    #[serde(rename = "IsSuccess")]
    pub is_success: bool,
    #[serde(rename = "ErrorMessage", default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(rename = "IndexedData", default, skip_serializing_if = "Option::is_none")]
    pub index: Option<Index>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "FilePath")]
    pub file_path: PathBuf,
    #[serde(rename = "FileHash")]
    pub content_hash: String,
    #[serde(rename = "ProcessedAt")]
    pub processed_at: DateTime<Utc>,
    #[serde(rename = "LastModified")]
    pub last_modified: DateTime<Utc>,
    #[serde(rename = "FileSize")]
    pub file_size: u64,
    #[serde(rename = "Status")]
    pub status: JobStatus,
    #[serde(rename = "LevelData")]
    pub stages: HashMap<StageId, PersistedStageData>,
}

impl CacheEntry {
    pub fn is_complete(&self) -> bool {
        matches!(self.status, JobStatus::Completed) && self.stages.values().all(|s| s.is_success)
    }

    pub fn successful_stage(&self, stage: &StageId) -> Option<&PersistedStageData> {
        self.stages.get(stage).filter(|s| s.is_success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CacheEntry {
        let mut stages = HashMap::new();
        stages.insert(
            StageId::new("extract"),
            PersistedStageData {
                content: "{}".into(),
                processed_at: Utc::now(),
                duration_ms: 5,
                is_success: true,
                error_message: None,
                index: None,
            },
        );
        CacheEntry {
            id: "deadbeef".into(),
            file_path: PathBuf::from("/tmp/a.md"),
            content_hash: "abc123".into(),
            processed_at: Utc::now(),
            last_modified: Utc::now(),
            file_size: 42,
            status: JobStatus::Completed,
            stages,
        }
    }

    #[test]
    fn complete_requires_status_completed_and_every_stage_successful() {
        assert!(sample().is_complete());

        let mut entry = sample();
        entry.status = JobStatus::Failed;
        assert!(!entry.is_complete());
    }

    #[test]
    fn round_trips_through_json_with_spec_field_names() {
        let entry = sample();
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"Id\""));
        assert!(json.contains("\"FilePath\""));
        assert!(json.contains("\"FileHash\""));
        assert!(json.contains("\"ProcessedAt\""));
        assert!(json.contains("\"LastModified\""));
        assert!(json.contains("\"FileSize\""));
        assert!(json.contains("\"Status\""));
        assert!(json.contains("\"LevelData\""));
        assert!(json.contains("\"ProcessingDuration\""));
        assert!(json.contains("\"IsSuccess\""));
        let back: CacheEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, entry.id);
    }

    #[test]
    fn unknown_fields_are_ignored_on_read() {
        let json = r#"{
            "Id": "x", "FilePath": "/tmp/a.md", "FileHash": "abc",
            "ProcessedAt": "2024-01-01T00:00:00Z", "LastModified": "2024-01-01T00:00:00Z",
            "FileSize": 1, "Status": "Completed", "LevelData": {}, "future_field": 123
        }"#;
        let entry: CacheEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.id, "x");
    }
}
