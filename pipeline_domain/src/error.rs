// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! A hierarchical error type for the pipeline processing domain, organized
//! around the error kinds that drive retry and queue-transition decisions
//! rather than around where in the code an error originated.
//!
//! ## Error Categories
//!
//! - **Transient**: executor network error, I/O glitch. Eligible for retry.
//! - **Timeout**: a stage exceeded its processing timeout. Eligible for retry.
//! - **Validation**: executor output failed the stage validator. Eligible for
//!   retry.
//! - **Canceled**: external cancellation. Never retried.
//! - **Permanent**: retries exhausted, or an unrecoverable file-read failure.
//! - **QueueClosed**: the queue's writer has been closed.
//! - **IoFailure**: cache write/read failure.
//! - **Configuration** / **Serialization**: ambient-stack errors, never
//!   retried.

use thiserror::Error;

/// Domain-specific errors for the pipeline processing system.
///
/// Each variant corresponds to one of the error kinds that the Worker Pool's
/// retry decisioning and the Supervisor's statistics reporting depend on.
#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    #[error("transient error: {0}")]
    Transient(String),

    #[error("operation timed out: {0}")]
    Timeout(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("canceled: {0}")]
    Canceled(String),

    #[error("permanent failure: {0}")]
    Permanent(String),

    #[error("queue closed: {0}")]
    QueueClosed(String),

    #[error("cache I/O failure: {0}")]
    IoFailure(String),

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl PipelineError {
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn canceled(msg: impl Into<String>) -> Self {
        Self::Canceled(msg.into())
    }

    pub fn permanent(msg: impl Into<String>) -> Self {
        Self::Permanent(msg.into())
    }

    pub fn queue_closed(msg: impl Into<String>) -> Self {
        Self::QueueClosed(msg.into())
    }

    pub fn io_failure(msg: impl Into<String>) -> Self {
        Self::IoFailure(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Whether the Worker Pool should retry the job that produced this error.
    ///
    /// `Canceled`, `Permanent`, `QueueClosed`, `Configuration`, and
    /// `Serialization` are never retried; the remaining kinds are.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PipelineError::Transient(_) | PipelineError::Timeout(_) | PipelineError::Validation(_))
    }

    /// Short, stable category name used in log fields and statistics.
    pub fn category(&self) -> &'static str {
        match self {
            PipelineError::Transient(_) => "transient",
            PipelineError::Timeout(_) => "timeout",
            PipelineError::Validation(_) => "validation",
            PipelineError::Canceled(_) => "canceled",
            PipelineError::Permanent(_) => "permanent",
            PipelineError::QueueClosed(_) => "queue_closed",
            PipelineError::IoFailure(_) => "io",
            PipelineError::Configuration(_) => "configuration",
            PipelineError::Serialization(_) => "serialization",
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::IoFailure(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_kinds_match_retry_policy() {
        assert!(PipelineError::transient("net").is_recoverable());
        assert!(PipelineError::timeout("slow").is_recoverable());
        assert!(PipelineError::validation("bad json").is_recoverable());
        assert!(!PipelineError::canceled("shutdown").is_recoverable());
        assert!(!PipelineError::permanent("exhausted").is_recoverable());
        assert!(!PipelineError::queue_closed("closed").is_recoverable());
    }

    #[test]
    fn categories_are_stable_strings() {
        assert_eq!(PipelineError::transient("x").category(), "transient");
        assert_eq!(PipelineError::io_failure("x").category(), "io");
    }

    #[test]
    fn io_error_converts_to_io_failure() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: PipelineError = io_err.into();
        assert!(matches!(err, PipelineError::IoFailure(_)));
    }
}
