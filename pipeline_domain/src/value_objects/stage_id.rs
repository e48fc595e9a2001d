// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stage Identifier Value Object
//!
//! Unlike [`JobId`](super::job_id::JobId), a stage identifier is not a
//! generated handle but a stable name chosen by whoever configures the
//! pipeline (e.g. `"structural_extraction"`, `"semantic_classification"`).
//! `StageId` wraps that name so it can't be confused with an arbitrary
//! `String` and so it prints and (de)serializes consistently across the
//! cache's on-disk JSON format.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StageId(String);

impl StageId {
    /// Creates a stage identifier from its configured name.
    ///
    /// # Panics
    /// Panics if `name` is empty; stage identifiers are chosen at
    /// configuration time and an empty one is a configuration bug, not a
    /// runtime condition to recover from.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        assert!(!name.is_empty(), "stage id must not be empty");
        Self(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StageId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for StageId {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl AsRef<str> for StageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_the_configured_name() {
        let id = StageId::new("structural_extraction");
        assert_eq!(id.as_str(), "structural_extraction");
        assert_eq!(id.to_string(), "structural_extraction");
    }

    #[test]
    #[should_panic(expected = "stage id must not be empty")]
    fn rejects_empty_names() {
        StageId::new("");
    }

    #[test]
    fn orders_lexicographically_for_stable_map_iteration() {
        let mut ids = vec![StageId::new("b"), StageId::new("a")];
        ids.sort();
        assert_eq!(ids, vec![StageId::new("a"), StageId::new("b")]);
    }
}
