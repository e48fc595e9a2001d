// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Cache Key Value Object
//!
//! `CacheKey(path) = lowercase_hex(SHA256(utf8(path)))`. The key is derived
//! from the file's *path*, not its content, so that repeated edits of the
//! same file overwrite the same on-disk entry instead of accumulating stale
//! ones. Freshness is a separate check against the stored
//! [`ContentHash`](super::content_hash::ContentHash).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derives the cache key for `path`.
    pub fn for_path(path: &Path) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(path.to_string_lossy().as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The on-disk file name for this key, e.g. `<key>.json`.
    pub fn file_name(&self) -> String {
        format!("{}.json", self.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn same_path_yields_same_key() {
        let path = PathBuf::from("/tmp/a.md");
        assert_eq!(CacheKey::for_path(&path), CacheKey::for_path(&path));
    }

    #[test]
    fn different_paths_yield_different_keys() {
        let a = CacheKey::for_path(&PathBuf::from("/tmp/a.md"));
        let b = CacheKey::for_path(&PathBuf::from("/tmp/b.md"));
        assert_ne!(a, b);
    }

    #[test]
    fn key_is_lowercase_hex_of_sha256_length() {
        let key = CacheKey::for_path(&PathBuf::from("/tmp/a.md"));
        assert_eq!(key.as_str().len(), 64);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn file_name_appends_json_extension() {
        let key = CacheKey::for_path(&PathBuf::from("/tmp/a.md"));
        assert!(key.file_name().ends_with(".json"));
    }
}
