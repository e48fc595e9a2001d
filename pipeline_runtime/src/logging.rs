// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Logging Setup
//!
//! Installs the global `tracing` subscriber. Level is read from `RUST_LOG`
//! when set, falling back to `level`.

use tracing_subscriber::EnvFilter;

/// Installs a formatted, env-filterable subscriber as the global default.
/// Safe to call at most once per process; a second call is a no-op that
/// logs a warning rather than panicking, since tests may run in the same
/// process as other init paths.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_target(true).finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::warn!("global tracing subscriber already set, ignoring second init() call");
    }
}
