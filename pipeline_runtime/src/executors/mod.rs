// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Example Stage Executors
//!
//! `pipeline_runtime` is agnostic to what a stage actually computes; these
//! two implementations exist for tests, demos, and the `stats`/`run` CLI
//! default so the crate is runnable without a real analysis backend wired
//! in.

pub mod debug;
pub mod passthrough;

pub use debug::DebugExecutor;
pub use passthrough::PassThroughExecutor;
