// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bootstrap
//!
//! The bootstrap layer sits **outside** the domain and runtime layers and
//! provides:
//!
//! - **CLI parsing** — [`cli`], security-checked argument validation.
//! - **Signal handling** — [`signals`], SIGINT/SIGTERM to graceful shutdown.
//! - **Shutdown coordination** — [`shutdown`], the cancellation token the
//!   rest of the pipeline observes.
//! - **Exit codes** — [`exit_code`], mapping a `PipelineError` to a Unix
//!   exit status.
//!
//! Structured logging itself is not duplicated here: `pipeline_runtime::
//! logging` installs the one `tracing` subscriber the whole process uses,
//! and this crate's own diagnostics (signal receipt, shutdown initiation)
//! go through `tracing` directly rather than a separate bootstrap-phase
//! logger.
//!
//! `pipeline_bootstrap` may depend on `pipeline_domain`; `pipeline_domain`
//! never depends back on it.

pub mod cli;
pub mod exit_code;
pub mod shutdown;
pub mod signals;

pub use cli::{parse_and_validate, ParseError, ValidatedCli, ValidatedCommand};
pub use exit_code::{map_error_to_exit_code, result_to_exit_code};
pub use shutdown::{CancellationToken, ShutdownCoordinator};

/// Parses and security-validates CLI arguments.
///
/// Clap handles `--help`/`--version` itself and exits the process before
/// this function returns in those cases.
pub fn bootstrap_cli() -> Result<ValidatedCli, ParseError> {
    cli::parse_and_validate()
}
