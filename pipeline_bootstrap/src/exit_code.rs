// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Exit Codes
//!
//! Maps a [`PipelineError`](pipeline_domain::PipelineError) to a Unix exit
//! code so the process's exit status reflects why it stopped, following the
//! `sysexits.h` conventions where one applies.

use pipeline_domain::PipelineError;
use std::process::ExitCode;

pub const EX_OK: u8 = 0;
pub const EX_USAGE: u8 = 64;
pub const EX_DATAERR: u8 = 65;
pub const EX_NOINPUT: u8 = 66;
pub const EX_SOFTWARE: u8 = 70;
pub const EX_IOERR: u8 = 74;
pub const EX_CONFIG: u8 = 78;

pub fn map_error_to_exit_code(error: &PipelineError) -> u8 {
    match error {
        PipelineError::Configuration(_) => EX_CONFIG,
        PipelineError::Validation(_) | PipelineError::Serialization(_) => EX_DATAERR,
        PipelineError::IoFailure(_) => EX_IOERR,
        PipelineError::Canceled(_) => EX_OK,
        PipelineError::Transient(_) | PipelineError::Timeout(_) | PipelineError::Permanent(_) | PipelineError::QueueClosed(_) => {
            EX_SOFTWARE
        }
    }
}

pub fn result_to_exit_code(result: Result<(), PipelineError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::from(EX_OK),
        Err(error) => {
            tracing::error!(%error, "pipeline exited with error");
            ExitCode::from(map_error_to_exit_code(&error))
        }
    }
}
