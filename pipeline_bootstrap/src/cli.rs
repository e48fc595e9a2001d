// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Interface
//!
//! Three subcommands: `run` starts the Supervisor against an input
//! directory and cache directory, `validate-config` checks a configuration
//! file without starting anything, and `stats` reports cache statistics for
//! an existing cache directory.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "pipeline", version, about = "Content-addressed file processing pipeline")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (can be repeated).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the pipeline: scan, watch, and process `input_dir`.
    Run {
        #[arg(long)]
        input_dir: PathBuf,
        #[arg(long)]
        cache_dir: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Load and validate a configuration file without starting the pipeline.
    ValidateConfig {
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Report cache statistics for an existing cache directory.
    Stats {
        #[arg(long)]
        cache_dir: PathBuf,
    },
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Validated, security-checked view of [`Cli`]: every path argument is
/// confirmed non-empty and free of embedded NUL bytes before use.
#[derive(Debug, Clone)]
pub struct ValidatedCli {
    pub command: ValidatedCommand,
    pub verbose: u8,
}

#[derive(Debug, Clone)]
pub enum ValidatedCommand {
    Run {
        input_dir: PathBuf,
        cache_dir: PathBuf,
        config: Option<PathBuf>,
    },
    ValidateConfig {
        config: Option<PathBuf>,
    },
    Stats {
        cache_dir: PathBuf,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("invalid argument {arg}: {reason}")]
    InvalidValue { arg: String, reason: String },
}

fn validate_path(arg: &str, value: &Path) -> Result<PathBuf, ParseError> {
    let as_str = value.to_string_lossy();
    if as_str.is_empty() || as_str.contains('\0') {
        return Err(ParseError::InvalidValue {
            arg: arg.to_string(),
            reason: "path must be non-empty and free of NUL bytes".to_string(),
        });
    }
    Ok(value.to_path_buf())
}

pub fn parse_and_validate() -> Result<ValidatedCli, ParseError> {
    validate_cli(parse_cli())
}

fn validate_cli(cli: Cli) -> Result<ValidatedCli, ParseError> {
    let command = match cli.command {
        Commands::Run {
            input_dir,
            cache_dir,
            config,
        } => ValidatedCommand::Run {
            input_dir: validate_path("input-dir", &input_dir)?,
            cache_dir: validate_path("cache-dir", &cache_dir)?,
            config: config.map(|p| validate_path("config", &p)).transpose()?,
        },
        Commands::ValidateConfig { config } => ValidatedCommand::ValidateConfig {
            config: config.map(|p| validate_path("config", &p)).transpose()?,
        },
        Commands::Stats { cache_dir } => ValidatedCommand::Stats {
            cache_dir: validate_path("cache-dir", &cache_dir)?,
        },
    };

    Ok(ValidatedCli {
        command,
        verbose: cli.verbose,
    })
}
