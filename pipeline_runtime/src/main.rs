// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Composition root: wires CLI parsing, config loading, logging, signal
//! handling, and the Supervisor together for the `run`, `validate-config`,
//! and `stats` subcommands.

use pipeline_bootstrap::cli::ValidatedCommand;
use pipeline_bootstrap::{bootstrap_cli, result_to_exit_code, ShutdownCoordinator};
use pipeline_domain::repositories::stage_executor::CancellationSignal;
use pipeline_domain::PipelineError;
use pipeline_runtime::executors::PassThroughExecutor;
use pipeline_runtime::{logging, FileCache, Supervisor};
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    let validated_cli = match bootstrap_cli() {
        Ok(cli) => cli,
        Err(error) => {
            eprintln!("argument error: {error}");
            return ExitCode::from(pipeline_bootstrap::exit_code::EX_USAGE);
        }
    };

    let level = match validated_cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    logging::init(level);

    result_to_exit_code(run(validated_cli.command).await)
}

async fn run(command: ValidatedCommand) -> Result<(), PipelineError> {
    match command {
        ValidatedCommand::Run {
            input_dir,
            cache_dir,
            config,
        } => run_pipeline(input_dir, cache_dir, config).await,
        ValidatedCommand::ValidateConfig { config } => {
            let loaded = pipeline_runtime::config::load(config.as_deref())?;
            println!("configuration is valid: {loaded:#?}");
            Ok(())
        }
        ValidatedCommand::Stats { cache_dir } => {
            use pipeline_domain::repositories::artifact_cache::ArtifactCache;
            let cache = FileCache::open(cache_dir, u64::MAX, u64::MAX, None).await?;
            let stats = cache.stats().await?;
            println!("{stats:#?}");
            Ok(())
        }
    }
}

async fn run_pipeline(
    input_dir: std::path::PathBuf,
    cache_dir: std::path::PathBuf,
    config_path: Option<std::path::PathBuf>,
) -> Result<(), PipelineError> {
    let mut config = pipeline_runtime::config::load(config_path.as_deref())?;
    config.input_directory = input_dir.to_string_lossy().into_owned();

    let executor = Arc::new(PassThroughExecutor::new(vec![pipeline_domain::value_objects::StageId::new("analyze")]));

    let coordinator = ShutdownCoordinator::new();
    let shutdown: Arc<dyn CancellationSignal> = Arc::new(coordinator.token());
    pipeline_bootstrap::signals::spawn_signal_handler(coordinator.clone());

    let supervisor = Supervisor::new(config, cache_dir, executor, shutdown.clone()).await?;
    supervisor.start().await?;

    coordinator.token().cancelled().await;
    supervisor.shutdown().await?;

    Ok(())
}
