// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Configuration Loading
//!
//! Layers configuration sources in increasing precedence: built-in
//! defaults, an optional TOML file, then `PIPELINE_`-prefixed environment
//! variables. The result is validated before it reaches the Supervisor.

use config::{Config, Environment, File, FileFormat};
use pipeline_domain::{PipelineConfig, PipelineError};
use std::path::Path;

const ENV_PREFIX: &str = "PIPELINE";

/// Loads a [`PipelineConfig`], layering `config_path` (if given) over the
/// defaults, then `PIPELINE_*` environment variables over both.
pub fn load(config_path: Option<&Path>) -> Result<PipelineConfig, PipelineError> {
    let defaults = PipelineConfig::default();
    let defaults_value = serde_json::to_value(&defaults)
        .map_err(|e| PipelineError::configuration(format!("serializing default configuration: {e}")))?;

    let mut builder = Config::builder().add_source(config::Config::try_from(&defaults_value).map_err(config_error)?);

    if let Some(path) = config_path {
        builder = builder.add_source(File::new(&path.to_string_lossy(), FileFormat::Toml).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX));

    let layered = builder.build().map_err(config_error)?;
    let config: PipelineConfig = layered.try_deserialize().map_err(config_error)?;
    config.validate()?;
    Ok(config)
}

fn config_error(error: config::ConfigError) -> PipelineError {
    PipelineError::configuration(error.to_string())
}
