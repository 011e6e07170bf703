//! Layered configuration: built-in defaults → optional file → `QE_`-prefixed
//! environment overrides, mirroring the teacher's `mcp-server/src/config.rs`
//! (`config` crate, `Environment::with_prefix`, an explicit `validate()`).

use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use qe_core::QeError;
use qe_mcp_client::McpSettings;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub runtime: RuntimeConfig,
    pub mcp: McpSettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RuntimeConfig {
    /// Root directory under which `runs/`, `staging/`, and `cache/` live
    /// (spec §6 "per-run directory").
    pub output_root: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
    Compact,
}

impl Config {
    /// Loads `config/default.toml`, layers an optional `--config`/`CONFIG_FILE`
    /// file on top, then `QE_`-prefixed environment variables, then applies
    /// the handful of standalone env vars named in spec §6
    /// (`GITHUB_TOKEN`/`GH_TOKEN` are read directly by `qe-mcp-client`, not
    /// mirrored here; `MCP_ENV` and `LOG_LEVEL` are).
    pub fn load(config_file: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder().add_source(File::from_str(include_str!("../config/default.toml"), FileFormat::Toml));

        if let Some(path) = config_file.map(str::to_string).or_else(|| env::var("CONFIG_FILE").ok()) {
            builder = builder.add_source(File::with_name(&path).required(false).format(FileFormat::Toml));
        }

        builder = builder.add_source(Environment::with_prefix("QE").separator("_").try_parsing(true));

        let built = builder.build().context("failed to build configuration")?;
        let mut config: Config = built.try_deserialize().context("failed to deserialize configuration")?;

        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.logging.level = log_level;
        }

        config.validate().map_err(|e| anyhow::anyhow!(e.to_string()))?;
        Ok(config)
    }

    /// Rejects configuration that would make a run fail in a confusing way
    /// later rather than a clear diagnostic now (spec §7 `UserInputError`).
    pub fn validate(&self) -> Result<(), QeError> {
        if self.runtime.output_root.trim().is_empty() {
            return Err(QeError::UserInput("runtime.output_root must not be empty".to_string()));
        }
        if self.mcp.cache_ttl == 0 {
            return Err(QeError::UserInput("mcp.cache_ttl must be greater than zero".to_string()));
        }
        Ok(())
    }
}
