//! Configuration Loader
//!
//! Environment-aware configuration loading built on the `config` crate.
//! Sources are merged in order, later ones winning:
//!
//! 1. built-in defaults ([`CmdgateConfig::default`])
//! 2. `<dir>/cmdgate.toml`
//! 3. `<dir>/cmdgate.<environment>.toml`
//! 4. `CMDGATE__<SECTION>__<KEY>` environment variables

use super::error::{ConfigResult, ConfigurationError};
use super::CmdgateConfig;
use config::{Config, Environment, File, FileFormat};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const ENV_PREFIX: &str = "CMDGATE";
const ENV_SEPARATOR: &str = "__";
const BASE_FILE: &str = "cmdgate";

#[derive(Debug)]
pub struct ConfigManager {
    config: CmdgateConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        Self::load_with_env_source(config_dir, environment, None)
    }

    /// Like [`load_from_directory_with_env`](Self::load_from_directory_with_env)
    /// but reads `CMDGATE__*` overrides from `env_source` instead of the process
    /// environment when given.
    pub fn load_with_env_source(
        config_dir: Option<PathBuf>,
        environment: &str,
        env_source: Option<HashMap<String, String>>,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);
        if !config_directory.is_dir() {
            return Err(ConfigurationError::DirectoryNotFound {
                path: config_directory,
            });
        }

        debug!(
            environment = environment,
            directory = %config_directory.display(),
            "Loading configuration"
        );

        let config = Self::load_and_merge_config(&config_directory, environment, env_source)?;
        config.validate()?;

        info!(
            environment = environment,
            max_attempts = config.retry.max_attempts,
            ttl_seconds = config.idempotency.ttl_seconds,
            command_timeout_ms = config.execution.command_timeout_ms,
            "⚙️ Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Validated defaults, for wiring without any configuration files
    pub fn defaults() -> ConfigManager {
        ConfigManager {
            config: CmdgateConfig::default(),
            environment: Self::detect_environment(),
            config_directory: PathBuf::from("config"),
        }
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &CmdgateConfig {
        &self.config
    }

    /// Get the current environment
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Get the configuration directory
    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Detect current environment: CMDGATE_ENV || APP_ENV || 'development'
    fn detect_environment() -> String {
        env::var("CMDGATE_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    fn default_config_directory() -> PathBuf {
        if let Ok(dir) = env::var("CMDGATE_CONFIG_DIR") {
            return PathBuf::from(dir);
        }
        if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
            let dir = PathBuf::from(manifest_dir).join("config");
            if dir.is_dir() {
                return dir;
            }
        }
        PathBuf::from("config")
    }

    fn load_and_merge_config(
        config_directory: &Path,
        environment: &str,
        env_source: Option<HashMap<String, String>>,
    ) -> ConfigResult<CmdgateConfig> {
        let defaults = Config::try_from(&CmdgateConfig::default())
            .map_err(|e| ConfigurationError::load_error(environment, e))?;

        let base = config_directory.join(format!("{BASE_FILE}.toml"));
        let overrides = config_directory.join(format!("{BASE_FILE}.{environment}.toml"));

        let env_overrides = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("business.allowed_image_types")
            .source(env_source);

        Config::builder()
            .add_source(defaults)
            .add_source(File::new(&base.to_string_lossy(), FileFormat::Toml).required(false))
            .add_source(File::new(&overrides.to_string_lossy(), FileFormat::Toml).required(false))
            .add_source(env_overrides)
            .build()
            .and_then(|merged| merged.try_deserialize::<CmdgateConfig>())
            .map_err(|e| ConfigurationError::load_error(environment, e))
    }
}
