//! Process configuration.
//!
//! Sources, later ones overriding earlier ones:
//! 1. Bundled defaults (include_str! from daguerre.toml)
//! 2. `~/.config/daguerre/daguerre.toml`
//! 3. `./daguerre.toml`
//! 4. An explicit file, when given
//! 5. `DAGUERRE__*` environment variables (`DAGUERRE__STORAGE__KIND=memory`)

use crate::ServiceConfig;
use daguerre_error::{ConfigError, DaguerreError, DaguerreResult};
use daguerre_storage::StorageConfig;
use config::{Config, ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_CONFIG: &str = include_str!("../daguerre.toml");

const BYTES_PER_MB: u64 = 1024 * 1024;

fn default_max_file_size_mb() -> u64 {
    10
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_level() -> String {
    "info".to_string()
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Getters)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_level")]
    level: String,
    /// Emit JSON lines instead of text
    #[serde(default)]
    json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

/// Top-level Daguerre configuration.
///
/// # Example
///
/// ```no_run
/// use daguerre::DaguerreConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = DaguerreConfig::load()?;
/// println!("Storing with {:?}", config.storage());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Getters)]
pub struct DaguerreConfig {
    /// Upload ceiling in MiB; 0 disables it
    #[serde(default = "default_max_file_size_mb")]
    max_file_size_mb: u64,
    /// Deadline for storage writes in seconds; 0 disables it
    #[serde(default = "default_timeout_secs")]
    upload_timeout_secs: u64,
    /// Deadline for storage reads in seconds; 0 disables it
    #[serde(default = "default_timeout_secs")]
    download_timeout_secs: u64,
    /// Backend selection
    #[serde(default)]
    storage: StorageConfig,
    /// Log output
    #[serde(default)]
    logging: LoggingConfig,
}

impl Default for DaguerreConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: default_max_file_size_mb(),
            upload_timeout_secs: default_timeout_secs(),
            download_timeout_secs: default_timeout_secs(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn build_error(e: config::ConfigError) -> DaguerreError {
    DaguerreError::from(ConfigError::new(format!(
        "Failed to build configuration: {}",
        e
    )))
}

fn parse_error(e: config::ConfigError) -> DaguerreError {
    DaguerreError::from(ConfigError::new(format!(
        "Failed to parse configuration: {}",
        e
    )))
}

impl DaguerreConfig {
    /// Load configuration from a single file, ignoring every other source.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> DaguerreResult<Self> {
        debug!("Loading configuration from file");

        Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                DaguerreError::from(ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                )))
            })?
            .try_deserialize()
            .map_err(parse_error)
    }

    /// Load configuration from every standard source.
    ///
    /// User files are optional and silently skipped when absent.
    #[instrument]
    pub fn load() -> DaguerreResult<Self> {
        Self::load_with(None)
    }

    /// Load configuration from every standard source plus `explicit`, which
    /// must exist and overrides the files but not the environment.
    #[instrument(skip(explicit))]
    pub fn load_with(explicit: Option<&Path>) -> DaguerreResult<Self> {
        debug!("Loading configuration with precedence: env > explicit > current dir > home dir > bundled defaults");

        let mut builder = Self::file_sources();
        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path));
        }

        builder
            .add_source(
                Environment::with_prefix("DAGUERRE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(build_error)?
            .try_deserialize()
            .map_err(parse_error)
    }

    fn file_sources() -> ConfigBuilder<DefaultState> {
        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/daguerre/daguerre.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder.add_source(File::with_name("daguerre").required(false))
    }

    /// Use a different storage backend.
    pub fn with_storage(mut self, storage: StorageConfig) -> Self {
        self.storage = storage;
        self
    }

    /// Settings for an [`AssetService`](crate::AssetService).
    pub fn service_config(&self) -> ServiceConfig {
        let seconds = |secs: u64| (secs > 0).then(|| Duration::from_secs(secs));
        ServiceConfig::new()
            .with_max_file_size(
                (self.max_file_size_mb > 0)
                    .then(|| self.max_file_size_mb.saturating_mul(BYTES_PER_MB)),
            )
            .with_upload_timeout(seconds(self.upload_timeout_secs))
            .with_download_timeout(seconds(self.download_timeout_secs))
    }
}
