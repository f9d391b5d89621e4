// s3r/src/config/mod.rs
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::cli::RestoreArgs;
use crate::errors::{AppError, Result};
use crate::restore::selector::RestorePoint;

pub const DEFAULT_CONFIG_FILE: &str = "s3r.json";
pub const DEFAULT_REGION: &str = "eu-west-1";
pub const DEFAULT_CONCURRENCY: usize = 1;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

// Structs for deserializing s3r.json
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonStorageConfig {
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub force_path_style: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonRestoreOptions {
    pub concurrency: Option<usize>,
    pub keep_going: Option<bool>,
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawJsonConfig {
    pub storage: Option<JsonStorageConfig>,
    pub restore: Option<JsonRestoreOptions>,
}

// Application's internal configuration structs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    /// `None` means the AWS default provider chain decides, falling back to [`DEFAULT_REGION`].
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub credentials: Option<StaticCredentials>,
    pub force_path_style: bool,
    pub max_attempts: u32,
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            region: None,
            endpoint_url: None,
            credentials: None,
            force_path_style: false,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreConfig {
    pub bucket: String,
    pub prefix: String,
    pub restore_point: RestorePoint,
    pub concurrency: usize,
    pub keep_going: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub operation: Option<OperationConfig>,
    pub storage: StorageSettings,
    pub raw_json_config: RawJsonConfig,
}

#[derive(Debug, Clone)]
pub enum OperationConfig {
    Restore(RestoreConfig),
}

impl AppConfig {
    /// Loads the configuration file if one is available.
    ///
    /// An explicit path must exist. Without one, `s3r.json` in the working
    /// directory is used when present and built-in defaults otherwise.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let raw_json_config = match config_path {
            Some(path) => read_raw_config(path)?,
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    read_raw_config(&default_path)?
                } else {
                    debug!("No {} found, using built-in defaults", DEFAULT_CONFIG_FILE);
                    RawJsonConfig::default()
                }
            }
        };
        Self::from_raw(raw_json_config)
    }

    pub fn from_raw(raw_json_config: RawJsonConfig) -> Result<Self> {
        let storage = storage_settings_from_raw(&raw_json_config)?;
        Ok(AppConfig {
            operation: None, // To be filled by main after parsing CLI args
            storage,
            raw_json_config,
        })
    }

    /// Applies the storage-related command line overrides on top of the file settings.
    pub fn apply_storage_overrides(&mut self, args: &RestoreArgs) -> Result<()> {
        if let Some(region) = non_empty(&args.region) {
            self.storage.region = Some(region);
        }
        if let Some(endpoint) = non_empty(&args.endpoint_url) {
            self.storage.endpoint_url = Some(endpoint);
        }
        if let Some(max_attempts) = args.max_attempts {
            if max_attempts == 0 {
                return Err(AppError::Config("--max-attempts must be at least 1".into()));
            }
            self.storage.max_attempts = max_attempts;
        }
        Ok(())
    }
}

fn read_raw_config(config_path: &Path) -> Result<RawJsonConfig> {
    let config_content = fs::read_to_string(config_path).map_err(|e| {
        AppError::Config(format!(
            "Failed to read config file at {}: {}",
            config_path.display(),
            e
        ))
    })?;
    serde_json::from_str(&config_content).map_err(|e| {
        AppError::Config(format!(
            "Failed to parse JSON from config file at {}: {}",
            config_path.display(),
            e
        ))
    })
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn storage_settings_from_raw(raw_config: &RawJsonConfig) -> Result<StorageSettings> {
    let storage_raw = raw_config.storage.clone().unwrap_or_default();
    let restore_raw = raw_config.restore.clone().unwrap_or_default();

    let credentials = match (
        non_empty(&storage_raw.access_key_id),
        non_empty(&storage_raw.secret_access_key),
    ) {
        (Some(access_key_id), Some(secret_access_key)) => Some(StaticCredentials {
            access_key_id,
            secret_access_key,
        }),
        (None, None) => None,
        _ => {
            // Only warn if one half of the key pair was provided
            warn!(
                "Config has only one of access_key_id/secret_access_key set; falling back to the default credential chain"
            );
            None
        }
    };

    let max_attempts = restore_raw.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS);
    if max_attempts == 0 {
        return Err(AppError::Config("restore.max_attempts must be at least 1".into()));
    }

    Ok(StorageSettings {
        region: non_empty(&storage_raw.region),
        endpoint_url: non_empty(&storage_raw.endpoint_url),
        credentials,
        force_path_style: storage_raw.force_path_style.unwrap_or(false),
        max_attempts,
    })
}

/// Builds the restore configuration from the command line, filling the gaps from the config file.
pub fn load_restore_config(raw_config: &RawJsonConfig, args: &RestoreArgs) -> Result<RestoreConfig> {
    let bucket = args.bucket.trim().to_string();
    if bucket.is_empty() {
        return Err(AppError::Argument("--bucket cannot be empty".into()));
    }

    if args.timestamp.trim().is_empty() {
        return Err(AppError::Argument("--timestamp cannot be empty".into()));
    }
    let restore_point: RestorePoint = args.timestamp.parse()?;

    let restore_opts = raw_config.restore.clone().unwrap_or_default();

    let concurrency = args
        .concurrency
        .or(restore_opts.concurrency)
        .unwrap_or(DEFAULT_CONCURRENCY);
    if concurrency == 0 {
        return Err(AppError::Config("concurrency must be at least 1".into()));
    }

    Ok(RestoreConfig {
        bucket,
        prefix: args.prefix.clone(),
        restore_point,
        concurrency,
        keep_going: args.keep_going || restore_opts.keep_going.unwrap_or(false),
    })
}
