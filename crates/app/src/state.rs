use std::{fs, path::PathBuf, str::FromStr, time::Duration};

use common::chain::Amount;
use common::crypto::Secret;
use common::publish::{PublishConfig, DEFAULT_CONTRACT_NAME, DEFAULT_OWNERSHIP_METHOD};
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

pub const APP_NAME: &str = "bui";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const KEY_FILE_NAME: &str = "policy.key";
pub const STORE_DIR_NAME: &str = "store";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Contract the ownership condition is evaluated against
    #[serde(default = "default_contract_name")]
    pub contract_name: String,
    /// Contract method that answers block ownership
    #[serde(default = "default_ownership_method")]
    pub ownership_method: String,
    #[serde(default = "default_chain")]
    pub chain: String,
    /// Dev ledger publish price, in wei
    #[serde(default = "default_publish_price")]
    pub publish_price: u64,
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,
    /// How often the dev ledger checks for confirmation
    #[serde(default = "default_confirmation_poll_ms")]
    pub confirmation_poll_ms: u64,
    /// How long dev ledger transactions stay pending
    #[serde(default = "default_dev_confirmation_delay_ms")]
    pub dev_confirmation_delay_ms: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Write a daily rolling log file here as well as to stdout
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_contract_name() -> String {
    DEFAULT_CONTRACT_NAME.to_string()
}

fn default_ownership_method() -> String {
    DEFAULT_OWNERSHIP_METHOD.to_string()
}

fn default_chain() -> String {
    "mumbai".to_string()
}

fn default_publish_price() -> u64 {
    330_000_000_000_000_000
}

fn default_confirmation_timeout_secs() -> u64 {
    120
}

fn default_confirmation_poll_ms() -> u64 {
    500
}

fn default_dev_confirmation_delay_ms() -> u64 {
    1_500
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            contract_name: default_contract_name(),
            ownership_method: default_ownership_method(),
            chain: default_chain(),
            publish_price: default_publish_price(),
            confirmation_timeout_secs: default_confirmation_timeout_secs(),
            confirmation_poll_ms: default_confirmation_poll_ms(),
            dev_confirmation_delay_ms: default_dev_confirmation_delay_ms(),
            log_level: default_log_level(),
            log_dir: None,
        }
    }
}

impl AppConfig {
    pub fn publish_config(&self) -> PublishConfig {
        PublishConfig {
            contract_name: self.contract_name.clone(),
            ownership_method: self.ownership_method.clone(),
            confirmation_timeout: Duration::from_secs(self.confirmation_timeout_secs),
            ..Default::default()
        }
    }

    pub fn publish_price(&self) -> Amount {
        Amount::new(u128::from(self.publish_price))
    }

    /// Configured log level, falling back to `info` when unparseable
    pub fn log_level(&self) -> LevelFilter {
        LevelFilter::from_str(&self.log_level).unwrap_or(LevelFilter::INFO)
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the bui directory (~/.bui)
    pub bui_dir: PathBuf,
    /// Path to the access policy master key
    pub key_path: PathBuf,
    /// Path to the content store directory
    pub store_path: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the bui directory path (custom or default ~/.bui)
    pub fn bui_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new bui state directory
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let bui_dir = Self::bui_dir(custom_path)?;
        if bui_dir.exists() {
            return Err(StateError::AlreadyInitialized);
        }
        fs::create_dir_all(&bui_dir)?;

        let store_path = bui_dir.join(STORE_DIR_NAME);
        fs::create_dir_all(&store_path)?;

        let key = Secret::generate();
        let key_path = bui_dir.join(KEY_FILE_NAME);
        fs::write(&key_path, hex::encode(key.bytes()))?;

        let config = config.unwrap_or_default();
        let config_path = bui_dir.join(CONFIG_FILE_NAME);
        fs::write(&config_path, toml::to_string_pretty(&config)?)?;

        Ok(Self {
            bui_dir,
            key_path,
            store_path,
            config_path,
            config,
        })
    }

    /// Load existing state from the bui directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let bui_dir = Self::bui_dir(custom_path)?;
        if !bui_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let key_path = bui_dir.join(KEY_FILE_NAME);
        let store_path = bui_dir.join(STORE_DIR_NAME);
        let config_path = bui_dir.join(CONFIG_FILE_NAME);

        if !key_path.exists() {
            return Err(StateError::MissingFile(KEY_FILE_NAME.to_string()));
        }
        if !store_path.exists() {
            return Err(StateError::MissingFile(format!("{}/", STORE_DIR_NAME)));
        }
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }

        let config: AppConfig = toml::from_str(&fs::read_to_string(&config_path)?)?;

        Ok(Self {
            bui_dir,
            key_path,
            store_path,
            config_path,
            config,
        })
    }

    /// Load the access policy master key
    pub fn load_key(&self) -> Result<Secret, StateError> {
        let encoded = fs::read_to_string(&self.key_path)?;
        let bytes =
            hex::decode(encoded.trim()).map_err(|e| StateError::InvalidKey(e.to_string()))?;
        Secret::from_slice(&bytes).map_err(|e| StateError::InvalidKey(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("bui directory not initialized. Run 'bui init' first")]
    NotInitialized,

    #[error("bui directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}
