use std::path::{Path, PathBuf};
use std::{fs, str::FromStr};

use common::crypto::{Cipher, Ed25519Wallet, JwkWallet, KeyError, WalletSigner};
use common::ledger::{FsLedgerProvider, FsLedgerProviderError};
use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "arfs";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const WALLET_FILE_NAME: &str = "wallet.pem";
pub const LEDGER_DIR_NAME: &str = "ledger";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default log level, overridden by RUST_LOG
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Wallet key file; a `.json` file is read as an RSA JWK, anything
    /// else as an Ed25519 PEM. Relative paths resolve against the arfs
    /// directory.
    #[serde(default)]
    pub wallet_path: Option<PathBuf>,
    /// Directory of the local ledger
    #[serde(default)]
    pub ledger_dir: Option<PathBuf>,
    /// Cipher used to seal private entities
    #[serde(default)]
    pub cipher: Cipher,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            wallet_path: None,
            ledger_dir: None,
            cipher: Cipher::default(),
        }
    }
}

impl AppConfig {
    /// The configured level, or `info` if it does not parse
    pub fn level(&self) -> tracing::Level {
        tracing::Level::from_str(&self.log_level).unwrap_or(tracing::Level::INFO)
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the arfs directory (~/.arfs)
    pub arfs_dir: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the arfs directory path (custom or default ~/.arfs)
    pub fn arfs_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new arfs directory with a fresh Ed25519 wallet
    pub fn init(custom_path: Option<PathBuf>, config: Option<AppConfig>) -> Result<Self, StateError> {
        let arfs_dir = Self::arfs_dir(custom_path)?;
        if arfs_dir.exists() {
            return Err(StateError::AlreadyInitialized);
        }
        fs::create_dir_all(&arfs_dir)?;

        let config = config.unwrap_or_default();
        let config_path = arfs_dir.join(CONFIG_FILE_NAME);
        fs::write(&config_path, toml::to_string_pretty(&config)?)?;

        let state = Self {
            arfs_dir,
            config_path,
            config,
        };

        let wallet = Ed25519Wallet::try_generate()?;
        fs::write(state.wallet_path(), wallet.to_pem())?;
        fs::create_dir_all(state.ledger_dir())?;

        Ok(state)
    }

    /// Load existing state from the arfs directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let arfs_dir = Self::arfs_dir(custom_path)?;
        if !arfs_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let config_path = arfs_dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }
        let config: AppConfig = toml::from_str(&fs::read_to_string(&config_path)?)?;

        Ok(Self {
            arfs_dir,
            config_path,
            config,
        })
    }

    fn resolve(&self, path: Option<&Path>, default: &str) -> PathBuf {
        match path {
            Some(path) if path.is_absolute() => path.to_path_buf(),
            Some(path) => self.arfs_dir.join(path),
            None => self.arfs_dir.join(default),
        }
    }

    pub fn wallet_path(&self) -> PathBuf {
        self.resolve(self.config.wallet_path.as_deref(), WALLET_FILE_NAME)
    }

    pub fn ledger_dir(&self) -> PathBuf {
        self.resolve(self.config.ledger_dir.as_deref(), LEDGER_DIR_NAME)
    }

    /// Load the configured wallet
    pub fn load_wallet(&self) -> Result<Box<dyn WalletSigner>, StateError> {
        let path = self.wallet_path();
        if !path.exists() {
            return Err(StateError::MissingFile(path.display().to_string()));
        }
        let contents = fs::read_to_string(&path)?;

        let is_jwk = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let wallet: Box<dyn WalletSigner> = if is_jwk {
            Box::new(JwkWallet::from_jwk(&contents)?)
        } else {
            Box::new(Ed25519Wallet::from_pem(&contents)?)
        };

        tracing::debug!(path = %path.display(), jwk = is_jwk, "loaded wallet");
        Ok(wallet)
    }

    /// Open the local ledger, attributing new records to `owner_address`
    pub async fn ledger(&self, owner_address: String) -> Result<FsLedgerProvider, StateError> {
        Ok(FsLedgerProvider::open(self.ledger_dir(), owner_address).await?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("arfs directory not initialized. Run 'arfs init' first")]
    NotInitialized,

    #[error("arfs directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("invalid wallet: {0}")]
    InvalidWallet(#[from] KeyError),

    #[error("ledger error: {0}")]
    Ledger(#[from] FsLedgerProviderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}
