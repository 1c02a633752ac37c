//! Store configuration and the process-level entry point.
//!
//! # Responsibility
//! - Describe which backend to open and whether to seed or log.
//! - Read that description from `ZETTELTWEET_*` environment variables.
//! - Build a ready-to-use [`NoteStore`] from it.

use crate::logging::{init_logging, LogLevel, LoggingError};
use crate::service::error::StoreError;
use crate::service::note_store::NoteStore;
use crate::storage::{FileStorage, KeyValueStorage, MemoryStorage, SqliteStorage, StorageError};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_BACKEND: &str = "ZETTELTWEET_BACKEND";
pub const ENV_DATA_PATH: &str = "ZETTELTWEET_DATA_PATH";
pub const ENV_SEED: &str = "ZETTELTWEET_SEED";
pub const ENV_LOG_LEVEL: &str = "ZETTELTWEET_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "ZETTELTWEET_LOG_DIR";

const DEFAULT_SQLITE_FILE: &str = "zetteltweet.sqlite3";
const DEFAULT_FILE_DIR: &str = "zetteltweet-data";

/// Store opened by the config layer; the backend is chosen at runtime.
pub type DynNoteStore = NoteStore<Box<dyn KeyValueStorage>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    Memory,
    /// Directory holding one `<key>.json` file per record.
    File(PathBuf),
    /// SQLite database file.
    Sqlite(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub backend: BackendConfig,
    /// Seed default notes into an empty store on open.
    pub seed_defaults: bool,
    /// Level for file logging; ignored unless `log_dir` is set.
    pub log_level: Option<LogLevel>,
    pub log_dir: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::Sqlite(std::env::temp_dir().join(DEFAULT_SQLITE_FILE)),
            seed_defaults: true,
            log_level: None,
            log_dir: None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    UnknownBackend(String),
    Logging(LoggingError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownBackend(value) => write!(
                f,
                "unsupported {ENV_BACKEND} `{value}`; expected memory|file|sqlite"
            ),
            Self::Logging(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::UnknownBackend(_) => None,
            Self::Logging(err) => Some(err),
        }
    }
}

impl StoreConfig {
    /// In-memory, unseeded store without logging.
    pub fn in_memory() -> Self {
        Self {
            backend: BackendConfig::Memory,
            seed_defaults: false,
            log_level: None,
            log_dir: None,
        }
    }

    /// Reads `ZETTELTWEET_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    ///
    /// Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let data_path = var(ENV_DATA_PATH).map(PathBuf::from);

        let backend = match var(ENV_BACKEND)
            .map(|value| value.to_ascii_lowercase())
            .as_deref()
        {
            None | Some("sqlite") => BackendConfig::Sqlite(
                data_path.unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_SQLITE_FILE)),
            ),
            Some("file") => BackendConfig::File(
                data_path.unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_FILE_DIR)),
            ),
            Some("memory") => BackendConfig::Memory,
            Some(other) => return Err(ConfigError::UnknownBackend(other.to_string())),
        };

        let seed_defaults = !matches!(
            var(ENV_SEED).map(|value| value.to_ascii_lowercase()).as_deref(),
            Some("0" | "false" | "no" | "off")
        );

        let log_level = var(ENV_LOG_LEVEL)
            .map(|value| value.parse::<LogLevel>())
            .transpose()
            .map_err(ConfigError::Logging)?;

        Ok(Self {
            backend,
            seed_defaults,
            log_level,
            log_dir: var(ENV_LOG_DIR).map(PathBuf::from),
        })
    }
}

#[derive(Debug)]
pub enum OpenError {
    Logging(LoggingError),
    Storage(StorageError),
    Store(StoreError),
}

impl Display for OpenError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Logging(err) => write!(f, "logging setup failed: {err}"),
            Self::Storage(err) => write!(f, "failed to open storage: {err}"),
            Self::Store(err) => write!(f, "failed to initialize store: {err}"),
        }
    }
}

impl Error for OpenError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Logging(err) => Some(err),
            Self::Storage(err) => Some(err),
            Self::Store(err) => Some(err),
        }
    }
}

impl From<LoggingError> for OpenError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}

impl From<StorageError> for OpenError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

impl From<StoreError> for OpenError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Opens the configured backend, starts logging and seeds when enabled.
pub fn open_store(config: &StoreConfig) -> Result<DynNoteStore, OpenError> {
    if let Some(log_dir) = &config.log_dir {
        init_logging(
            config.log_level.unwrap_or_else(LogLevel::build_default),
            log_dir,
        )?;
    }

    let storage = open_backend(&config.backend)?;
    let backend_name = storage.backend_name();
    let mut store = NoteStore::new(storage);
    if config.seed_defaults {
        store.initialize()?;
    }

    info!(
        "event=store_open module=config status=ok backend={} seed_defaults={}",
        backend_name, config.seed_defaults
    );
    Ok(store)
}

fn open_backend(backend: &BackendConfig) -> Result<Box<dyn KeyValueStorage>, StorageError> {
    let storage: Box<dyn KeyValueStorage> = match backend {
        BackendConfig::Memory => Box::new(MemoryStorage::new()),
        BackendConfig::File(dir) => Box::new(FileStorage::open(dir)?),
        BackendConfig::Sqlite(path) => {
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            Box::new(SqliteStorage::open(path)?)
        }
    };
    Ok(storage)
}
