//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration is resolved in this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or unreadable TOML file is never fatal: it is logged and the
//! lower-priority sources are used.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming the root folder for every EVALIO service
pub const ROOT_FOLDER_ENV: &str = "EVALIO_ROOT_FOLDER";

/// File name of the shared SQLite database inside the root folder
pub const DATABASE_FILE_NAME: &str = "evalio.db";

/// Logging section shared by all service TOML files
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Resolve the root folder
///
/// `toml_root` is the `root_folder` value already read from the service TOML file.
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_root: Option<&Path>,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = toml_root {
        return path.to_path_buf();
    }

    default_root_folder()
}

/// OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/evalio (or /var/lib/evalio for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("evalio"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/evalio"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("evalio"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/evalio"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("evalio"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\evalio"))
    } else {
        PathBuf::from("./evalio_data")
    }
}

/// Locate `<module>.toml`: user config dir first, then `/etc/evalio` on Linux
pub fn find_config_file(module_name: &str) -> Option<PathBuf> {
    let file_name = format!("{}.toml", module_name);

    let user_config = dirs::config_dir().map(|d| d.join("evalio").join(&file_name));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/evalio").join(&file_name);
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Parse a TOML config file
pub fn read_toml_config<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load a service TOML config, falling back to defaults
///
/// An explicit path must exist and parse. A discovered file that fails to
/// parse is logged and ignored.
pub fn load_toml_config<T: DeserializeOwned + Default>(
    module_name: &str,
    explicit_path: Option<&Path>,
) -> Result<T> {
    if let Some(path) = explicit_path {
        return read_toml_config(path);
    }

    match find_config_file(module_name) {
        Some(path) => match read_toml_config(&path) {
            Ok(config) => {
                debug!("Loaded config file {}", path.display());
                Ok(config)
            }
            Err(e) => {
                warn!("Ignoring config file {}: {}", path.display(), e);
                Ok(T::default())
            }
        },
        None => {
            debug!("No config file found for {}, using defaults", module_name);
            Ok(T::default())
        }
    }
}

/// Root folder layout shared by EVALIO services
#[derive(Debug, Clone)]
pub struct RootFolder {
    path: PathBuf,
}

impl RootFolder {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Shared SQLite database file
    pub fn database_path(&self) -> PathBuf {
        self.path.join(DATABASE_FILE_NAME)
    }

    /// Directory holding uploaded answer recordings
    pub fn answer_uploads_dir(&self) -> PathBuf {
        self.path.join("uploads").join("answers")
    }

    /// Create the root folder and its upload directory if missing
    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.path)?;
        std::fs::create_dir_all(self.answer_uploads_dir())?;
        Ok(())
    }
}
