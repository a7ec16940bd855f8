//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::ConfigOverlay;

/// Error type for configuration acquisition.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid command line flags, including help and version requests.
    #[error("{0}")]
    Flags(#[from] clap::Error),

    #[error("Error loading configuration from {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error loading configuration from {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Error loading configuration from {}: unsupported file extension", path.display())]
    UnsupportedFormat { path: PathBuf },

    /// A bind or advertise address could not be normalized.
    #[error("Failed to parse {service} address {value:?}: {reason}")]
    Address {
        service: &'static str,
        value: String,
        reason: String,
    },

    #[error("{name} must be given as an absolute path: got {path}")]
    RelativePath { name: &'static str, path: String },
}

/// A config file read from disk.
#[derive(Debug)]
pub struct LoadedFile {
    pub path: PathBuf,
    pub overlay: ConfigOverlay,
}

/// Load a config path. Files are parsed directly; directories contribute
/// every `.toml` and `.json` file they contain, sorted by file name.
pub fn load_path(path: &Path) -> Result<Vec<LoadedFile>, ConfigError> {
    let meta = fs::metadata(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if !meta.is_dir() {
        return Ok(vec![LoadedFile {
            path: path.to_path_buf(),
            overlay: load_file(path)?,
        }]);
    }

    let entries = fs::read_dir(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file = entry.path();
        if file.is_file() && is_config_file(&file) {
            files.push(file);
        }
    }
    files.sort();

    files
        .into_iter()
        .map(|file| {
            let overlay = load_file(&file)?;
            Ok(LoadedFile {
                path: file,
                overlay,
            })
        })
        .collect()
}

/// Parse a single TOML or JSON file into an overlay.
pub fn load_file(path: &Path) -> Result<ConfigOverlay, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let parse_err = |message: String| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    };

    match extension(path).as_deref() {
        Some("toml") => toml::from_str(&content).map_err(|e| parse_err(e.to_string())),
        Some("json") => {
            if content.trim().is_empty() {
                return Ok(ConfigOverlay::default());
            }
            serde_json::from_str(&content).map_err(|e| parse_err(e.to_string()))
        }
        _ => Err(ConfigError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

fn is_config_file(path: &Path) -> bool {
    matches!(extension(path).as_deref(), Some("toml") | Some("json"))
}
