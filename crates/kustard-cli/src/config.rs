//! Configuration file handling for kustard.
//!
//! Looks for `.config/kustard.styx` in the current directory or any parent directory.

pub use kustard_config::Config;

use kustard::{SchemaDialect, TargetFilter};
use kustard_config::FilterConfig;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = ".config/kustard.styx";

/// A loaded configuration and where it came from.
#[derive(Debug)]
pub struct Loaded {
    pub config: Config,
    pub path: PathBuf,
}

impl Loaded {
    /// Directory that relative paths in the config are resolved against:
    /// the parent of `.config/`.
    pub fn root(&self) -> &Path {
        self.path
            .parent()
            .and_then(Path::parent)
            .unwrap_or_else(|| Path::new("."))
    }

    pub fn resolve(&self, path: &str) -> PathBuf {
        self.root().join(path)
    }
}

/// Load configuration from `.config/kustard.styx`, searching up the directory tree.
pub fn load() -> Result<Loaded, ConfigError> {
    let cwd = std::env::current_dir().map_err(|e| ConfigError::Io {
        path: PathBuf::from("."),
        message: e.to_string(),
    })?;
    load_from(&cwd)
}

/// Load configuration starting from a specific directory.
pub fn load_from(start: &Path) -> Result<Loaded, ConfigError> {
    let config_path = find_config_file(start)?;
    load_file(&config_path)
}

/// Load a specific configuration file.
pub fn load_file(config_path: &Path) -> Result<Loaded, ConfigError> {
    let content = std::fs::read_to_string(config_path).map_err(|e| ConfigError::Io {
        path: config_path.to_path_buf(),
        message: e.to_string(),
    })?;

    let config: Config = facet_styx::from_str(&content).map_err(|e| ConfigError::Parse {
        path: config_path.to_path_buf(),
        message: e.to_string(),
    })?;

    Ok(Loaded {
        config,
        path: config_path.to_path_buf(),
    })
}

/// Find `.config/kustard.styx` by searching up the directory tree.
fn find_config_file(start: &Path) -> Result<PathBuf, ConfigError> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_FILE);
        if config_path.exists() {
            return Ok(config_path);
        }

        if !current.pop() {
            return Err(ConfigError::NotFound);
        }
    }
}

/// Translate a cluster's configured filter.
pub fn target_filter(filter: &FilterConfig) -> TargetFilter {
    TargetFilter {
        db: filter.db.clone(),
        dbs: filter.dbs.clone(),
        webhook: filter.webhook.clone(),
        label: filter.label.clone(),
    }
}

pub fn schema_dialect(name: Option<&str>) -> Result<SchemaDialect, ConfigError> {
    match name {
        None => Ok(SchemaDialect::default()),
        Some(name) => SchemaDialect::from_name(name)
            .ok_or_else(|| ConfigError::Invalid(format!("unknown schema dialect `{name}`"))),
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// No `.config/kustard.styx` found in any parent directory
    NotFound,
    /// I/O error reading the file at `path`
    Io { path: PathBuf, message: String },
    /// Parse error in the Styx file at `path`
    Parse { path: PathBuf, message: String },
    /// The file parsed but a value makes no sense
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound => {
                write!(
                    f,
                    "No .config/kustard.styx found in current directory or any parent"
                )
            }
            ConfigError::Io { path, message } => {
                write!(f, "Failed to read {}: {}", path.display(), message)
            }
            ConfigError::Parse { path, message } => {
                write!(f, "Failed to parse {}: {}", path.display(), message)
            }
            ConfigError::Invalid(e) => write!(f, "Invalid .config/kustard.styx: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}
