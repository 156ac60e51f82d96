use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const CONFIG_VERSION: u32 = 1;
const DEFAULT_PORT: u16 = 9996;
const DEFAULT_DATABASE: &str = "library.db";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub version: u32,
    /// Library roots, scanned in order.
    pub libraries: Vec<String>,
    pub database_path: String,
    pub port: u16,
    pub bind_addr: String,
    pub scan_on_start: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            libraries: Vec::new(),
            database_path: DEFAULT_DATABASE.to_string(),
            port: DEFAULT_PORT,
            bind_addr: "0.0.0.0".to_string(),
            scan_on_start: true,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "io error: {}", err),
            ConfigError::Yaml(err) => write!(f, "yaml error: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Yaml(err)
    }
}

impl ServerConfig {
    pub fn listen_addr(&self) -> String {
        let host = self.bind_addr.trim();
        let host = if host.is_empty() { "0.0.0.0" } else { host };
        format!("{}:{}", host, self.port)
    }
}

pub fn config_path_from_env() -> PathBuf {
    match env::var("CATALOG_CONFIG") {
        Ok(value) if !value.trim().is_empty() => PathBuf::from(value),
        _ => default_config_path(),
    }
}

fn default_config_path() -> PathBuf {
    match env::current_exe() {
        Ok(exe) => exe
            .parent()
            .map(|dir| dir.join("config.yaml"))
            .unwrap_or_else(|| PathBuf::from("config.yaml")),
        Err(_) => PathBuf::from("config.yaml"),
    }
}

/// Reads the config at `path`, writing the defaults there first if it is missing.
/// The flag is true when the file was created.
pub fn load_or_create_config(path: &Path) -> Result<(ServerConfig, bool), ConfigError> {
    if path.exists() {
        let contents = fs::read_to_string(path)?;
        let mut config: ServerConfig = serde_yaml::from_str(&contents)?;
        if config.version < CONFIG_VERSION {
            config.version = CONFIG_VERSION;
        }
        if config.port == 0 {
            config.port = DEFAULT_PORT;
        }
        if config.database_path.trim().is_empty() {
            config.database_path = DEFAULT_DATABASE.to_string();
        }
        config.libraries.retain(|root| !root.trim().is_empty());
        return Ok((config, false));
    }

    let config = ServerConfig::default();
    save_config(path, &config)?;
    Ok((config, true))
}

pub fn save_config(path: &Path, config: &ServerConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let contents = serde_yaml::to_string(config)?;
    fs::write(path, contents)?;
    Ok(())
}

/// Relative values resolve against the directory holding the config file.
pub fn resolve_path(config_path: &Path, value: &str) -> PathBuf {
    let raw = PathBuf::from(value.trim());
    if raw.is_absolute() {
        return raw;
    }
    let base = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    base.join(raw)
}

pub fn library_roots(config_path: &Path, config: &ServerConfig) -> Vec<PathBuf> {
    config
        .libraries
        .iter()
        .map(|root| resolve_path(config_path, root))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{library_roots, load_or_create_config, resolve_path, ServerConfig};
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    #[test]
    fn resolves_relative_paths_next_to_config() {
        let config = Path::new("/etc/catalog/config.yaml");
        assert_eq!(
            resolve_path(config, "library.db"),
            PathBuf::from("/etc/catalog/library.db")
        );
        assert_eq!(resolve_path(config, "/srv/db"), PathBuf::from("/srv/db"));
        assert_eq!(
            resolve_path(Path::new("config.yaml"), "library.db"),
            PathBuf::from("./library.db")
        );
    }

    #[test]
    fn creates_default_config_when_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/config.yaml");
        let (config, created) = load_or_create_config(&path).unwrap();
        assert!(created);
        assert_eq!(config, ServerConfig::default());
        assert!(path.exists());

        let (again, created) = load_or_create_config(&path).unwrap();
        assert!(!created);
        assert_eq!(again, config);
    }

    #[test]
    fn fills_in_missing_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "libraries:\n  - music\n  - \"\"\n  - /mnt/archive\nport: 0\ndatabase_path: \"\"\n",
        )
        .unwrap();
        let (config, created) = load_or_create_config(&path).unwrap();
        assert!(!created);
        assert_eq!(config.port, 9996);
        assert_eq!(config.database_path, "library.db");
        assert!(config.scan_on_start);
        assert_eq!(
            library_roots(&path, &config),
            vec![dir.path().join("music"), PathBuf::from("/mnt/archive")]
        );
    }

    #[test]
    fn listen_addr_defaults_host() {
        let mut config = ServerConfig::default();
        config.bind_addr = " ".to_string();
        config.port = 8080;
        assert_eq!(config.listen_addr(), "0.0.0.0:8080");
    }
}
