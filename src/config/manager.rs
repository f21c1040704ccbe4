//! Configuration Manager

use std::path::Path;

use anyhow::Context;

use super::Config;
use crate::Result;

/// Manages configuration loading
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration from file, falling back to defaults when the file
    /// does not exist. Validation happens after CLI overrides are merged.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        if path.exists() {
            tracing::info!("Loading configuration from: {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            Ok(config)
        } else {
            tracing::debug!(
                "Configuration file not found at {}, using defaults",
                path.display()
            );
            Ok(Config::default())
        }
    }

    /// Load configuration from environment variables.
    pub fn load_from_env() -> Result<Config> {
        let mut config = Config::default();

        if let Ok(max_connections) = std::env::var("PEERCHAT_MAX_CONNECTIONS") {
            config.server.max_connections = max_connections
                .parse()
                .with_context(|| format!("Invalid PEERCHAT_MAX_CONNECTIONS: {max_connections}"))?;
        }

        if let Ok(buffer_size) = std::env::var("PEERCHAT_BUFFER_SIZE") {
            config.server.buffer_size = buffer_size
                .parse()
                .with_context(|| format!("Invalid PEERCHAT_BUFFER_SIZE: {buffer_size}"))?;
        }

        if let Ok(timeout) = std::env::var("PEERCHAT_SHUTDOWN_TIMEOUT") {
            config.server.shutdown_timeout = humantime::parse_duration(&timeout)
                .with_context(|| format!("Invalid PEERCHAT_SHUTDOWN_TIMEOUT: {timeout}"))?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use std::time::Duration;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = ConfigManager::load_from_file(Path::new("/definitely/not/here.toml")).unwrap();
        assert_eq!(config.server.max_connections, 10);
        assert_eq!(config.server.buffer_size, 256);
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[server]\nmax_connections = 3\nbuffer_size = 512\nshutdown_timeout = \"5s\""
        )
        .unwrap();

        let config = ConfigManager::load_from_file(file.path()).unwrap();
        assert_eq!(config.server.max_connections, 3);
        assert_eq!(config.server.buffer_size, 512);
        assert_eq!(config.server.shutdown_timeout, Duration::from_secs(5));
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nmax_connections = 3").unwrap();

        let config = ConfigManager::load_from_file(file.path()).unwrap();
        assert_eq!(config.server.max_connections, 3);
        assert_eq!(config.server.buffer_size, 256);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_connections = ]]").unwrap();
        assert!(ConfigManager::load_from_file(file.path()).is_err());
    }
}
