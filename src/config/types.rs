//! Configuration Types

use std::time::Duration;

use anyhow::bail;
use serde::{Deserialize, Serialize};

use crate::connection::TERMINATE_TOKEN;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// TCP port the listener binds on. Always overridden by the required CLI
    /// argument; a value of 0 here means "not configured".
    pub listen_port: u16,
    /// Cap on simultaneous connections, enforced at dial time.
    pub max_connections: usize,
    /// Size of each receive loop's read buffer in bytes.
    pub buffer_size: usize,
    /// How long process exit waits for background tasks to stop.
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_port: 0,
            max_connections: 10,
            buffer_size: 256,
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    /// Apply CLI argument overrides (highest priority).
    pub fn merge_with_cli_args(
        &mut self,
        port: u16,
        max_connections: Option<usize>,
        buffer_size: Option<usize>,
    ) {
        self.server.listen_port = port;
        if let Some(max_connections) = max_connections {
            self.server.max_connections = max_connections;
        }
        if let Some(buffer_size) = buffer_size {
            self.server.buffer_size = buffer_size;
        }
    }

    /// Reject configurations the runtime cannot operate under.
    pub fn validate(&self) -> crate::Result<()> {
        if self.server.listen_port == 0 {
            bail!("a listening port is required");
        }
        if self.server.max_connections == 0 {
            bail!("max_connections must be at least 1");
        }
        if self.server.buffer_size < TERMINATE_TOKEN.len() {
            bail!(
                "buffer_size must be at least {} bytes so control tokens arrive whole",
                TERMINATE_TOKEN.len()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_args_take_precedence() {
        let mut config = Config::default();
        config.merge_with_cli_args(4000, Some(5), None);
        assert_eq!(config.server.listen_port, 4000);
        assert_eq!(config.server.max_connections, 5);
        assert_eq!(config.server.buffer_size, 256);
    }

    #[test]
    fn validation_rejects_missing_port() {
        assert!(Config::default().validate().is_err());
    }

    #[test]
    fn validation_rejects_zero_connection_cap() {
        let mut config = Config::default();
        config.merge_with_cli_args(4000, Some(0), None);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validation_rejects_buffer_smaller_than_control_token() {
        let mut config = Config::default();
        config.merge_with_cli_args(4000, None, Some(4));
        assert!(config.validate().is_err());
    }

    #[test]
    fn defaults_with_a_port_are_valid() {
        let mut config = Config::default();
        config.merge_with_cli_args(4000, None, None);
        assert!(config.validate().is_ok());
    }
}
