//! Configuration management for term-gateway.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::collections::HashMap;
use std::net::IpAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::api::{ServerConfig, SessionDefaults};
use crate::cli::Args;
use crate::pty::PtySize;
use crate::session::PumpMode;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerSection,
    /// Terminal session configuration.
    pub terminal: TerminalSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Terminal session configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalSection {
    /// Command to run for new sessions. Defaults to the platform shell.
    pub shell: Option<String>,
    /// Environment overrides applied to every session.
    pub env: HashMap<String, String>,
    /// Initial terminal rows.
    pub rows: u16,
    /// Initial terminal columns.
    pub cols: u16,
    /// Output delivery mode: "event" or "poll".
    pub pump_mode: String,
}

impl Default for TerminalSection {
    fn default() -> Self {
        Self {
            shell: None,
            env: HashMap::new(),
            rows: 24,
            cols: 80,
            pump_mode: "event".to_string(),
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("TERM_GATEWAY_HOST") {
            self.server.host = host;
        }

        if let Ok(port) = std::env::var("TERM_GATEWAY_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }

        if let Ok(shell) = std::env::var("TERM_GATEWAY_SHELL") {
            if !shell.is_empty() {
                self.terminal.shell = Some(shell);
            }
        }

        if let Ok(level) = std::env::var("TERM_GATEWAY_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        self.server.host = args.host.to_string();
        self.server.port = args.port;

        if let Some(ref shell) = args.shell {
            self.terminal.shell = Some(shell.clone());
        }

        if args.poll {
            self.terminal.pump_mode = "poll".to_string();
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        // Start with defaults
        let mut config = Config::default();

        // Load from config file if specified
        if let Some(ref path) = args.config {
            config = Config::from_file(path)?;
        }

        // Apply environment variable overrides
        config.apply_env();

        // Apply CLI argument overrides (highest priority)
        config.apply_args(args);

        Ok(config)
    }

    /// Convert to ServerConfig for the API server.
    pub fn to_server_config(&self) -> Result<ServerConfig, ConfigError> {
        let host: IpAddr = self
            .server
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidHost(self.server.host.clone()))?;

        Ok(ServerConfig::new(host.to_string(), self.server.port))
    }

    /// Session creation defaults derived from the terminal section.
    pub fn to_session_defaults(&self) -> SessionDefaults {
        SessionDefaults {
            command: self.terminal.shell.clone(),
            env: self.terminal.env.clone(),
            size: PtySize::new(self.terminal.rows, self.terminal.cols),
        }
    }

    /// Output pump mode for new attachments.
    pub fn pump_mode(&self) -> Result<PumpMode, ConfigError> {
        PumpMode::parse(&self.terminal.pump_mode)
            .ok_or_else(|| ConfigError::InvalidPumpMode(self.terminal.pump_mode.clone()))
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
    /// Invalid host address.
    InvalidHost(String),
    /// Unknown pump mode string.
    InvalidPumpMode(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
            Self::InvalidHost(host) => write!(f, "invalid host address: {}", host),
            Self::InvalidPumpMode(mode) => write!(f, "invalid pump mode: {}", mode),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert!(config.terminal.shell.is_none());
        assert_eq!(config.terminal.rows, 24);
        assert_eq!(config.terminal.cols, 80);
        assert_eq!(config.pump_mode().unwrap(), PumpMode::Event);
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "server": {
                "host": "0.0.0.0",
                "port": 8080
            },
            "terminal": {
                "shell": "bash",
                "env": {"TERM": "xterm-256color"},
                "rows": 40,
                "cols": 120
            }
        }"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.terminal.shell.as_deref(), Some("bash"));
        assert_eq!(config.terminal.rows, 40);
        assert_eq!(config.terminal.cols, 120);
    }

    #[test]
    fn test_config_partial_json() {
        let json = r#"{
            "server": {
                "port": 9000
            }
        }"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.host, "127.0.0.1"); // Default
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.terminal.rows, 24); // Default
    }

    #[test]
    fn test_apply_args() {
        let mut config = Config::default();
        let args = Args {
            host: "192.168.1.1".parse().unwrap(),
            port: 5000,
            shell: Some("zsh".to_string()),
            poll: true,
            ..Args::default()
        };

        config.apply_args(&args);

        assert_eq!(config.server.host, "192.168.1.1");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.terminal.shell.as_deref(), Some("zsh"));
        assert_eq!(config.pump_mode().unwrap(), PumpMode::Poll);
    }

    #[test]
    fn test_to_server_config() {
        let config = Config::default();
        let server_config = config.to_server_config().unwrap();

        assert_eq!(server_config.host, "127.0.0.1");
        assert_eq!(server_config.port, 3000);
    }

    #[test]
    fn test_to_session_defaults() {
        let mut config = Config::default();
        config.terminal.shell = Some("bash".to_string());
        config.terminal.rows = 50;
        config.terminal.cols = 160;
        config
            .terminal
            .env
            .insert("LANG".to_string(), "C.UTF-8".to_string());

        let defaults = config.to_session_defaults();
        assert_eq!(defaults.command.as_deref(), Some("bash"));
        assert_eq!(defaults.size, PtySize::new(50, 160));
        assert_eq!(defaults.env.get("LANG").map(String::as_str), Some("C.UTF-8"));
    }

    #[test]
    fn test_invalid_host() {
        let mut config = Config::default();
        config.server.host = "not-an-ip".to_string();

        let result = config.to_server_config();
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_pump_mode() {
        let mut config = Config::default();
        config.terminal.pump_mode = "busy-wait".to_string();

        assert!(config.pump_mode().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(json.contains("\"host\""));
        assert!(json.contains("\"port\""));
        assert!(json.contains("\"pump_mode\""));
    }
}
