use std::net::SocketAddr;
use std::path::Path;

use flotilla_sync::SyncConfig;
use jiff::SignedDuration;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub transport: TransportConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransportConfig {
    /// Live telemetry server.
    WebSocket { url: String },
    Simulated {
        /// Number of simulated drones
        drone_count: usize,
        /// Milliseconds between telemetry rounds
        interval_ms: u64,
        /// End each session after this many seconds
        #[serde(default)]
        session_secs: Option<u64>,
    },
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address for the HTTP server to listen on
    pub http_addr: SocketAddr,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Seconds between fleet reports in the log, 0 disables them
    pub interval_secs: u64,
    /// Drones silent for longer than this are reported as stale
    pub stale_after_secs: u64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            stale_after_secs: 60,
        }
    }
}

impl ReportConfig {
    /// Age after which a drone counts as stale.
    pub fn stale_after(&self) -> Result<SignedDuration, ConfigError> {
        i64::try_from(self.stale_after_secs)
            .map(SignedDuration::from_secs)
            .map_err(|_| {
                ConfigError::Invalid(format!(
                    "report stale_after_secs is too large: {}",
                    self.stale_after_secs
                ))
            })
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match &self.transport {
            TransportConfig::WebSocket { url } => {
                if !(url.starts_with("ws://") || url.starts_with("wss://")) {
                    return Err(ConfigError::Invalid(format!(
                        "websocket url must start with ws:// or wss://, got '{url}'"
                    )));
                }
            }
            TransportConfig::Simulated {
                interval_ms,
                session_secs,
                ..
            } => {
                if *interval_ms == 0 {
                    return Err(ConfigError::Invalid(
                        "simulated interval_ms must be positive".to_owned(),
                    ));
                }
                if *session_secs == Some(0) {
                    return Err(ConfigError::Invalid(
                        "simulated session_secs must be positive".to_owned(),
                    ));
                }
            }
        }
        self.report.stale_after()?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transport: TransportConfig::Simulated {
                drone_count: 8,
                interval_ms: 1000,
                session_secs: None,
            },
            sync: SyncConfig::default(),
            server: ServerConfig {
                http_addr: SocketAddr::from(([0, 0, 0, 0], 8090)),
            },
            report: ReportConfig::default(),
        }
    }
}
