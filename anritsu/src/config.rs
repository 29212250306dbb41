//! Connection settings for an SCPI instrument.
//!
//! Settings can come from code ([`ClientConfig::new`] plus builders), from a
//! JSON file ([`ClientConfig::load`]), or from command-line flags shared by the
//! binaries ([`ConnectionArgs`]).
//!
//! JSON layout (only `host` is required):
//!
//! ```json
//! { "host": "192.168.1.2", "port": 2288, "timeout_secs": 10.0 }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// SCPI service port of the MT9085 family.
pub const DEFAULT_PORT: u16 = 2288;

/// Default connect/read/write timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Address of the bench instrument used by the demonstration binaries.
pub const DEFAULT_HOST: &str = "192.168.1.2";

/// Errors raised while building or loading a [`ClientConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid JSON for a [`ClientConfig`].
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Timeout is zero, negative, or not finite.
    #[error("Timeout must be a positive number of seconds, got {0}")]
    InvalidTimeout(f64),
}

/// Target endpoint and I/O timeout for one instrument connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Destination IP address or hostname.
    pub host: String,

    /// Destination TCP port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Applied to connect, write, and read.
    #[serde(
        rename = "timeout_secs",
        default = "default_timeout",
        serialize_with = "serialize_secs",
        deserialize_with = "deserialize_secs"
    )]
    pub timeout: Duration,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn serialize_secs<S: Serializer>(timeout: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(timeout.as_secs_f64())
}

fn deserialize_secs<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let secs = f64::deserialize(deserializer)?;
    duration_from_secs(secs).map_err(serde::de::Error::custom)
}

fn duration_from_secs(secs: f64) -> Result<Duration, ConfigError> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(ConfigError::InvalidTimeout(secs));
    }
    Ok(Duration::from_secs_f64(secs))
}

impl ClientConfig {
    /// Config for `host` with the default port (2288) and timeout (10 s).
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `host:port`, suitable for [`std::net::ToSocketAddrs`].
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Reject settings the OS would refuse at connect time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(0.0));
        }
        Ok(())
    }

    /// Load and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }
}

/// Connection flags shared by the instrument binaries.
///
/// Flatten into a binary's argument struct with `#[command(flatten)]`.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Instrument IP address or hostname
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// SCPI TCP port
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Connect/read timeout in seconds
    #[arg(long, default_value_t = 10.0)]
    pub timeout: f64,

    /// JSON config file; overrides --host, --port and --timeout
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl ConnectionArgs {
    /// Resolve the flags (or the config file) into a validated config.
    pub fn into_config(self) -> Result<ClientConfig, ConfigError> {
        if let Some(path) = self.config {
            return ClientConfig::load(&path);
        }
        let timeout = duration_from_secs(self.timeout)?;
        Ok(ClientConfig::new(self.host)
            .with_port(self.port)
            .with_timeout(timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        connection: ConnectionArgs,
    }

    #[test]
    fn test_new_applies_defaults() {
        let config = ClientConfig::new("10.0.0.5");
        assert_eq!(config.host, "10.0.0.5");
        assert_eq!(config.port, 2288);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.address(), "10.0.0.5:2288");
    }

    #[test]
    fn test_builders_override_defaults() {
        let config = ClientConfig::new("instrument.local")
            .with_port(5025)
            .with_timeout(Duration::from_millis(250));
        assert_eq!(config.address(), "instrument.local:5025");
        assert_eq!(config.timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = ClientConfig::new("10.0.0.5").with_timeout(Duration::ZERO);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTimeout(_))
        ));
    }

    #[test]
    fn test_json_minimal_uses_defaults() {
        let config: ClientConfig = serde_json::from_str(r#"{"host": "192.168.1.2"}"#).unwrap();
        assert_eq!(config, ClientConfig::new("192.168.1.2"));
    }

    #[test]
    fn test_json_full() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"host": "a", "port": 9000, "timeout_secs": 1.5}"#).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.timeout, Duration::from_millis(1500));
    }

    #[test]
    fn test_json_negative_timeout_rejected() {
        let result: Result<ClientConfig, _> =
            serde_json::from_str(r#"{"host": "a", "timeout_secs": -1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_json_serializes_seconds() {
        let config = ClientConfig::new("a").with_timeout(Duration::from_secs(3));
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["timeout_secs"], 3.0);
        assert_eq!(value["port"], 2288);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"host": "10.1.1.1", "port": 2300}}"#).unwrap();

        let config = ClientConfig::load(file.path()).unwrap();
        assert_eq!(config.address(), "10.1.1.1:2300");
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = ClientConfig::load(&dir.path().join("missing.json"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_args_defaults() {
        let cli = TestCli::parse_from(["test"]);
        let config = cli.connection.into_config().unwrap();
        assert_eq!(config, ClientConfig::new(DEFAULT_HOST));
    }

    #[test]
    fn test_args_override() {
        let cli = TestCli::parse_from([
            "test",
            "--host",
            "127.0.0.1",
            "--port",
            "4000",
            "--timeout",
            "0.5",
        ]);
        let config = cli.connection.into_config().unwrap();
        assert_eq!(config.address(), "127.0.0.1:4000");
        assert_eq!(config.timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_args_zero_timeout_rejected() {
        let cli = TestCli::parse_from(["test", "--timeout", "0"]);
        assert!(matches!(
            cli.connection.into_config(),
            Err(ConfigError::InvalidTimeout(_))
        ));
    }
}
