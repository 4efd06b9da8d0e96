//! Configuration for the edge controller.
//!
//! Loaded from a TOML file; every section and key is optional. The binary
//! layers the `GRPCSERVERADDR` environment variable and CLI flags on top.
//!
//! # Example
//!
//! ```rust
//! use rs_bollard::config::{Config, ControlConfig, ServerConfig};
//!
//! // Use defaults
//! let config = Config::default();
//! assert_eq!(config.actuator.settle_ms, 1000);
//!
//! // Or customize
//! let config = Config::default()
//!     .with_server(ServerConfig::default().with_address("10.0.0.2:50051"))
//!     .with_control(ControlConfig::default().with_recv_timeout_ms(60_000));
//! assert!(config.validate().is_ok());
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::policy::{ExponentialBackoff, LoopPolicy, NoRetry};

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "rs-bollard.toml";

/// Environment variable carrying the server address.
pub const SERVER_ADDR_ENV: &str = "GRPCSERVERADDR";

// ============================================================================
// Main Config
// ============================================================================

/// Complete application configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,
    /// Decision service connection
    pub server: ServerConfig,
    /// Servo actuator
    pub actuator: ActuatorConfig,
    /// Serial radio
    pub radio: RadioConfig,
    /// Control loop behavior
    pub control: ControlConfig,
}

impl Config {
    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Load `path` if given, else `./rs-bollard.toml` if present, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let local = Path::new(DEFAULT_CONFIG_FILE);
                if local.exists() {
                    Self::load(local)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Default configuration rendered as TOML.
    pub fn example_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }

    /// Reject settings the hardware or loop cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.address.trim().is_empty() {
            return Err(ConfigError::Invalid("server.address is empty".into()));
        }
        let a = &self.actuator;
        if a.open_duty_ns >= a.period_ns || a.closed_duty_ns >= a.period_ns {
            return Err(ConfigError::Invalid(format!(
                "actuator duty ({} / {} ns) must be shorter than period ({} ns)",
                a.open_duty_ns, a.closed_duty_ns, a.period_ns
            )));
        }
        if self.radio.baud == 0 {
            return Err(ConfigError::Invalid("radio.baud must be non-zero".into()));
        }
        if self.control.on_error == OnError::Retry && self.control.retry_max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "control.on_error = \"retry\" needs retry_max_attempts > 0".into(),
            ));
        }
        Ok(())
    }

    /// Set general configuration
    pub fn with_general(mut self, general: GeneralConfig) -> Self {
        self.general = general;
        self
    }

    /// Set server configuration
    pub fn with_server(mut self, server: ServerConfig) -> Self {
        self.server = server;
        self
    }

    /// Set actuator configuration
    pub fn with_actuator(mut self, actuator: ActuatorConfig) -> Self {
        self.actuator = actuator;
        self
    }

    /// Set radio configuration
    pub fn with_radio(mut self, radio: RadioConfig) -> Self {
        self.radio = radio;
        self
    }

    /// Set control loop configuration
    pub fn with_control(mut self, control: ControlConfig) -> Self {
        self.control = control;
        self
    }
}

// ============================================================================
// Sections
// ============================================================================

/// General settings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: Option<String>,
}

/// Decision service connection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// `host:port` or full URI of the gRPC server
    pub address: String,
    /// Connect timeout in milliseconds
    pub connect_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "http://127.0.0.1:50051".to_string(),
            connect_timeout_ms: 5000,
        }
    }
}

impl ServerConfig {
    /// Set the server address
    pub fn with_address(mut self, address: &str) -> Self {
        self.address = address.to_string();
        self
    }

    /// Connect timeout as a `Duration`.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Servo actuator on a sysfs PWM channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActuatorConfig {
    /// sysfs PWM class directory
    pub sysfs_root: PathBuf,
    /// PWM chip index (`pwmchipN`)
    pub chip: u32,
    /// PWM channel index (`pwmN`)
    pub channel: u32,
    /// Frame period in nanoseconds (20 ms = 50 Hz)
    pub period_ns: u64,
    /// Pulse width for the open position
    pub open_duty_ns: u64,
    /// Pulse width for the closed position
    pub closed_duty_ns: u64,
    /// Time to hold after each move, in milliseconds
    pub settle_ms: u64,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            sysfs_root: PathBuf::from("/sys/class/pwm"),
            chip: 0,
            channel: 0,
            period_ns: 20_000_000,
            open_duty_ns: 1_100_000,
            closed_duty_ns: 2_500_000,
            settle_ms: 1000,
        }
    }
}

impl ActuatorConfig {
    /// Settle time as a `Duration`.
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// Serial radio.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioConfig {
    /// Serial device path
    pub port: String,
    /// Baud rate
    pub baud: u32,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud: 9600,
        }
    }
}

/// What the control loop does when a stream fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnError {
    /// Stop the process.
    #[default]
    Exit,
    /// Retry with exponential backoff.
    Retry,
}

/// Control loop behavior.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Receive timeout in milliseconds; 0 waits forever
    pub recv_timeout_ms: u64,
    /// Stream failure policy
    pub on_error: OnError,
    /// Consecutive failed cycles before giving up (retry only)
    pub retry_max_attempts: u32,
    /// First backoff delay in milliseconds
    pub retry_base_delay_ms: u64,
    /// Backoff ceiling in milliseconds
    pub retry_max_delay_ms: u64,
    /// Close the bollard when a stream fails
    pub fail_safe_on_error: bool,
    /// Close the bollard when the loop stops (Ctrl-C or fatal error)
    pub close_on_shutdown: bool,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            recv_timeout_ms: 0,
            on_error: OnError::Exit,
            retry_max_attempts: 5,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 30_000,
            fail_safe_on_error: false,
            close_on_shutdown: false,
        }
    }
}

impl ControlConfig {
    /// Set the receive timeout
    pub fn with_recv_timeout_ms(mut self, ms: u64) -> Self {
        self.recv_timeout_ms = ms;
        self
    }

    /// Set the error policy
    pub fn with_on_error(mut self, on_error: OnError) -> Self {
        self.on_error = on_error;
        self
    }

    /// Receive timeout, `None` when disabled.
    pub fn recv_timeout(&self) -> Option<Duration> {
        (self.recv_timeout_ms > 0).then(|| Duration::from_millis(self.recv_timeout_ms))
    }

    /// Retry policy selected by `on_error`.
    pub fn policy(&self) -> LoopPolicy {
        match self.on_error {
            OnError::Exit => LoopPolicy::Exit(NoRetry),
            OnError::Retry => LoopPolicy::Backoff(ExponentialBackoff::new(
                self.retry_max_attempts,
                Duration::from_millis(self.retry_base_delay_ms),
                Duration::from_millis(self.retry_max_delay_ms),
            )),
        }
    }
}
