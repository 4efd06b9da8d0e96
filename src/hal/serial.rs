//! Radio link to the companion device over a serial-attached transceiver.
//!
//! The radio module (an XBee-style transparent serial bridge) forwards every
//! byte written to the serial port. The companion device only understands
//! `b'o'` and `b'c'`.

use tokio::io::AsyncWriteExt;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info};

use crate::commands::SignalByte;
use crate::config::RadioConfig;
use crate::traits::SignalPort;

/// Errors from the serial radio.
#[derive(Debug, thiserror::Error)]
pub enum RadioError {
    /// The serial device could not be opened.
    #[error("cannot open radio port {port}: {source}")]
    Open {
        /// Device path.
        port: String,
        /// Underlying error.
        #[source]
        source: tokio_serial::Error,
    },
    /// Writing the signal byte failed.
    #[error("radio write failed: {0}")]
    Write(#[from] std::io::Error),
}

/// Signal port backed by a serial device.
pub struct SerialRadio {
    port: SerialStream,
    path: String,
}

impl SerialRadio {
    /// Open the configured serial device.
    pub fn open(config: &RadioConfig) -> Result<Self, RadioError> {
        let port = tokio_serial::new(config.port.as_str(), config.baud)
            .open_native_async()
            .map_err(|source| RadioError::Open {
                port: config.port.clone(),
                source,
            })?;
        info!(port = %config.port, baud = config.baud, "radio port opened");
        Ok(Self {
            port,
            path: config.port.clone(),
        })
    }
}

impl SignalPort for SerialRadio {
    type Error = RadioError;

    async fn send(&mut self, signal: SignalByte) -> Result<(), RadioError> {
        self.port.write_all(&[signal.as_byte()]).await?;
        self.port.flush().await?;
        debug!(port = %self.path, byte = %(signal.as_byte() as char), "radio signal sent");
        Ok(())
    }
}
