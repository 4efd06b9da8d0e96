//! Error types for the control loop and configuration.

use std::path::PathBuf;

use crate::events::Phase;

/// Failure that ends a control cycle.
///
/// `E` is the decision source's transport error.
#[derive(Debug, thiserror::Error)]
pub enum ControlError<E>
where
    E: std::error::Error + 'static,
{
    /// The stream for `phase` could not be opened.
    #[error("failed to open {phase} stream: {source}")]
    Open {
        /// Phase whose stream failed to open.
        phase: Phase,
        /// Transport error.
        source: E,
    },
    /// The stream for `phase` failed mid-way.
    #[error("{phase} stream receive failed: {source}")]
    Receive {
        /// Phase whose stream failed.
        phase: Phase,
        /// Transport error.
        source: E,
    },
}

impl<E> ControlError<E>
where
    E: std::error::Error + 'static,
{
    /// Phase the error occurred in.
    pub fn phase(&self) -> Phase {
        match self {
            ControlError::Open { phase, .. } | ControlError::Receive { phase, .. } => *phase,
        }
    }

    /// The underlying transport error.
    pub fn transport(&self) -> &E {
        match self {
            ControlError::Open { source, .. } | ControlError::Receive { source, .. } => source,
        }
    }
}

/// Configuration loading and validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The file is not valid TOML for [`Config`](crate::Config).
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}
