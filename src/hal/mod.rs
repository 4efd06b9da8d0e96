//! Hardware and transport implementations of the port traits.
//!
//! This module contains concrete implementations of the traits
//! defined in [`crate::traits`].
//!
//! # Available Implementations
//!
//! - `mock`: in-memory ports and a scripted decision source
//! - `servo`: sysfs PWM servo actuator (Linux)
//! - `serial`: serial radio link (requires `serial` feature)
//! - `grpc`: tonic client for the decision service (requires `grpc` feature)

pub mod mock;
pub mod servo;

#[cfg(feature = "serial")]
pub mod serial;

#[cfg(feature = "grpc")]
pub mod grpc;

pub use mock::*;
pub use servo::{ServoError, SysfsServo};

#[cfg(feature = "serial")]
pub use serial::{RadioError, SerialRadio};

#[cfg(feature = "grpc")]
pub use grpc::{ConnectError, GrpcDecisionSource};
