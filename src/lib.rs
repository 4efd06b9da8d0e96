//! # rs-bollard
//!
//! Edge controller for a retractable vehicle bollard. Authorization
//! decisions arrive from a remote server over two gRPC server-push streams
//! and are turned into two physical actions: moving a servo that raises or
//! lowers the post, and sending a one-byte open/close signal over a radio
//! link to a companion lock or indicator.
//!
//! ## Features
//!
//! - **Single state owner**: [`BollardController`] is the only writer of the bollard state
//! - **Paired outputs**: every [`PhysicalCommand`] carries one actuator target and the matching signal byte
//! - **No redundant moves**: a command is emitted only on an actual state change
//! - **Serialized phases**: override decisions first, then access decisions, never interleaved
//! - **Configurable failure policy**: exit (default), retry with backoff, fail-safe close
//!
//! ## Architecture
//!
//! - `commands` - state, signal byte, command and outcome types
//! - `events` - decisions from the remote authority and phase markers
//! - `traits` - actuator, radio and decision-source abstractions
//! - `controller` - the state machine
//! - `control_loop` - stream re-opening, retry and shutdown handling
//! - `hal` - concrete implementations (mock, sysfs servo, serial radio, gRPC)
//!
//! ## Example
//!
//! ```rust
//! use rs_bollard::{AccessEvent, BollardController, BollardState, OverrideEvent};
//! use rs_bollard::hal::{MockActuator, MockSignal};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let mut controller = BollardController::new(MockActuator::new(), MockSignal::new());
//!
//! controller.handle_override(OverrideEvent::ResumeAutomatic).await;
//! controller.handle_access(AccessEvent::Allow).await;
//! assert_eq!(controller.state(), BollardState::Open);
//! assert_eq!(controller.signal().sent_bytes(), b"o".to_vec());
//! # });
//! ```

#![warn(missing_docs)]

/// Bollard state, signal bytes and physical commands.
pub mod commands;
/// Configuration file, environment and defaults.
pub mod config;
/// Outer loop that re-opens streams and applies the retry policy.
pub mod control_loop;
/// The bollard control state machine.
pub mod controller;
/// Error types.
pub mod error;
/// Remote decisions and phase markers.
pub mod events;
/// Port implementations: mocks, sysfs servo, serial radio, gRPC client.
pub mod hal;
/// Retry policies for stream failures.
pub mod policy;
/// Port and decision-source traits.
pub mod traits;

/// Protobuf wire messages of the decision service.
#[cfg(feature = "grpc")]
pub mod messages;

// Re-exports for convenience
pub use commands::{BollardState, CommandOutcome, CommandSource, PhysicalCommand, SignalByte};
pub use config::Config;
pub use control_loop::{ControlLoop, CycleReport, LoopSettings};
pub use controller::{BollardController, BollardSnapshot};
pub use error::{ConfigError, ControlError};
pub use events::{AccessEvent, OverrideEvent, OverrideStep, Phase, PhaseEnd};
pub use policy::{ExponentialBackoff, LoopPolicy, NoRetry, RetryPolicy};
pub use traits::{ActuatorPort, DecisionSource, EventStream, SignalPort};
