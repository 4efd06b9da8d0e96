//! Trait definitions for the controller's collaborators.
//!
//! These abstractions let the bollard controller run against real hardware
//! on a Raspberry Pi and against in-memory fakes in tests.
//!
//! # Submodules
//!
//! - `hardware`: actuator and radio output ports
//! - `source`: the remote decision streams
//!
//! # Ports
//!
//! - [`ActuatorPort`]: move the post, blocking for the settle time
//! - [`SignalPort`]: send one byte over the radio link
//!
//! # Decisions
//!
//! - [`DecisionSource`]: opens override and access streams
//! - [`EventStream`]: yields events until the remote ends the stream

pub mod hardware;
pub mod source;

pub use hardware::*;
pub use source::*;
