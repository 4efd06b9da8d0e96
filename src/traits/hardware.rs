//! Port traits for the two physical output channels.
//!
//! # Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`ActuatorPort`] | Move the post to a calibrated position and hold it |
//! | [`SignalPort`] | Transmit one control byte to the companion device |
//!
//! # Implementation
//!
//! For tests and dry runs, use the mock implementations from
//! [`crate::hal::mock`]. On a Raspberry Pi, use [`crate::hal::SysfsServo`]
//! and `hal::SerialRadio` (requires the `serial` feature).
//!
//! # Example
//!
//! ```rust
//! use rs_bollard::traits::{ActuatorPort, SignalPort};
//! use rs_bollard::hal::{MockActuator, MockSignal};
//! use rs_bollard::{BollardState, SignalByte};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let mut actuator = MockActuator::new();
//! let mut radio = MockSignal::new();
//!
//! radio.send(SignalByte::Open).await.unwrap();
//! actuator.move_to(BollardState::Open).await.unwrap();
//!
//! assert_eq!(actuator.position(), Some(BollardState::Open));
//! assert_eq!(radio.sent_bytes(), b"o");
//! # });
//! ```

use core::fmt;
use core::future::Future;
use std::time::Duration;

use crate::commands::{BollardState, SignalByte};

/// Position actuator (the servo that raises and lowers the post).
///
/// # Contract
///
/// - `move_to` resolves only after the settle time has elapsed, so the
///   mechanism has had time to reach the target.
/// - Calling `move_to` twice with the same position is harmless.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use rs_bollard::traits::ActuatorPort;
/// use rs_bollard::BollardState;
///
/// struct MyServo { /* pwm handle */ }
///
/// impl ActuatorPort for MyServo {
///     type Error = std::io::Error;
///
///     async fn move_to(&mut self, position: BollardState) -> Result<(), Self::Error> {
///         // write duty cycle for `position`...
///         tokio::time::sleep(self.settle_time()).await;
///         Ok(())
///     }
///
///     fn settle_time(&self) -> std::time::Duration {
///         std::time::Duration::from_secs(1)
///     }
/// }
/// ```
pub trait ActuatorPort {
    /// Error type for actuator operations.
    type Error: fmt::Display;

    /// Drive the actuator to `position` and wait for it to settle.
    fn move_to(&mut self, position: BollardState)
        -> impl Future<Output = Result<(), Self::Error>>;

    /// How long `move_to` holds before returning.
    fn settle_time(&self) -> Duration;
}

/// Radio link to the companion lock/indicator device.
///
/// Fire-and-forget: the device never acknowledges. A returned error only
/// means the local write failed.
pub trait SignalPort {
    /// Error type for radio writes.
    type Error: fmt::Display;

    /// Transmit one control byte.
    fn send(&mut self, signal: SignalByte) -> impl Future<Output = Result<(), Self::Error>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingActuator {
        moves: Vec<BollardState>,
    }

    impl ActuatorPort for CountingActuator {
        type Error = &'static str;

        async fn move_to(&mut self, position: BollardState) -> Result<(), Self::Error> {
            self.moves.push(position);
            Ok(())
        }

        fn settle_time(&self) -> Duration {
            Duration::ZERO
        }
    }

    struct DeadRadio;

    impl SignalPort for DeadRadio {
        type Error = &'static str;

        async fn send(&mut self, _signal: SignalByte) -> Result<(), Self::Error> {
            Err("radio unplugged")
        }
    }

    #[tokio::test]
    async fn actuator_repeat_is_harmless() {
        let mut actuator = CountingActuator { moves: Vec::new() };
        actuator.move_to(BollardState::Open).await.unwrap();
        actuator.move_to(BollardState::Open).await.unwrap();
        assert_eq!(actuator.moves, vec![BollardState::Open, BollardState::Open]);
    }

    #[tokio::test]
    async fn signal_error_is_reported() {
        let mut radio = DeadRadio;
        let err = radio.send(SignalByte::Close).await.unwrap_err();
        assert_eq!(err, "radio unplugged");
    }
}
