//! Control loop: keeps re-opening the decision streams and feeds the controller.
//!
//! One cycle is:
//!
//! 1. open the override stream, run the override phase to completion
//! 2. open the access stream, run the automatic phase to completion
//!
//! and [`ControlLoop::run`] repeats cycles forever. A stream that ends
//! cleanly is a normal phase completion. A stream that cannot be opened or
//! fails while receiving ends the cycle with a [`ControlError`]; the
//! [`RetryPolicy`] then decides whether to start a new cycle or give up.
//!
//! # Example
//!
//! ```rust
//! use rs_bollard::{BollardController, BollardState, ControlLoop, LoopSettings, OverrideEvent, AccessEvent};
//! use rs_bollard::hal::{MockActuator, MockDecisionSource, MockSignal};
//! use rs_bollard::policy::NoRetry;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let source = MockDecisionSource::new()
//!     .with_override_session([OverrideEvent::open(), OverrideEvent::ResumeAutomatic])
//!     .with_access_session([AccessEvent::Allow]);
//! let controller = BollardController::new(MockActuator::new(), MockSignal::new());
//!
//! let mut control = ControlLoop::new(source, controller, LoopSettings::default(), NoRetry);
//! control.run_cycle().await.unwrap();
//! assert_eq!(control.controller().state(), BollardState::Open);
//! # });
//! ```

use core::future::Future;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::commands::CommandSource;
use crate::config::ControlConfig;
use crate::controller::BollardController;
use crate::error::ControlError;
use crate::events::{Phase, PhaseEnd};
use crate::policy::RetryPolicy;
use crate::traits::{ActuatorPort, DecisionSource, SignalPort};

/// Knobs for the loop's failure handling.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoopSettings {
    /// Treat this much silence on a stream as a stream end (and close).
    pub recv_timeout: Option<Duration>,
    /// Close the bollard whenever a stream fails.
    pub fail_safe_on_error: bool,
    /// Close the bollard when [`ControlLoop::run_until`] returns.
    pub close_on_shutdown: bool,
}

impl From<&ControlConfig> for LoopSettings {
    fn from(config: &ControlConfig) -> Self {
        Self {
            recv_timeout: config.recv_timeout(),
            fail_safe_on_error: config.fail_safe_on_error,
            close_on_shutdown: config.close_on_shutdown,
        }
    }
}

/// How the two phases of one cycle ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CycleReport {
    /// End of the override phase.
    pub override_end: PhaseEnd,
    /// End of the automatic phase.
    pub automatic_end: PhaseEnd,
}

/// Outermost driver of the controller.
pub struct ControlLoop<D, A, S, P>
where
    D: DecisionSource,
    A: ActuatorPort,
    S: SignalPort,
    P: RetryPolicy,
{
    source: D,
    controller: BollardController<A, S>,
    settings: LoopSettings,
    policy: P,
    cycles: u64,
}

impl<D, A, S, P> ControlLoop<D, A, S, P>
where
    D: DecisionSource,
    A: ActuatorPort,
    S: SignalPort,
    P: RetryPolicy,
{
    /// Create a loop around an existing controller.
    pub fn new(source: D, controller: BollardController<A, S>, settings: LoopSettings, policy: P) -> Self {
        Self {
            source,
            controller,
            settings,
            policy,
            cycles: 0,
        }
    }

    /// Run one override phase followed by one automatic phase.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, ControlError<D::Error>> {
        let recv_timeout = self.settings.recv_timeout;

        let mut overrides = self
            .source
            .open_override_stream()
            .await
            .map_err(|source| ControlError::Open {
                phase: Phase::Override,
                source,
            })?;
        let override_end = self
            .controller
            .run_override_phase(&mut overrides, recv_timeout)
            .await
            .map_err(|source| ControlError::Receive {
                phase: Phase::Override,
                source,
            })?;
        drop(overrides);

        let mut access = self
            .source
            .open_access_stream()
            .await
            .map_err(|source| ControlError::Open {
                phase: Phase::Automatic,
                source,
            })?;
        let automatic_end = self
            .controller
            .run_automatic_phase(&mut access, recv_timeout)
            .await
            .map_err(|source| ControlError::Receive {
                phase: Phase::Automatic,
                source,
            })?;

        self.cycles += 1;
        let report = CycleReport {
            override_end,
            automatic_end,
        };
        debug!(cycle = self.cycles, ?report, "cycle complete");
        Ok(report)
    }

    /// Repeat cycles until the retry policy gives up.
    ///
    /// Only returns on failure; the error is the one that exhausted the
    /// policy.
    pub async fn run(&mut self) -> Result<(), ControlError<D::Error>> {
        let mut attempt = 0u32;
        loop {
            let err = match self.run_cycle().await {
                Ok(_) => {
                    attempt = 0;
                    continue;
                }
                Err(err) => err,
            };

            if self.settings.fail_safe_on_error {
                warn!(error = %err, "stream failure, closing bollard");
                self.controller.force_close(CommandSource::FailSafe).await;
            }

            if !self.policy.should_retry(attempt) {
                error!(error = %err, attempt, state = %self.controller.state(), "stream failure, giving up");
                return Err(err);
            }

            let delay = self.policy.delay(attempt);
            warn!(
                error = %err,
                attempt,
                ?delay,
                "stream failure, restarting from override phase"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// Run until `shutdown` resolves or the loop fails.
    ///
    /// Either way, when `close_on_shutdown` is set the bollard is closed
    /// before returning; otherwise it stays where it is.
    ///
    /// Shutdown may land while a command is still settling. The command is
    /// then left in flight and the shutdown close is issued regardless of
    /// the recorded state.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<(), ControlError<D::Error>>
    where
        F: Future,
    {
        let result = tokio::select! {
            result = self.run() => result,
            _ = shutdown => {
                info!("shutdown requested");
                Ok(())
            }
        };

        if self.settings.close_on_shutdown {
            self.controller.force_close(CommandSource::Shutdown).await;
        } else {
            warn!(
                state = %self.controller.state(),
                in_flight = ?self.controller.in_flight(),
                "stopping with bollard left in last position"
            );
        }
        result
    }

    /// The controller.
    pub fn controller(&self) -> &BollardController<A, S> {
        &self.controller
    }

    /// The decision source.
    pub fn source(&self) -> &D {
        &self.source
    }

    /// Completed cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Tear down the loop, keeping the controller.
    pub fn into_controller(self) -> BollardController<A, S> {
        self.controller
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OnError;
    use crate::hal::{MockActuator, MockDecisionSource, MockSignal, ScriptedStream};
    use crate::policy::NoRetry;

    #[test]
    fn settings_from_config() {
        let config = ControlConfig {
            recv_timeout_ms: 2500,
            on_error: OnError::Retry,
            fail_safe_on_error: true,
            close_on_shutdown: true,
            ..ControlConfig::default()
        };
        let settings = LoopSettings::from(&config);
        assert_eq!(settings.recv_timeout, Some(Duration::from_millis(2500)));
        assert!(settings.fail_safe_on_error);
        assert!(settings.close_on_shutdown);
    }

    #[test]
    fn default_settings_are_conservative() {
        let settings = LoopSettings::from(&ControlConfig::default());
        assert_eq!(settings, LoopSettings::default());
    }

    #[tokio::test]
    async fn empty_cycle_reports_stream_ends() {
        let source = MockDecisionSource::new()
            .with_override_stream(ScriptedStream::new())
            .with_access_stream(ScriptedStream::new());
        let controller = BollardController::new(MockActuator::new(), MockSignal::new());
        let mut control = ControlLoop::new(source, controller, LoopSettings::default(), NoRetry);

        let report = control.run_cycle().await.unwrap();
        assert_eq!(
            report,
            CycleReport {
                override_end: PhaseEnd::StreamEnded,
                automatic_end: PhaseEnd::StreamEnded,
            }
        );
        assert_eq!(control.cycles(), 1);
    }
}
