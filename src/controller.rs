//! The bollard controller: sole owner of the bollard state.
//!
//! This module provides [`BollardController`], the component that turns
//! remote decisions into physical commands.
//!
//! # Overview
//!
//! The controller:
//! - Owns the single [`BollardState`] (initially [`BollardState::Closed`])
//! - Emits a [`PhysicalCommand`] only when the target differs from the state
//! - Sends every command to both ports and waits for both before returning
//! - Drains one phase at a time: override first, then automatic
//!
//! # Example
//!
//! ```rust
//! use rs_bollard::{BollardController, BollardState, OverrideEvent, AccessEvent};
//! use rs_bollard::hal::{MockActuator, MockSignal};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let mut controller = BollardController::new(MockActuator::new(), MockSignal::new());
//! assert_eq!(controller.state(), BollardState::Closed);
//!
//! // Operator opens the bollard
//! controller.handle_override(OverrideEvent::open()).await;
//! assert_eq!(controller.state(), BollardState::Open);
//!
//! // Resume automatic: forced closed before handing off
//! controller.handle_override(OverrideEvent::ResumeAutomatic).await;
//! assert_eq!(controller.state(), BollardState::Closed);
//!
//! // Repeated allows only move once
//! controller.handle_access(AccessEvent::Allow).await;
//! controller.handle_access(AccessEvent::Allow).await;
//! assert_eq!(controller.snapshot().commands_issued, 3);
//! # });
//! ```

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::commands::{BollardState, CommandOutcome, CommandSource, PhysicalCommand};
use crate::events::{AccessEvent, OverrideEvent, OverrideStep, Phase, PhaseEnd};
use crate::traits::{ActuatorPort, EventStream, SignalPort};

/// Bollard control state machine.
///
/// # Type Parameters
///
/// - `A`: the actuator ([`ActuatorPort`])
/// - `S`: the radio link ([`SignalPort`])
///
/// # Concurrency
///
/// Every method takes `&mut self` and each command is fully awaited before
/// the next event is looked at, so state transitions form one sequential
/// trace. There is no internal locking.
pub struct BollardController<A: ActuatorPort, S: SignalPort> {
    actuator: A,
    signal: S,
    state: BollardState,
    phase: Phase,
    commands_issued: u64,
    port_faults: u64,
    last_command: Option<PhysicalCommand>,
    in_flight: Option<BollardState>,
}

impl<A: ActuatorPort, S: SignalPort> BollardController<A, S> {
    /// Create a controller in the `Closed` state.
    ///
    /// No command is sent at construction; the mechanism is assumed to be
    /// closed already.
    pub fn new(actuator: A, signal: S) -> Self {
        Self::with_initial_state(actuator, signal, BollardState::Closed)
    }

    /// Create a controller that believes the bollard is in `state`.
    pub fn with_initial_state(actuator: A, signal: S, state: BollardState) -> Self {
        Self {
            actuator,
            signal,
            state,
            phase: Phase::Override,
            commands_issued: 0,
            port_faults: 0,
            last_command: None,
            in_flight: None,
        }
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Drive both channels to `target`.
    ///
    /// This is the only place a [`PhysicalCommand`] is emitted. The signal
    /// byte goes out first, then the actuator moves and settles. Port errors
    /// are logged and reported as [`CommandOutcome::Faulted`]; the state
    /// still follows the command.
    ///
    /// The target is recorded as in flight before the first port call. If
    /// the returned future is dropped part-way, the physical position is
    /// unknown and the next transition is issued even when its target
    /// equals the recorded state.
    pub async fn transition_to(
        &mut self,
        target: BollardState,
        source: CommandSource,
    ) -> CommandOutcome {
        let interrupted = self.in_flight.take();
        if target == self.state && interrupted.is_none() {
            debug!(state = %self.state, %source, "already in target state, no command");
            return CommandOutcome::NoChange;
        }
        if let Some(pending) = interrupted {
            warn!(%pending, state = %self.state, %source, "previous command was interrupted, reissuing");
        }

        let command = PhysicalCommand::for_state(target);
        self.in_flight = Some(target);

        let signal_ok = match self.signal.send(command.signal()).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, %command, "radio signal write failed");
                false
            }
        };

        let actuator_ok = match self.actuator.move_to(command.actuator_target()).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, %command, "actuator move failed");
                false
            }
        };

        let previous = self.state;
        self.state = target;
        self.in_flight = None;
        self.commands_issued += 1;
        self.last_command = Some(command);

        info!(from = %previous, to = %target, %source, phase = %self.phase, "bollard command issued");

        if signal_ok && actuator_ok {
            CommandOutcome::Applied(command)
        } else {
            self.port_faults += 1;
            CommandOutcome::Faulted {
                command,
                signal_ok,
                actuator_ok,
            }
        }
    }

    /// Close the bollard if it is open.
    pub async fn force_close(&mut self, source: CommandSource) -> CommandOutcome {
        self.transition_to(BollardState::Closed, source).await
    }

    /// Apply one override decision.
    ///
    /// `ResumeAutomatic` closes the bollard (if needed) and returns
    /// [`OverrideStep::Handoff`]; the automatic phase therefore always starts
    /// from `Closed`.
    pub async fn handle_override(&mut self, event: OverrideEvent) -> OverrideStep {
        match event {
            OverrideEvent::SetManual(open) => {
                self.transition_to(BollardState::from_open(open), CommandSource::Override)
                    .await;
                OverrideStep::Continue
            }
            OverrideEvent::ResumeAutomatic => {
                self.force_close(CommandSource::Handoff).await;
                OverrideStep::Handoff
            }
        }
    }

    /// Apply one access decision.
    pub async fn handle_access(&mut self, event: AccessEvent) -> CommandOutcome {
        self.transition_to(event.target(), CommandSource::Automatic)
            .await
    }

    // ========================================================================
    // Phases
    // ========================================================================

    /// Drain an override stream.
    ///
    /// Returns when the stream delivers `ResumeAutomatic`, ends, or stays
    /// silent longer than `recv_timeout`. A timeout force-closes the bollard.
    /// A receive error is returned untouched; the state is left as is.
    pub async fn run_override_phase<St>(
        &mut self,
        stream: &mut St,
        recv_timeout: Option<Duration>,
    ) -> Result<PhaseEnd, St::Error>
    where
        St: EventStream<OverrideEvent>,
    {
        self.enter_phase(Phase::Override);
        loop {
            match receive(stream, recv_timeout).await? {
                Received::Event(event) => {
                    debug!(?event, "override event");
                    if self.handle_override(event).await == OverrideStep::Handoff {
                        info!("override phase handed off to automatic");
                        return Ok(PhaseEnd::Handoff);
                    }
                }
                Received::Ended => {
                    info!(state = %self.state, "override stream ended");
                    return Ok(PhaseEnd::StreamEnded);
                }
                Received::TimedOut => return Ok(self.timed_out(recv_timeout).await),
            }
        }
    }

    /// Drain an access-decision stream until it ends.
    pub async fn run_automatic_phase<St>(
        &mut self,
        stream: &mut St,
        recv_timeout: Option<Duration>,
    ) -> Result<PhaseEnd, St::Error>
    where
        St: EventStream<AccessEvent>,
    {
        self.enter_phase(Phase::Automatic);
        loop {
            match receive(stream, recv_timeout).await? {
                Received::Event(event) => {
                    debug!(?event, "access event");
                    self.handle_access(event).await;
                }
                Received::Ended => {
                    info!(state = %self.state, "access stream ended");
                    return Ok(PhaseEnd::StreamEnded);
                }
                Received::TimedOut => return Ok(self.timed_out(recv_timeout).await),
            }
        }
    }

    fn enter_phase(&mut self, phase: Phase) {
        self.phase = phase;
        info!(%phase, state = %self.state, "phase started");
    }

    async fn timed_out(&mut self, recv_timeout: Option<Duration>) -> PhaseEnd {
        warn!(
            phase = %self.phase,
            timeout = ?recv_timeout,
            "no event within receive timeout, closing bollard"
        );
        self.force_close(CommandSource::FailSafe).await;
        PhaseEnd::TimedOut
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Current logical bollard state.
    pub fn state(&self) -> BollardState {
        self.state
    }

    /// Phase most recently entered.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The actuator port.
    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    /// The signal port.
    pub fn signal(&self) -> &S {
        &self.signal
    }

    /// Target of a command that was started but never completed.
    ///
    /// `Some` only after a [`transition_to`](Self::transition_to) future was
    /// dropped between its first port call and its return.
    pub fn in_flight(&self) -> Option<BollardState> {
        self.in_flight
    }

    /// Take the ports back out.
    pub fn into_parts(self) -> (A, S) {
        (self.actuator, self.signal)
    }

    /// State snapshot for logging.
    pub fn snapshot(&self) -> BollardSnapshot {
        BollardSnapshot {
            state: self.state,
            phase: self.phase,
            commands_issued: self.commands_issued,
            port_faults: self.port_faults,
            last_command: self.last_command,
            in_flight: self.in_flight,
        }
    }
}

/// Point-in-time view of the controller.
///
/// ```rust
/// use rs_bollard::{BollardController, BollardState, Phase};
/// use rs_bollard::hal::{MockActuator, MockSignal};
///
/// let controller = BollardController::new(MockActuator::new(), MockSignal::new());
/// let snap = controller.snapshot();
/// assert_eq!(snap.state, BollardState::Closed);
/// assert_eq!(snap.phase, Phase::Override);
/// assert_eq!(snap.commands_issued, 0);
/// assert!(snap.last_command.is_none());
/// assert!(snap.in_flight.is_none());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BollardSnapshot {
    /// Current logical state.
    pub state: BollardState,
    /// Phase most recently entered.
    pub phase: Phase,
    /// Commands emitted since start.
    pub commands_issued: u64,
    /// Commands where at least one port reported an error.
    pub port_faults: u64,
    /// Most recent command, if any.
    pub last_command: Option<PhysicalCommand>,
    /// Interrupted command target, if any.
    pub in_flight: Option<BollardState>,
}

enum Received<T> {
    Event(T),
    Ended,
    TimedOut,
}

async fn receive<T, St>(
    stream: &mut St,
    recv_timeout: Option<Duration>,
) -> Result<Received<T>, St::Error>
where
    St: EventStream<T>,
{
    let next = match recv_timeout {
        Some(limit) => match tokio::time::timeout(limit, stream.next_event()).await {
            Ok(next) => next?,
            Err(_) => return Ok(Received::TimedOut),
        },
        None => stream.next_event().await?,
    };
    Ok(match next {
        Some(event) => Received::Event(event),
        None => Received::Ended,
    })
}
