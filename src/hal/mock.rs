//! Mock implementations for testing without hardware or a server.
//!
//! This module provides test doubles for every port and for the remote
//! decision source, so the controller and control loop can be exercised on
//! a desktop. The binary's `--dry-run` mode also uses the mock ports.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockActuator`] | [`ActuatorPort`] | Records moves, optional failure and settle delay |
//! | [`MockSignal`] | [`SignalPort`] | Records signal bytes, optional failure |
//! | [`ScriptedStream`] | [`EventStream`] | Queued events, errors and stalls |
//! | [`MockDecisionSource`] | [`DecisionSource`] | Queued override/access sessions |
//!
//! A [`PortLog`] can be shared by both ports to check the interleaving of
//! calls across the two channels.
//!
//! # Example
//!
//! ```rust
//! use rs_bollard::{BollardController, BollardState, OverrideEvent};
//! use rs_bollard::hal::{MockActuator, MockSignal, PortCall, PortLog};
//! use rs_bollard::SignalByte;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let log = PortLog::new();
//! let mut controller = BollardController::new(
//!     MockActuator::new().with_log(log.clone()),
//!     MockSignal::new().with_log(log.clone()),
//! );
//!
//! controller.handle_override(OverrideEvent::open()).await;
//!
//! assert_eq!(
//!     log.calls(),
//!     vec![PortCall::Signal(SignalByte::Open), PortCall::Actuator(BollardState::Open)]
//! );
//! # });
//! ```
//!
//! [`ActuatorPort`]: crate::traits::ActuatorPort
//! [`SignalPort`]: crate::traits::SignalPort
//! [`EventStream`]: crate::traits::EventStream
//! [`DecisionSource`]: crate::traits::DecisionSource

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::debug;

use crate::commands::{BollardState, SignalByte};
use crate::events::{AccessEvent, OverrideEvent};
use crate::traits::{ActuatorPort, DecisionSource, EventStream, SignalPort};

/// Error returned by a mock port that was told to fail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("mock {0} failure")]
pub struct MockPortError(pub &'static str);

/// Error produced by [`ScriptedStream`] and [`MockDecisionSource`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MockSourceError {
    /// Scripted receive failure.
    #[error("mock stream failure: {0}")]
    Stream(String),
    /// Scripted failure to open a stream.
    #[error("mock open failure: {0}")]
    Open(String),
    /// Every scripted session has been handed out.
    #[error("mock source has no more scripted sessions")]
    Exhausted,
}

// ============================================================================
// Port Log
// ============================================================================

/// One call made on a mock port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortCall {
    /// `SignalPort::send`
    Signal(SignalByte),
    /// `ActuatorPort::move_to`
    Actuator(BollardState),
}

/// Shared, ordered record of calls across both mock ports.
#[derive(Clone, Debug, Default)]
pub struct PortLog {
    calls: Arc<Mutex<Vec<PortCall>>>,
}

impl PortLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all calls so far, oldest first.
    pub fn calls(&self) -> Vec<PortCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn push(&self, call: PortCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

// ============================================================================
// Port Mocks
// ============================================================================

/// Mock actuator.
///
/// Records every `move_to`. With [`with_settle`](Self::with_settle) it
/// really sleeps, which pairs well with a paused tokio clock.
#[derive(Debug, Default)]
pub struct MockActuator {
    moves: Vec<BollardState>,
    settle: Duration,
    fail: bool,
    log: Option<PortLog>,
}

impl MockActuator {
    /// Creates a mock actuator with zero settle time.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock actuator whose every move fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Sleep this long on each move.
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Also record calls into `log`.
    pub fn with_log(mut self, log: PortLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Toggle failure injection.
    pub fn set_failing(&mut self, fail: bool) {
        self.fail = fail;
    }

    /// All requested positions, oldest first (failed moves included).
    pub fn moves(&self) -> &[BollardState] {
        &self.moves
    }

    /// Last requested position.
    pub fn position(&self) -> Option<BollardState> {
        self.moves.last().copied()
    }
}

impl ActuatorPort for MockActuator {
    type Error = MockPortError;

    async fn move_to(&mut self, position: BollardState) -> Result<(), MockPortError> {
        debug!(%position, "mock actuator move");
        self.moves.push(position);
        if let Some(log) = &self.log {
            log.push(PortCall::Actuator(position));
        }
        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }
        if self.fail {
            return Err(MockPortError("actuator"));
        }
        Ok(())
    }

    fn settle_time(&self) -> Duration {
        self.settle
    }
}

/// Mock radio link.
#[derive(Debug, Default)]
pub struct MockSignal {
    sent: Vec<SignalByte>,
    fail: bool,
    log: Option<PortLog>,
}

impl MockSignal {
    /// Creates a working mock radio.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock radio whose every write fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Also record calls into `log`.
    pub fn with_log(mut self, log: PortLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Toggle failure injection.
    pub fn set_failing(&mut self, fail: bool) {
        self.fail = fail;
    }

    /// Every signal handed to `send`, oldest first.
    pub fn sent(&self) -> &[SignalByte] {
        &self.sent
    }

    /// Same as [`sent`](Self::sent) but as raw bytes.
    pub fn sent_bytes(&self) -> Vec<u8> {
        self.sent.iter().map(SignalByte::as_byte).collect()
    }
}

impl SignalPort for MockSignal {
    type Error = MockPortError;

    async fn send(&mut self, signal: SignalByte) -> Result<(), MockPortError> {
        debug!(byte = %(signal.as_byte() as char), "mock radio send");
        self.sent.push(signal);
        if let Some(log) = &self.log {
            log.push(PortCall::Signal(signal));
        }
        if self.fail {
            return Err(MockPortError("radio"));
        }
        Ok(())
    }
}

// ============================================================================
// Scripted Streams
// ============================================================================

#[derive(Debug, Clone)]
enum ScriptItem<T> {
    Event(T),
    Fail(String),
    Stall,
}

/// Event stream that replays a script.
///
/// Once the script runs out the stream reports a clean end (`Ok(None)`).
/// A stall never resolves; use it with a receive timeout.
///
/// ```rust
/// use rs_bollard::hal::ScriptedStream;
/// use rs_bollard::traits::EventStream;
/// use rs_bollard::AccessEvent;
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let mut stream = ScriptedStream::from_events([AccessEvent::Allow]).then_fail("reset");
/// assert_eq!(stream.next_event().await.unwrap(), Some(AccessEvent::Allow));
/// assert!(stream.next_event().await.is_err());
/// assert_eq!(stream.next_event().await.unwrap(), None);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct ScriptedStream<T> {
    items: VecDeque<ScriptItem<T>>,
}

impl<T> Default for ScriptedStream<T> {
    fn default() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }
}

impl<T> ScriptedStream<T> {
    /// An empty stream (ends immediately).
    pub fn new() -> Self {
        Self::default()
    }

    /// A stream yielding `events` in order, then ending.
    pub fn from_events(events: impl IntoIterator<Item = T>) -> Self {
        Self {
            items: events.into_iter().map(ScriptItem::Event).collect(),
        }
    }

    /// Append one event.
    pub fn then_event(mut self, event: T) -> Self {
        self.items.push_back(ScriptItem::Event(event));
        self
    }

    /// Append a receive error.
    pub fn then_fail(mut self, reason: &str) -> Self {
        self.items.push_back(ScriptItem::Fail(reason.to_string()));
        self
    }

    /// Append a stall.
    pub fn then_stall(mut self) -> Self {
        self.items.push_back(ScriptItem::Stall);
        self
    }

    /// Items not yet consumed.
    pub fn remaining(&self) -> usize {
        self.items.len()
    }
}

impl<T> EventStream<T> for ScriptedStream<T> {
    type Error = MockSourceError;

    async fn next_event(&mut self) -> Result<Option<T>, MockSourceError> {
        match self.items.pop_front() {
            Some(ScriptItem::Event(event)) => Ok(Some(event)),
            Some(ScriptItem::Fail(reason)) => Err(MockSourceError::Stream(reason)),
            Some(ScriptItem::Stall) => std::future::pending().await,
            None => Ok(None),
        }
    }
}

// ============================================================================
// Mock Decision Source
// ============================================================================

#[derive(Debug)]
enum Session<T> {
    Stream(ScriptedStream<T>),
    OpenError(String),
}

/// Decision source serving pre-scripted sessions.
///
/// Each `open_*` call takes the next scripted session of that kind. When
/// none are left, opening fails with [`MockSourceError::Exhausted`], which
/// is how tests stop an otherwise endless control loop.
#[derive(Debug, Default)]
pub struct MockDecisionSource {
    overrides: VecDeque<Session<OverrideEvent>>,
    access: VecDeque<Session<AccessEvent>>,
    override_opens: usize,
    access_opens: usize,
}

impl MockDecisionSource {
    /// Creates a source with no sessions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an override session yielding `events`.
    pub fn with_override_session(self, events: impl IntoIterator<Item = OverrideEvent>) -> Self {
        self.with_override_stream(ScriptedStream::from_events(events))
    }

    /// Queue an override session with a custom script.
    pub fn with_override_stream(mut self, stream: ScriptedStream<OverrideEvent>) -> Self {
        self.overrides.push_back(Session::Stream(stream));
        self
    }

    /// Queue a failed attempt to open the override stream.
    pub fn with_override_open_error(mut self, reason: &str) -> Self {
        self.overrides
            .push_back(Session::OpenError(reason.to_string()));
        self
    }

    /// Queue an access session yielding `events`.
    pub fn with_access_session(self, events: impl IntoIterator<Item = AccessEvent>) -> Self {
        self.with_access_stream(ScriptedStream::from_events(events))
    }

    /// Queue an access session with a custom script.
    pub fn with_access_stream(mut self, stream: ScriptedStream<AccessEvent>) -> Self {
        self.access.push_back(Session::Stream(stream));
        self
    }

    /// Queue a failed attempt to open the access stream.
    pub fn with_access_open_error(mut self, reason: &str) -> Self {
        self.access.push_back(Session::OpenError(reason.to_string()));
        self
    }

    /// How many times the override stream was opened (including failures).
    pub fn override_opens(&self) -> usize {
        self.override_opens
    }

    /// How many times the access stream was opened (including failures).
    pub fn access_opens(&self) -> usize {
        self.access_opens
    }
}

fn open_session<T>(
    sessions: &mut VecDeque<Session<T>>,
) -> Result<ScriptedStream<T>, MockSourceError> {
    match sessions.pop_front() {
        Some(Session::Stream(stream)) => Ok(stream),
        Some(Session::OpenError(reason)) => Err(MockSourceError::Open(reason)),
        None => Err(MockSourceError::Exhausted),
    }
}

impl DecisionSource for MockDecisionSource {
    type Error = MockSourceError;
    type Overrides = ScriptedStream<OverrideEvent>;
    type Access = ScriptedStream<AccessEvent>;

    async fn open_override_stream(&mut self) -> Result<Self::Overrides, MockSourceError> {
        self.override_opens += 1;
        open_session(&mut self.overrides)
    }

    async fn open_access_stream(&mut self) -> Result<Self::Access, MockSourceError> {
        self.access_opens += 1;
        open_session(&mut self.access)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Port mock tests
    // ========================================================================

    #[tokio::test]
    async fn actuator_records_moves() {
        let mut actuator = MockActuator::new();
        actuator.move_to(BollardState::Open).await.unwrap();
        actuator.move_to(BollardState::Closed).await.unwrap();
        assert_eq!(actuator.moves(), &[BollardState::Open, BollardState::Closed]);
        assert_eq!(actuator.position(), Some(BollardState::Closed));
    }

    #[tokio::test]
    async fn actuator_failure_still_records() {
        let mut actuator = MockActuator::failing();
        assert_eq!(
            actuator.move_to(BollardState::Open).await,
            Err(MockPortError("actuator"))
        );
        assert_eq!(actuator.moves(), &[BollardState::Open]);

        actuator.set_failing(false);
        assert!(actuator.move_to(BollardState::Closed).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn actuator_settle_sleeps() {
        let mut actuator = MockActuator::new().with_settle(Duration::from_secs(1));
        assert_eq!(actuator.settle_time(), Duration::from_secs(1));

        let start = tokio::time::Instant::now();
        actuator.move_to(BollardState::Open).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test]
    async fn signal_records_bytes() {
        let mut radio = MockSignal::new();
        radio.send(SignalByte::Close).await.unwrap();
        radio.send(SignalByte::Open).await.unwrap();
        assert_eq!(radio.sent_bytes(), b"co".to_vec());
    }

    #[tokio::test]
    async fn signal_failure() {
        let mut radio = MockSignal::failing();
        let err = radio.send(SignalByte::Open).await.unwrap_err();
        assert_eq!(err.to_string(), "mock radio failure");
    }

    #[tokio::test]
    async fn shared_log_orders_calls() {
        let log = PortLog::new();
        let mut actuator = MockActuator::new().with_log(log.clone());
        let mut radio = MockSignal::new().with_log(log.clone());

        actuator.move_to(BollardState::Open).await.unwrap();
        radio.send(SignalByte::Open).await.unwrap();

        assert_eq!(
            log.calls(),
            vec![
                PortCall::Actuator(BollardState::Open),
                PortCall::Signal(SignalByte::Open)
            ]
        );
    }

    // ========================================================================
    // Stream and source tests
    // ========================================================================

    #[tokio::test]
    async fn scripted_stream_ends_after_script() {
        let mut stream = ScriptedStream::from_events([AccessEvent::Deny]);
        assert_eq!(stream.remaining(), 1);
        assert_eq!(stream.next_event().await, Ok(Some(AccessEvent::Deny)));
        assert_eq!(stream.next_event().await, Ok(None));
        assert_eq!(stream.next_event().await, Ok(None));
    }

    #[tokio::test]
    async fn scripted_stream_builder_order() {
        let mut stream = ScriptedStream::new()
            .then_event(OverrideEvent::open())
            .then_fail("boom")
            .then_event(OverrideEvent::ResumeAutomatic);

        assert_eq!(stream.next_event().await, Ok(Some(OverrideEvent::open())));
        assert_eq!(
            stream.next_event().await,
            Err(MockSourceError::Stream("boom".into()))
        );
        assert_eq!(
            stream.next_event().await,
            Ok(Some(OverrideEvent::ResumeAutomatic))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn scripted_stall_never_resolves() {
        let mut stream: ScriptedStream<AccessEvent> = ScriptedStream::new().then_stall();
        let result = tokio::time::timeout(Duration::from_secs(5), stream.next_event()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn source_hands_out_sessions_in_order() {
        let mut source = MockDecisionSource::new()
            .with_override_open_error("refused")
            .with_override_session([OverrideEvent::close()])
            .with_access_session([AccessEvent::Allow]);

        assert_eq!(
            source.open_override_stream().await.unwrap_err(),
            MockSourceError::Open("refused".into())
        );
        let mut overrides = source.open_override_stream().await.unwrap();
        assert_eq!(overrides.next_event().await, Ok(Some(OverrideEvent::close())));

        assert!(source.open_access_stream().await.is_ok());
        assert_eq!(
            source.open_access_stream().await.unwrap_err(),
            MockSourceError::Exhausted
        );

        assert_eq!(source.override_opens(), 2);
        assert_eq!(source.access_opens(), 2);
    }
}
