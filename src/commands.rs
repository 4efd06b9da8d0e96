//! Bollard position, signal bytes, and the physical commands that carry them.
//!
//! Every physical action the controller takes is a [`PhysicalCommand`]: one
//! actuator target paired with one radio signal byte. The pair is derived
//! from a single [`BollardState`], so the two output channels cannot be
//! constructed out of agreement.
//!
//! # Command Flow
//!
//! 1. An event arrives from the override or access stream
//! 2. The controller decides on a target [`BollardState`]
//! 3. If the target differs from the current state, a [`PhysicalCommand`]
//!    is built with [`PhysicalCommand::for_state`] and sent to both ports
//! 4. The result is reported as a [`CommandOutcome`]
//!
//! ```rust
//! use rs_bollard::{BollardState, PhysicalCommand, SignalByte};
//!
//! let cmd = PhysicalCommand::for_state(BollardState::Open);
//! assert_eq!(cmd.actuator_target(), BollardState::Open);
//! assert_eq!(cmd.signal(), SignalByte::Open);
//! assert_eq!(cmd.signal().as_byte(), b'o');
//! ```

use core::fmt;

// ============================================================================
// Bollard State
// ============================================================================

/// Logical position of the bollard.
///
/// `Open` lets vehicles pass (post retracted), `Closed` blocks passage.
///
/// # Default
///
/// Defaults to [`Closed`](Self::Closed), the state every controller starts in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum BollardState {
    /// Post retracted, passage allowed.
    Open,
    /// Post raised, passage blocked.
    #[default]
    Closed,
}

impl BollardState {
    /// Returns the state as a lowercase string.
    ///
    /// ```
    /// use rs_bollard::BollardState;
    ///
    /// assert_eq!(BollardState::Open.as_str(), "open");
    /// assert_eq!(BollardState::Closed.as_str(), "closed");
    /// ```
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            BollardState::Open => "open",
            BollardState::Closed => "closed",
        }
    }

    /// Maps a "desired open" flag to a state.
    #[inline]
    pub const fn from_open(open: bool) -> Self {
        if open {
            BollardState::Open
        } else {
            BollardState::Closed
        }
    }

    /// Returns true for [`Open`](Self::Open).
    #[inline]
    pub const fn is_open(&self) -> bool {
        matches!(self, BollardState::Open)
    }
}

impl fmt::Display for BollardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Signal Byte
// ============================================================================

/// Control byte sent over the radio link to the companion device.
///
/// The alphabet is exactly two values: `b'o'` and `b'c'`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SignalByte {
    /// `b'o'`
    Open,
    /// `b'c'`
    Close,
}

impl SignalByte {
    /// Raw byte written to the radio.
    #[inline]
    pub const fn as_byte(&self) -> u8 {
        match self {
            SignalByte::Open => b'o',
            SignalByte::Close => b'c',
        }
    }

    /// Parse a raw byte. Anything outside the alphabet is `None`.
    ///
    /// ```
    /// use rs_bollard::SignalByte;
    ///
    /// assert_eq!(SignalByte::from_byte(b'o'), Some(SignalByte::Open));
    /// assert_eq!(SignalByte::from_byte(b'c'), Some(SignalByte::Close));
    /// assert_eq!(SignalByte::from_byte(b'x'), None);
    /// ```
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'o' => Some(SignalByte::Open),
            b'c' => Some(SignalByte::Close),
            _ => None,
        }
    }

    /// The bollard state this byte announces.
    #[inline]
    pub const fn state(&self) -> BollardState {
        match self {
            SignalByte::Open => BollardState::Open,
            SignalByte::Close => BollardState::Closed,
        }
    }
}

impl From<BollardState> for SignalByte {
    fn from(state: BollardState) -> Self {
        match state {
            BollardState::Open => SignalByte::Open,
            BollardState::Closed => SignalByte::Close,
        }
    }
}

// ============================================================================
// Physical Command
// ============================================================================

/// The atomic output unit: one actuator target plus one signal byte.
///
/// Fields are private and the only constructor takes a single
/// [`BollardState`], so the actuator target and the signal byte always
/// encode the same logical state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PhysicalCommand {
    target: BollardState,
}

impl PhysicalCommand {
    /// Build the command that drives both channels to `state`.
    #[inline]
    pub const fn for_state(state: BollardState) -> Self {
        Self { target: state }
    }

    /// Position the actuator is asked to reach.
    #[inline]
    pub const fn actuator_target(&self) -> BollardState {
        self.target
    }

    /// Byte the radio transmits.
    #[inline]
    pub const fn signal(&self) -> SignalByte {
        match self.target {
            BollardState::Open => SignalByte::Open,
            BollardState::Closed => SignalByte::Close,
        }
    }

    /// True when actuator target and signal byte describe the same state.
    ///
    /// Always true for values built through [`for_state`](Self::for_state);
    /// exposed so tests can assert it on every emitted command.
    #[inline]
    pub const fn is_consistent(&self) -> bool {
        matches!(
            (self.actuator_target(), self.signal()),
            (BollardState::Open, SignalByte::Open) | (BollardState::Closed, SignalByte::Close)
        )
    }
}

impl fmt::Display for PhysicalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{}, '{}'}}",
            self.actuator_target(),
            self.signal().as_byte() as char
        )
    }
}

// ============================================================================
// Command Source
// ============================================================================

/// Why a command was emitted.
///
/// Used for logging and for tests that need to tell a regular transition
/// from a forced close.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandSource {
    /// `SetManual` from the override stream.
    Override,
    /// Forced close while handing off from override to automatic.
    Handoff,
    /// `Allow`/`Deny` from the access stream.
    Automatic,
    /// Forced close after a receive timeout or stream error.
    FailSafe,
    /// Close issued while the process shuts down.
    Shutdown,
}

impl CommandSource {
    /// Short lowercase label for log fields.
    pub const fn as_str(&self) -> &'static str {
        match self {
            CommandSource::Override => "override",
            CommandSource::Handoff => "handoff",
            CommandSource::Automatic => "automatic",
            CommandSource::FailSafe => "fail_safe",
            CommandSource::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for CommandSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Command Outcome
// ============================================================================

/// Result of asking the controller to reach a state.
///
/// # Example
///
/// ```rust
/// use rs_bollard::{BollardState, CommandOutcome, PhysicalCommand};
///
/// let outcome = CommandOutcome::Applied(PhysicalCommand::for_state(BollardState::Open));
/// assert!(outcome.emitted());
/// assert!(!CommandOutcome::NoChange.emitted());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Target already matched the current state; nothing was sent.
    NoChange,
    /// Command sent and both ports reported success.
    Applied(PhysicalCommand),
    /// Command sent but at least one port reported an error.
    ///
    /// The state is still updated to the command's target.
    Faulted {
        /// The command that was sent.
        command: PhysicalCommand,
        /// Whether the radio accepted the signal byte.
        signal_ok: bool,
        /// Whether the actuator accepted the move.
        actuator_ok: bool,
    },
}

impl CommandOutcome {
    /// The emitted command, if any.
    pub fn command(&self) -> Option<PhysicalCommand> {
        match self {
            CommandOutcome::NoChange => None,
            CommandOutcome::Applied(cmd) => Some(*cmd),
            CommandOutcome::Faulted { command, .. } => Some(*command),
        }
    }

    /// True if a command went out to the ports.
    pub fn emitted(&self) -> bool {
        self.command().is_some()
    }

    /// True if a port reported an error.
    pub fn is_faulted(&self) -> bool {
        matches!(self, CommandOutcome::Faulted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // BollardState Tests
    // =========================================================================

    #[test]
    fn state_default_is_closed() {
        assert_eq!(BollardState::default(), BollardState::Closed);
    }

    #[test]
    fn state_from_open_flag() {
        assert_eq!(BollardState::from_open(true), BollardState::Open);
        assert_eq!(BollardState::from_open(false), BollardState::Closed);
    }

    #[test]
    fn state_display() {
        assert_eq!(BollardState::Open.to_string(), "open");
        assert_eq!(BollardState::Closed.to_string(), "closed");
    }

    // =========================================================================
    // SignalByte Tests
    // =========================================================================

    #[test]
    fn signal_byte_alphabet() {
        assert_eq!(SignalByte::Open.as_byte(), b'o');
        assert_eq!(SignalByte::Close.as_byte(), b'c');
    }

    #[test]
    fn signal_byte_rejects_other_bytes() {
        for byte in [0u8, b'O', b'C', b'x', 0xff] {
            assert_eq!(SignalByte::from_byte(byte), None);
        }
    }

    #[test]
    fn signal_byte_state_mapping() {
        assert_eq!(SignalByte::from(BollardState::Open), SignalByte::Open);
        assert_eq!(SignalByte::from(BollardState::Closed), SignalByte::Close);
        assert_eq!(SignalByte::Open.state(), BollardState::Open);
        assert_eq!(SignalByte::Close.state(), BollardState::Closed);
    }

    // =========================================================================
    // PhysicalCommand Tests
    // =========================================================================

    #[test]
    fn command_channels_agree() {
        for state in [BollardState::Open, BollardState::Closed] {
            let cmd = PhysicalCommand::for_state(state);
            assert!(cmd.is_consistent());
            assert_eq!(cmd.actuator_target(), state);
            assert_eq!(cmd.signal().state(), state);
        }
    }

    #[test]
    fn command_display() {
        let open = PhysicalCommand::for_state(BollardState::Open);
        let closed = PhysicalCommand::for_state(BollardState::Closed);
        assert_eq!(open.to_string(), "{open, 'o'}");
        assert_eq!(closed.to_string(), "{closed, 'c'}");
    }

    // =========================================================================
    // CommandOutcome Tests
    // =========================================================================

    #[test]
    fn outcome_command_accessor() {
        let cmd = PhysicalCommand::for_state(BollardState::Closed);
        assert_eq!(CommandOutcome::NoChange.command(), None);
        assert_eq!(CommandOutcome::Applied(cmd).command(), Some(cmd));

        let faulted = CommandOutcome::Faulted {
            command: cmd,
            signal_ok: true,
            actuator_ok: false,
        };
        assert_eq!(faulted.command(), Some(cmd));
        assert!(faulted.emitted());
        assert!(faulted.is_faulted());
        assert!(!CommandOutcome::Applied(cmd).is_faulted());
    }

    #[test]
    fn source_labels() {
        assert_eq!(CommandSource::FailSafe.as_str(), "fail_safe");
        assert_eq!(CommandSource::Handoff.to_string(), "handoff");
    }
}
