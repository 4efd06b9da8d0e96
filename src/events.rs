//! Decisions delivered by the remote authority, and the phases that consume them.
//!
//! The remote side pushes two kinds of decision on two separate streams:
//!
//! | Stream | Event | Meaning |
//! |--------|-------|---------|
//! | override | [`OverrideEvent::SetManual`] | Operator wants the bollard open/closed |
//! | override | [`OverrideEvent::ResumeAutomatic`] | Hand control back to access decisions |
//! | access | [`AccessEvent::Allow`] | Let the vehicle through |
//! | access | [`AccessEvent::Deny`] | Block passage |
//!
//! Only one stream is read at a time; which one is described by [`Phase`].

use core::fmt;

use crate::commands::BollardState;

/// Decision from the manual-override stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverrideEvent {
    /// Operator request; `true` asks for open, `false` for closed.
    SetManual(bool),
    /// Leave the override phase. The bollard is closed first if open.
    ResumeAutomatic,
}

impl OverrideEvent {
    /// Shorthand for `SetManual(true)`.
    pub const fn open() -> Self {
        OverrideEvent::SetManual(true)
    }

    /// Shorthand for `SetManual(false)`.
    pub const fn close() -> Self {
        OverrideEvent::SetManual(false)
    }

    /// Target state for a manual request, `None` for `ResumeAutomatic`.
    pub const fn target(&self) -> Option<BollardState> {
        match self {
            OverrideEvent::SetManual(open) => Some(BollardState::from_open(*open)),
            OverrideEvent::ResumeAutomatic => None,
        }
    }
}

/// Decision from the access-decision stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessEvent {
    /// Open the bollard.
    Allow,
    /// Close the bollard.
    Deny,
}

impl AccessEvent {
    /// Maps an allow flag to an event.
    pub const fn from_allowed(allowed: bool) -> Self {
        if allowed {
            AccessEvent::Allow
        } else {
            AccessEvent::Deny
        }
    }

    /// State this decision asks for.
    pub const fn target(&self) -> BollardState {
        match self {
            AccessEvent::Allow => BollardState::Open,
            AccessEvent::Deny => BollardState::Closed,
        }
    }
}

/// Which stream is currently driving the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    /// Draining the override stream.
    #[default]
    Override,
    /// Draining the access-decision stream.
    Automatic,
}

impl Phase {
    /// Lowercase label.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Phase::Override => "override",
            Phase::Automatic => "automatic",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the override phase should do after an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverrideStep {
    /// Keep reading the override stream.
    Continue,
    /// `ResumeAutomatic` was handled; the bollard is closed and the phase ends.
    Handoff,
}

/// How a phase finished without error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhaseEnd {
    /// Override phase saw `ResumeAutomatic`.
    Handoff,
    /// The remote side closed the stream.
    StreamEnded,
    /// No event arrived within the receive timeout; the bollard was force-closed.
    TimedOut,
}
