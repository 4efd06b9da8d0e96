//! Protobuf wire messages of the `Result` gRPC service.
//!
//! The service exposes two server-streaming calls, both taking a [`Req`]:
//!
//! | Path | Response stream | Decoded as |
//! |------|-----------------|------------|
//! | `/Result/Option` | [`OptVal`] | [`OverrideEvent`] |
//! | `/Result/Require` | [`Res`] | [`AccessEvent`] |
//!
//! The messages are declared by hand with `prost` derives instead of being
//! generated from a `.proto` file; the schema is small and frozen.
//!
//! # Decoding
//!
//! ```
//! use rs_bollard::messages::{OptVal, Res};
//! use rs_bollard::{AccessEvent, OverrideEvent};
//!
//! let manual_open = OptVal { manual_flag: true, manual: true, ..Default::default() };
//! assert_eq!(manual_open.decision(), Some(OverrideEvent::SetManual(true)));
//!
//! let resume = OptVal { letsgo_flag: true, letsgo: true, ..Default::default() };
//! assert_eq!(resume.decision(), Some(OverrideEvent::ResumeAutomatic));
//!
//! assert_eq!(Res { response: true }.decision(), AccessEvent::Allow);
//! ```

use crate::events::{AccessEvent, OverrideEvent};

/// gRPC path of the override stream.
pub const OPTION_PATH: &str = "/Result/Option";

/// gRPC path of the access-decision stream.
pub const REQUIRE_PATH: &str = "/Result/Require";

/// Stream request. The edge client always sends `request = 0`.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Req {
    /// Unused request selector.
    #[prost(int32, tag = "1")]
    pub request: i32,
}

/// Override stream item.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct OptVal {
    /// `manual` carries a decision.
    #[prost(bool, tag = "1")]
    pub manual_flag: bool,
    /// Desired open state when `manual_flag` is set.
    #[prost(bool, tag = "2")]
    pub manual: bool,
    /// `letsgo` carries a decision.
    #[prost(bool, tag = "3")]
    pub letsgo_flag: bool,
    /// Resume automatic operation when set together with `letsgo_flag`.
    #[prost(bool, tag = "4")]
    pub letsgo: bool,
}

impl OptVal {
    /// Override decision carried by this message, if any.
    ///
    /// `manual_flag` wins over `letsgo_flag`. A `letsgo_flag` with
    /// `letsgo = false`, or a message with no flag, carries nothing.
    pub fn decision(&self) -> Option<OverrideEvent> {
        if self.manual_flag {
            Some(OverrideEvent::SetManual(self.manual))
        } else if self.letsgo_flag && self.letsgo {
            Some(OverrideEvent::ResumeAutomatic)
        } else {
            None
        }
    }
}

/// Access stream item.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Res {
    /// `true` allows passage.
    #[prost(bool, tag = "1")]
    pub response: bool,
}

impl Res {
    /// Access decision carried by this message.
    pub fn decision(&self) -> AccessEvent {
        AccessEvent::from_allowed(self.response)
    }
}
