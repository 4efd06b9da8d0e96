//! Remote decision source: the two server-push streams.
//!
//! A [`DecisionSource`] opens one stream per phase. Each stream yields
//! events through [`EventStream::next_event`], which has three outcomes:
//!
//! - `Ok(Some(event))` - a decision arrived
//! - `Ok(None)` - the remote side ended the stream (normal phase completion)
//! - `Err(e)` - transport failure
//!
//! This mirrors the shape of a gRPC server-streaming response, so the
//! tonic client in `hal::grpc` maps onto it directly.

use core::future::Future;

use crate::events::{AccessEvent, OverrideEvent};

/// A stream of decisions of type `T`.
pub trait EventStream<T> {
    /// Transport error surfaced while receiving.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Wait for the next event.
    ///
    /// This is the only suspension point of the control loop.
    fn next_event(&mut self) -> impl Future<Output = Result<Option<T>, Self::Error>>;
}

/// The remote authority, seen as two stream factories.
pub trait DecisionSource {
    /// Error for opening or reading either stream.
    type Error: std::error::Error + Send + Sync + 'static;
    /// Override stream type.
    type Overrides: EventStream<OverrideEvent, Error = Self::Error>;
    /// Access-decision stream type.
    type Access: EventStream<AccessEvent, Error = Self::Error>;

    /// Open a fresh override stream for one override phase.
    fn open_override_stream(&mut self) -> impl Future<Output = Result<Self::Overrides, Self::Error>>;

    /// Open a fresh access-decision stream for one automatic phase.
    fn open_access_stream(&mut self) -> impl Future<Output = Result<Self::Access, Self::Error>>;
}
