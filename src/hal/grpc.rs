//! gRPC client for the remote decision service.
//!
//! Talks to the `Result` service over a plaintext HTTP/2 channel. Each
//! phase issues one server-streaming call with an empty [`Req`] and reads
//! the pushed messages until the server completes the call.
//!
//! # Example
//!
//! ```ignore
//! use rs_bollard::config::ServerConfig;
//! use rs_bollard::hal::GrpcDecisionSource;
//!
//! let source = GrpcDecisionSource::connect(&ServerConfig::default()).await?;
//! ```

use tonic::codec::{ProstCodec, Streaming};
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};
use tonic::{Request, Status};
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::events::{AccessEvent, OverrideEvent};
use crate::messages::{OptVal, Req, Res, OPTION_PATH, REQUIRE_PATH};
use crate::traits::{DecisionSource, EventStream};

/// Failure to reach the decision service.
#[derive(Debug, thiserror::Error)]
#[error("cannot connect to decision service at {address}: {source}")]
pub struct ConnectError {
    /// Address that was dialed.
    pub address: String,
    /// Transport error.
    #[source]
    pub source: tonic::transport::Error,
}

/// Prefix `http://` onto a bare `host:port`.
///
/// ```
/// use rs_bollard::hal::grpc::normalize_address;
///
/// assert_eq!(normalize_address("10.0.0.5:50051"), "http://10.0.0.5:50051");
/// assert_eq!(normalize_address("https://auth.example:443"), "https://auth.example:443");
/// ```
pub fn normalize_address(address: &str) -> String {
    let address = address.trim();
    if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{address}")
    }
}

/// [`DecisionSource`] over a tonic channel.
#[derive(Debug, Clone)]
pub struct GrpcDecisionSource {
    grpc: tonic::client::Grpc<Channel>,
}

impl GrpcDecisionSource {
    /// Connect eagerly so an unreachable server is reported at startup.
    pub async fn connect(config: &ServerConfig) -> Result<Self, ConnectError> {
        let address = normalize_address(&config.address);
        let connect_error = |source| ConnectError {
            address: address.clone(),
            source,
        };

        let channel = Endpoint::from_shared(address.clone())
            .map_err(connect_error)?
            .connect_timeout(config.connect_timeout())
            .connect()
            .await
            .map_err(connect_error)?;

        info!(%address, "connected to decision service");
        Ok(Self::from_channel(channel))
    }

    /// Wrap an existing channel.
    pub fn from_channel(channel: Channel) -> Self {
        Self {
            grpc: tonic::client::Grpc::new(channel),
        }
    }

    async fn open<M>(&mut self, path: &'static str) -> Result<Streaming<M>, Status>
    where
        M: prost::Message + Default + Send + Sync + 'static,
    {
        self.grpc
            .ready()
            .await
            .map_err(|e| Status::unknown(format!("service was not ready: {e}")))?;

        let codec: ProstCodec<Req, M> = ProstCodec::default();
        let response = self
            .grpc
            .server_streaming(
                Request::new(Req { request: 0 }),
                PathAndQuery::from_static(path),
                codec,
            )
            .await?;
        debug!(path, "stream opened");
        Ok(response.into_inner())
    }
}

impl DecisionSource for GrpcDecisionSource {
    type Error = Status;
    type Overrides = OverrideStream;
    type Access = AccessStream;

    async fn open_override_stream(&mut self) -> Result<OverrideStream, Status> {
        Ok(OverrideStream {
            inner: self.open(OPTION_PATH).await?,
        })
    }

    async fn open_access_stream(&mut self) -> Result<AccessStream, Status> {
        Ok(AccessStream {
            inner: self.open(REQUIRE_PATH).await?,
        })
    }
}

/// Override stream backed by `/Result/Option`.
pub struct OverrideStream {
    inner: Streaming<OptVal>,
}

impl EventStream<OverrideEvent> for OverrideStream {
    type Error = Status;

    async fn next_event(&mut self) -> Result<Option<OverrideEvent>, Status> {
        while let Some(msg) = self.inner.message().await? {
            match msg.decision() {
                Some(event) => return Ok(Some(event)),
                None => debug!(?msg, "override message carries no decision, skipped"),
            }
        }
        Ok(None)
    }
}

/// Access-decision stream backed by `/Result/Require`.
pub struct AccessStream {
    inner: Streaming<Res>,
}

impl EventStream<AccessEvent> for AccessStream {
    type Error = Status;

    async fn next_event(&mut self) -> Result<Option<AccessEvent>, Status> {
        Ok(self.inner.message().await?.map(|msg| msg.decision()))
    }
}
