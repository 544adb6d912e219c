/// Top-level errors returned by the synchronous, fallible parts of the
/// public API: constructing a [`crate::Client`], and opening a
/// [`crate::Publisher`] or [`crate::Consumer`].
///
/// Per-task failures (a single publish, ack, or nack) never surface here --
/// they're delivered through the typed result carried by the relevant
/// callback or synchronous return value instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("path must not be empty")]
    MissingPath,

    #[error("consumer group name must not be empty")]
    MissingConsumerGroup,

    #[error("a transport must be supplied, or both client_name and hyperbahn_host")]
    MissingTransport,

    #[error("frontend did not report a tchannel-compatible protocol for this path")]
    ProtocolNotSupported,

    #[error("initial reconfiguration failed: {0}")]
    OpenFailed(#[source] Box<Error>),

    #[error(transparent)]
    Transport(#[from] crate::transport::TransportError),
}

pub type Result<T> = std::result::Result<T, Error>;
