use unipc_codec::CodecError;
use unipc_frame::FrameError;

/// Errors that can occur in transport operations.
///
/// Every public operation reports failures through this one enum;
/// OS/library errors are converted at the transport boundary so callers
/// never see transport-internal error types.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// `send`/`recv` was called while disconnected. No I/O is performed.
    #[error("transport is not connected")]
    NotConnected,

    /// Failed to bind to the specified address.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    /// Failed to connect to the specified address.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// Failed to create or open an OS resource at connect time.
    #[error("failed to acquire {what}: {source}")]
    Acquire {
        what: String,
        source: std::io::Error,
    },

    /// The encoded payload does not fit the transport's fixed capacity.
    #[error("payload of {size} bytes exceeds capacity of {capacity} bytes")]
    Oversize { size: usize, capacity: usize },

    /// The peer or a shared region violated the wire protocol.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The required OS facility is absent on this platform.
    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),

    /// An I/O error occurred on the transport.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A framing error occurred on a stream transport.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// A payload failed to encode or decode.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// An error reported by the messaging library.
    #[cfg(feature = "messaging")]
    #[error("messaging error: {0}")]
    Messaging(#[from] zmq::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
