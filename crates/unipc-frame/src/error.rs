/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The stream ended partway through the 4-byte length prefix.
    ///
    /// A clean close lands exactly on a frame boundary; anything between
    /// one and three buffered header bytes means the peer violated the
    /// protocol.
    #[error("stream ended inside a length prefix ({got} of 4 bytes)")]
    TruncatedHeader { got: usize },

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The sink stopped accepting bytes mid-frame.
    #[error("connection closed (incomplete frame write)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
