use crate::WireFormat;

/// Errors that can occur during payload encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The value could not be serialized in the requested format.
    #[error("{format} encode error: {reason}")]
    Encode {
        format: WireFormat,
        reason: String,
    },

    /// The payload bytes are not valid for the requested format.
    ///
    /// `len` is the size of the offending input, so diagnostics carry the
    /// byte span that failed to parse.
    #[error("{format} decode error in {len}-byte payload: {reason}")]
    Decode {
        format: WireFormat,
        len: usize,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, CodecError>;
