//! Pluggable payload serialization for unipc.
//!
//! Two interchangeable formats turn a structured value into bytes and back:
//!
//! - [`WireFormat::MsgPack`] — compact binary MessagePack, the default.
//!   Supports maps, sequences, strings, integers, floats, booleans, null,
//!   and raw byte blobs.
//! - [`WireFormat::Json`] — textual JSON fallback. Round-trips the same
//!   value shapes *except* raw byte blobs, which JSON can only represent
//!   as arrays of numbers. Callers that need lossless binary payloads
//!   must stay on MessagePack.
//!
//! `decode(encode(v)) == v` for every value representable by the chosen
//! format. Malformed input always yields a [`CodecError::Decode`] carrying
//! the input length and the parser's reason; no silent defaults.

pub mod error;

pub use error::{CodecError, Result};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Payload serialization format, selected per call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WireFormat {
    /// Compact binary MessagePack (default).
    #[default]
    MsgPack,
    /// Textual JSON fallback.
    Json,
}

impl std::fmt::Display for WireFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WireFormat::MsgPack => f.write_str("msgpack"),
            WireFormat::Json => f.write_str("json"),
        }
    }
}

/// Serialize a value into payload bytes in the given format.
pub fn encode<T: Serialize>(value: &T, format: WireFormat) -> Result<Vec<u8>> {
    match format {
        WireFormat::MsgPack => rmp_serde::to_vec_named(value).map_err(|e| CodecError::Encode {
            format,
            reason: e.to_string(),
        }),
        WireFormat::Json => serde_json::to_vec(value).map_err(|e| CodecError::Encode {
            format,
            reason: e.to_string(),
        }),
    }
}

/// Deserialize payload bytes in the given format back into a value.
pub fn decode<T: DeserializeOwned>(bytes: &[u8], format: WireFormat) -> Result<T> {
    match format {
        WireFormat::MsgPack => rmp_serde::from_slice(bytes).map_err(|e| CodecError::Decode {
            format,
            len: bytes.len(),
            reason: e.to_string(),
        }),
        WireFormat::Json => serde_json::from_slice(bytes).map_err(|e| CodecError::Decode {
            format,
            len: bytes.len(),
            reason: e.to_string(),
        }),
    }
}
