//! Length-prefixed message framing for stream-oriented IPC.
//!
//! Byte-stream primitives (pipes, TCP sockets) have no built-in message
//! boundaries, so every message is framed with a 4-byte big-endian payload
//! length. This is the one binary contract shared by all stream transports;
//! it must be bit-exact across implementations for interoperability.
//!
//! No partial reads, no buffer management in user code: [`FrameReader`]
//! hands back complete payloads, [`FrameWriter`] writes complete frames.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{decode_frame, encode_frame, FrameConfig, DEFAULT_MAX_PAYLOAD, HEADER_SIZE};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
