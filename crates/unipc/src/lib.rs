//! Uniform structured messaging over heterogeneous IPC primitives.
//!
//! unipc gives five transports one capability contract, so application
//! code can send and receive structured messages without caring how the
//! bytes physically move:
//!
//! ```no_run
//! use unipc::{Role, SocketConfig, SocketTransport, Transport};
//!
//! # fn main() -> unipc::Result<()> {
//! let mut client = SocketTransport::new(
//!     SocketConfig::new("scheduler", Role::Client).with_addr("localhost", 5000),
//! );
//! client.connect()?;
//! client.send(&serde_json::json!({ "type": "ping" }))?;
//! if let Some(reply) = client.recv::<serde_json::Value>()? {
//!     println!("reply: {reply}");
//! }
//! client.disconnect()?;
//! # Ok(())
//! # }
//! ```
//!
//! The layers underneath are available directly:
//!
//! - [`unipc_codec`] — MessagePack/JSON payload serialization.
//! - [`unipc_frame`] — 4-byte big-endian length-prefix framing for the
//!   stream transports.
//! - [`unipc_transport`] — the [`Transport`] contract and the five
//!   implementations.

pub use unipc_codec::{self as codec, CodecError, WireFormat};
pub use unipc_frame::{self as frame, FrameConfig, FrameError, FrameReader, FrameWriter};
#[cfg(feature = "messaging")]
pub use unipc_transport::{MessagingConfig, MessagingTransport};
pub use unipc_transport::{
    MessageQueueConfig, MessageQueueTransport, Result, Role, SocketConfig, SocketTransport,
    Transport, TransportError,
};
#[cfg(unix)]
pub use unipc_transport::{
    PipeConfig, PipeTransport, SharedMemoryConfig, SharedMemoryTransport,
};
