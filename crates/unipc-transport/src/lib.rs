//! Uniform IPC transport abstraction.
//!
//! One capability contract — [`Transport`]: `connect`, `disconnect`,
//! `send`, `recv`, `is_connected` — implemented consistently across
//! heterogeneous OS primitives, so callers exchange structured messages
//! without depending on any transport's native API:
//!
//! - [`PipeTransport`] — two named FIFOs, one per direction.
//! - [`SharedMemoryTransport`] — a mapped region used as a single-slot
//!   mailbox.
//! - [`SocketTransport`] — a TCP stream, server or client role.
//! - [`MessageQueueTransport`] — a System V kernel message queue
//!   (platform-conditional).
//! - [`MessagingTransport`] — strict request/reply over ZeroMQ
//!   (`messaging` feature, enabled by default).
//!
//! Stream transports share the length-prefix framing from `unipc-frame`;
//! message-oriented primitives (queue, messaging) skip it. All payloads go
//! through the `unipc-codec` formats. Every transport is a single logical
//! point-to-point channel: no routing, no fan-out, no persistence.

pub mod error;
pub mod traits;

#[cfg(feature = "messaging")]
pub mod messaging;
pub mod msgqueue;
#[cfg(unix)]
pub mod pipe;
#[cfg(unix)]
pub mod shm;
pub mod socket;

pub use error::{Result, TransportError};
pub use traits::{Role, Transport};

#[cfg(feature = "messaging")]
pub use messaging::{MessagingConfig, MessagingTransport};
pub use msgqueue::{MessageQueueConfig, MessageQueueTransport};
#[cfg(unix)]
pub use pipe::{PipeConfig, PipeTransport};
#[cfg(unix)]
pub use shm::{SharedMemoryConfig, SharedMemoryTransport};
pub use socket::{SocketConfig, SocketTransport};
