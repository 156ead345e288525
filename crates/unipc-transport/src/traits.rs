use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// Which side of a connection-oriented transport this instance plays.
///
/// Fixed at construction: a server binds/listens/accepts, a client
/// actively connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Server,
    Client,
}

/// The capability contract every IPC transport implements.
///
/// A transport is a single logical point-to-point channel: construct it
/// with its identity, [`connect`](Transport::connect), exchange messages,
/// [`disconnect`](Transport::disconnect). All calls are blocking, and no
/// transport is safe for concurrent use by multiple threads without
/// external serialization of calls.
///
/// Shared semantics across all implementations:
///
/// - `send`/`recv` while disconnected return
///   [`TransportError::NotConnected`](crate::TransportError::NotConnected)
///   without performing any I/O.
/// - `recv` returning `Ok(None)` means the peer disconnected (or nothing
///   has been written yet, for the shared-memory mailbox) — absent, not
///   an error.
/// - `disconnect` is idempotent and releases every OS resource `connect`
///   acquired, on every exit path.
/// - Connection state only changes inside `connect`/`disconnect`.
pub trait Transport {
    /// The human-readable name this transport was constructed with.
    fn name(&self) -> &str;

    /// Whether the transport is currently connected.
    fn is_connected(&self) -> bool;

    /// Establish the connection, allocating OS resources.
    fn connect(&mut self) -> Result<()>;

    /// Tear down the connection and release all acquired resources.
    ///
    /// Safe to call twice; the second call is a no-op returning `Ok`.
    fn disconnect(&mut self) -> Result<()>;

    /// Serialize and deliver one message (blocking).
    fn send<T: Serialize>(&mut self, message: &T) -> Result<()>;

    /// Receive and deserialize one message (blocking).
    ///
    /// `Ok(None)` signals graceful peer disconnect or an empty mailbox.
    fn recv<T: DeserializeOwned>(&mut self) -> Result<Option<T>>;
}
