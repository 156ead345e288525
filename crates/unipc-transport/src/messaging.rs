use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};
use unipc_codec::WireFormat;

use crate::error::{Result, TransportError};
use crate::traits::{Role, Transport};

/// Configuration for a [`MessagingTransport`].
#[derive(Debug, Clone)]
pub struct MessagingConfig {
    /// Transport name, for diagnostics.
    pub name: String,
    /// ZeroMQ endpoint URI, e.g. `tcp://localhost:5555`.
    pub address: String,
    /// Server binds a reply endpoint; client connects a request endpoint.
    pub role: Role,
    /// Payload format; both peers must be configured alike.
    pub format: WireFormat,
}

impl MessagingConfig {
    pub fn new(name: impl Into<String>, address: impl Into<String>, role: Role) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            role,
            format: WireFormat::default(),
        }
    }
}

/// Strict request/reply IPC over ZeroMQ REQ/REP sockets.
///
/// The underlying primitive is message-oriented, so payloads travel
/// codec-encoded but without any manual length prefix. Each endpoint
/// strictly alternates: a server must `recv` a request before it may
/// `send` the reply, a client must `send` before it may `recv`. Violating
/// the alternation is rejected by the primitive itself (`EFSM`) and
/// surfaces as a protocol-violation error — messages are never silently
/// reordered.
///
/// `disconnect` closes the socket and tears down the owned context
/// exactly once, however many times it is called.
pub struct MessagingTransport {
    config: MessagingConfig,
    context: Option<zmq::Context>,
    socket: Option<zmq::Socket>,
}

impl MessagingTransport {
    pub fn new(config: MessagingConfig) -> Self {
        Self {
            config,
            context: None,
            socket: None,
        }
    }

    /// The transport configuration.
    pub fn config(&self) -> &MessagingConfig {
        &self.config
    }
}

fn map_zmq(err: zmq::Error) -> TransportError {
    if err == zmq::Error::EFSM {
        TransportError::Protocol(format!("request/reply alternation violated: {err}"))
    } else {
        TransportError::Messaging(err)
    }
}

impl Transport for MessagingTransport {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }

        let context = zmq::Context::new();
        let addr = self.config.address.clone();

        match self.config.role {
            Role::Server => {
                let socket = context.socket(zmq::REP)?;
                socket.bind(&addr).map_err(|err| TransportError::Bind {
                    addr: addr.clone(),
                    source: std::io::Error::other(err),
                })?;
                info!(name = %self.config.name, %addr, "reply endpoint bound");
                self.socket = Some(socket);
            }
            Role::Client => {
                let socket = context.socket(zmq::REQ)?;
                socket.connect(&addr).map_err(|err| TransportError::Connect {
                    addr: addr.clone(),
                    source: std::io::Error::other(err),
                })?;
                info!(name = %self.config.name, %addr, "request endpoint connected");
                self.socket = Some(socket);
            }
        }

        self.context = Some(context);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        // Socket first, then the context; Option::take guarantees the
        // context is torn down exactly once even across repeated calls.
        if self.socket.take().is_some() {
            debug!(name = %self.config.name, "messaging socket closed");
        }
        if self.context.take().is_some() {
            debug!(name = %self.config.name, "messaging context terminated");
        }
        Ok(())
    }

    fn send<T: Serialize>(&mut self, message: &T) -> Result<()> {
        let socket = self.socket.as_ref().ok_or(TransportError::NotConnected)?;
        let payload = unipc_codec::encode(message, self.config.format)?;
        socket.send(payload.as_slice(), 0).map_err(map_zmq)?;
        Ok(())
    }

    fn recv<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        let socket = self.socket.as_ref().ok_or(TransportError::NotConnected)?;
        let bytes = socket.recv_bytes(0).map_err(map_zmq)?;
        Ok(Some(unipc_codec::decode(&bytes, self.config.format)?))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn test_endpoint(offset: u16) -> String {
        format!(
            "tcp://127.0.0.1:{}",
            30000 + (std::process::id() % 10000) as u16 + offset
        )
    }

    #[test]
    fn request_reply_roundtrip() {
        let endpoint = test_endpoint(0);

        let server_endpoint = endpoint.clone();
        let server_handle = std::thread::spawn(move || {
            let mut server = MessagingTransport::new(MessagingConfig::new(
                "rep",
                server_endpoint,
                Role::Server,
            ));
            server.connect().expect("server should bind");

            let request: serde_json::Value = server
                .recv()
                .expect("server recv should succeed")
                .expect("request should be present");
            assert_eq!(request, json!({ "op": "schedule", "sectors": [7, 3] }));

            server
                .send(&json!({ "status": "accepted" }))
                .expect("server reply should succeed");
            server.disconnect().expect("server disconnect");
        });

        let mut client =
            MessagingTransport::new(MessagingConfig::new("req", endpoint, Role::Client));
        client.connect().expect("client should connect");

        client
            .send(&json!({ "op": "schedule", "sectors": [7, 3] }))
            .expect("client send should succeed");
        let reply: serde_json::Value = client
            .recv()
            .expect("client recv should succeed")
            .expect("reply should be present");
        assert_eq!(reply, json!({ "status": "accepted" }));

        client.disconnect().expect("client disconnect");
        server_handle.join().expect("server thread should complete");
    }

    #[test]
    fn server_send_before_recv_is_rejected() {
        let mut server = MessagingTransport::new(MessagingConfig::new(
            "eager-rep",
            test_endpoint(1),
            Role::Server,
        ));
        server.connect().expect("server should bind");

        let err = server.send(&json!({ "status": "premature" })).unwrap_err();
        assert!(matches!(err, TransportError::Protocol(_)));

        server.disconnect().expect("disconnect should succeed");
    }

    #[test]
    fn client_recv_before_send_is_rejected() {
        let mut client = MessagingTransport::new(MessagingConfig::new(
            "eager-req",
            test_endpoint(2),
            Role::Client,
        ));
        client.connect().expect("client should connect");

        let err = client.recv::<serde_json::Value>().unwrap_err();
        assert!(matches!(err, TransportError::Protocol(_)));

        client.disconnect().expect("disconnect should succeed");
    }

    #[test]
    fn disconnected_send_and_recv_fail() {
        let mut transport = MessagingTransport::new(MessagingConfig::new(
            "idle",
            test_endpoint(3),
            Role::Client,
        ));
        let err = transport.send(&json!({})).unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));
        let err = transport.recv::<serde_json::Value>().unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));
    }

    #[test]
    fn disconnect_is_idempotent() {
        let mut server = MessagingTransport::new(MessagingConfig::new(
            "idem",
            test_endpoint(4),
            Role::Server,
        ));
        server.connect().expect("server should bind");
        server.disconnect().expect("first disconnect");
        server.disconnect().expect("second disconnect");
        assert!(!server.is_connected());
    }
}
