use std::net::{TcpStream, ToSocketAddrs};

use serde::de::DeserializeOwned;
use serde::Serialize;
use socket2::{Domain, Socket, Type};
use tracing::{debug, info};
use unipc_codec::WireFormat;
use unipc_frame::{FrameReader, FrameWriter};

use crate::error::{Result, TransportError};
use crate::traits::{Role, Transport};

/// Default TCP port.
pub const DEFAULT_PORT: u16 = 5000;

/// Configuration for a [`SocketTransport`].
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// Transport name, for diagnostics.
    pub name: String,
    /// Host to bind (server) or connect to (client). Default: "localhost".
    pub host: String,
    /// TCP port. Default: 5000.
    pub port: u16,
    /// Server binds/listens/accepts; client actively connects.
    pub role: Role,
    /// Payload format; both peers must be configured alike.
    pub format: WireFormat,
}

impl SocketConfig {
    pub fn new(name: impl Into<String>, role: Role) -> Self {
        Self {
            name: name.into(),
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            role,
            format: WireFormat::default(),
        }
    }

    pub fn with_addr(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }
}

/// IPC over a TCP stream connection.
///
/// A server-role instance binds, listens with a backlog of one, and blocks
/// in `connect` until a single client arrives; the listening socket is
/// then closed, so accepting a second client requires a new instance. A
/// client-role instance connects to `host:port` directly.
///
/// Messages are length-prefix framed and codec-encoded; `recv` accumulates
/// partial reads until the whole frame is in, and a zero-byte read at a
/// frame boundary reports the peer's disconnect as `Ok(None)`.
pub struct SocketTransport {
    config: SocketConfig,
    reader: Option<FrameReader<TcpStream>>,
    writer: Option<FrameWriter<TcpStream>>,
}

impl SocketTransport {
    pub fn new(config: SocketConfig) -> Self {
        Self {
            config,
            reader: None,
            writer: None,
        }
    }

    /// The transport configuration.
    pub fn config(&self) -> &SocketConfig {
        &self.config
    }

    fn addr_string(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    fn accept_one(&self) -> Result<TcpStream> {
        let addr_str = self.addr_string();
        let addr = (self.config.host.as_str(), self.config.port)
            .to_socket_addrs()
            .map_err(|err| TransportError::Bind {
                addr: addr_str.clone(),
                source: err,
            })?
            .next()
            .ok_or_else(|| TransportError::Bind {
                addr: addr_str.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::AddrNotAvailable,
                    "host resolved to no addresses",
                ),
            })?;

        let bind_err = |source| TransportError::Bind {
            addr: addr_str.clone(),
            source,
        };
        let listener = Socket::new(Domain::for_address(addr), Type::STREAM, None)
            .map_err(bind_err)?;
        listener.set_reuse_address(true).map_err(bind_err)?;
        listener.bind(&addr.into()).map_err(bind_err)?;
        listener.listen(1).map_err(bind_err)?;
        info!(name = %self.config.name, addr = %addr_str, "listening, waiting for one client");

        let (stream, peer) = listener.accept().map_err(TransportError::Accept)?;
        debug!(name = %self.config.name, ?peer, "accepted connection");
        // The listener drops here: one peer per instance.
        Ok(stream.into())
    }

    fn dial(&self) -> Result<TcpStream> {
        let addr_str = self.addr_string();
        let stream = TcpStream::connect((self.config.host.as_str(), self.config.port)).map_err(
            |err| TransportError::Connect {
                addr: addr_str.clone(),
                source: err,
            },
        )?;
        debug!(name = %self.config.name, addr = %addr_str, "connected");
        Ok(stream)
    }
}

impl Transport for SocketTransport {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn is_connected(&self) -> bool {
        self.reader.is_some() && self.writer.is_some()
    }

    fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }

        let stream = match self.config.role {
            Role::Server => self.accept_one()?,
            Role::Client => self.dial()?,
        };

        let read_half = stream.try_clone()?;
        self.reader = Some(FrameReader::new(read_half));
        self.writer = Some(FrameWriter::new(stream));
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        // Dropping both halves closes the underlying socket.
        if self.reader.take().is_some() | self.writer.take().is_some() {
            debug!(name = %self.config.name, "socket transport disconnected");
        }
        Ok(())
    }

    fn send<T: Serialize>(&mut self, message: &T) -> Result<()> {
        let format = self.config.format;
        let writer = self.writer.as_mut().ok_or(TransportError::NotConnected)?;
        let payload = unipc_codec::encode(message, format)?;
        writer.write_frame(&payload)?;
        Ok(())
    }

    fn recv<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        let format = self.config.format;
        let reader = self.reader.as_mut().ok_or(TransportError::NotConnected)?;
        match reader.read_frame()? {
            Some(payload) => Ok(Some(unipc_codec::decode(&payload, format)?)),
            None => Ok(None),
        }
    }
}
