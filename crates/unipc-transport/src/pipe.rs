use std::fs::{File, OpenOptions};
use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use nix::sys::stat::Mode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};
use unipc_codec::WireFormat;
use unipc_frame::{FrameReader, FrameWriter};

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// Default permission mode for created FIFO nodes.
const FIFO_MODE: u32 = 0o644;

/// Configuration for a [`PipeTransport`].
#[derive(Debug, Clone)]
pub struct PipeConfig {
    /// Transport name, for diagnostics.
    pub name: String,
    /// FIFO this instance reads from.
    pub read_path: PathBuf,
    /// FIFO this instance writes to.
    pub write_path: PathBuf,
    /// Payload format; both peers must be configured alike.
    pub format: WireFormat,
}

impl PipeConfig {
    pub fn new(
        name: impl Into<String>,
        read_path: impl Into<PathBuf>,
        write_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            read_path: read_path.into(),
            write_path: write_path.into(),
            format: WireFormat::default(),
        }
    }
}

/// IPC over two independent named FIFOs, one per direction.
///
/// Each instance opens `read_path` read-only and `write_path` write-only,
/// creating the FIFO nodes if absent. The two directions are independent
/// half-duplex streams, so two cooperating instances must use crossed
/// read/write paths to talk to each other.
///
/// Messages are length-prefix framed and codec-encoded. A broken peer or
/// missing permissions surface on the next `send`/`recv`, not at
/// `connect`. The FIFO nodes themselves are shared identity and are left
/// on the filesystem after `disconnect`.
pub struct PipeTransport {
    config: PipeConfig,
    reader: Option<FrameReader<File>>,
    writer: Option<FrameWriter<File>>,
}

impl PipeTransport {
    pub fn new(config: PipeConfig) -> Self {
        Self {
            config,
            reader: None,
            writer: None,
        }
    }

    /// The transport configuration.
    pub fn config(&self) -> &PipeConfig {
        &self.config
    }
}

/// Create the FIFO node at `path` if absent; reject non-FIFO files.
fn ensure_fifo(path: &Path) -> Result<()> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) => {
            if meta.file_type().is_fifo() {
                Ok(())
            } else {
                Err(TransportError::Acquire {
                    what: format!("fifo {}", path.display()),
                    source: std::io::Error::new(
                        std::io::ErrorKind::AlreadyExists,
                        "existing path is not a fifo",
                    ),
                })
            }
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(?path, "creating fifo");
            match nix::unistd::mkfifo(path, Mode::from_bits_truncate(FIFO_MODE)) {
                Ok(()) => Ok(()),
                // Lost a creation race; the node exists now, which is all we need.
                Err(nix::errno::Errno::EEXIST) => Ok(()),
                Err(err) => Err(TransportError::Acquire {
                    what: format!("fifo {}", path.display()),
                    source: err.into(),
                }),
            }
        }
        Err(err) => Err(TransportError::Acquire {
            what: format!("fifo {}", path.display()),
            source: err,
        }),
    }
}

/// Clear `O_NONBLOCK` so subsequent reads block for data.
fn clear_nonblocking(file: &File) -> std::io::Result<()> {
    let fd = file.as_raw_fd();
    // SAFETY: `fd` is an open descriptor owned by `file` for the duration
    // of these calls.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(std::io::Error::last_os_error());
    }
    let rc = unsafe { libc::fcntl(fd, libc::F_SETFL, flags & !libc::O_NONBLOCK) };
    if rc < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

impl Transport for PipeTransport {
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

        ensure_fifo(&self.config.read_path)?;
        ensure_fifo(&self.config.write_path)?;

        // Open the read end nonblocking first: a plain O_RDONLY open would
        // block until a writer appears, which deadlocks two crossed
        // instances that each open read-then-write in the same order.
        let read_file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&self.config.read_path)
            .map_err(|err| TransportError::Acquire {
                what: format!("fifo {}", self.config.read_path.display()),
                source: err,
            })?;
        clear_nonblocking(&read_file)?;

        // Blocks until the peer has its read end open.
        let write_file = OpenOptions::new()
            .write(true)
            .open(&self.config.write_path)
            .map_err(|err| TransportError::Acquire {
                what: format!("fifo {}", self.config.write_path.display()),
                source: err,
            })?;

        self.reader = Some(FrameReader::new(read_file));
        self.writer = Some(FrameWriter::new(write_file));
        info!(
            name = %self.config.name,
            read = ?self.config.read_path,
            write = ?self.config.write_path,
            "pipe transport connected"
        );
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        // Dropping the File handles closes both descriptors. The FIFO
        // nodes stay in place for other instances sharing the identity.
        if self.reader.take().is_some() | self.writer.take().is_some() {
            debug!(name = %self.config.name, "pipe transport disconnected");
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
