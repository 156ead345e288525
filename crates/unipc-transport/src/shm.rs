use std::num::NonZeroUsize;
use std::os::fd::OwnedFd;
use std::ptr::NonNull;

use nix::fcntl::OFlag;
use nix::sys::mman::{mmap, munmap, shm_open, shm_unlink, MapFlags, ProtFlags};
use nix::sys::stat::Mode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};
use unipc_codec::WireFormat;
use unipc_frame::HEADER_SIZE;

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// Default region size: 1 MiB.
pub const DEFAULT_REGION_SIZE: usize = 1024 * 1024;

/// Configuration for a [`SharedMemoryTransport`].
#[derive(Debug, Clone)]
pub struct SharedMemoryConfig {
    /// Transport name; the backing object is named `/{name}_shm`.
    pub name: String,
    /// Mapped region size in bytes. Default: 1 MiB, fixed at connect time.
    pub region_size: usize,
    /// Payload format; both peers must be configured alike.
    pub format: WireFormat,
}

impl SharedMemoryConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            region_size: DEFAULT_REGION_SIZE,
            format: WireFormat::default(),
        }
    }

    pub fn with_region_size(mut self, region_size: usize) -> Self {
        self.region_size = region_size;
        self
    }
}

/// A mapped POSIX shared-memory object plus its handles.
struct Region {
    ptr: NonNull<std::ffi::c_void>,
    len: usize,
    /// Kept open for the lifetime of the mapping.
    _fd: OwnedFd,
    shm_name: String,
}

// SAFETY: the mapping is exclusively owned by the transport instance and
// only touched through &mut self; nothing in Region is thread-affine.
unsafe impl Send for Region {}

impl Region {
    fn slot(&self) -> &[u8] {
        // SAFETY: `ptr` came from a successful mmap of exactly `len` bytes
        // which stays mapped until `Region` is released in `disconnect`.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr().cast::<u8>(), self.len) }
    }

    fn slot_mut(&mut self) -> &mut [u8] {
        // SAFETY: as in `slot`, and `&mut self` guarantees exclusive access
        // within this process.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr().cast::<u8>(), self.len) }
    }
}

/// IPC over a fixed-size shared-memory region used as a single-slot mailbox.
///
/// Layout: bytes `[0,4)` hold a big-endian payload length, bytes
/// `[4, 4+length)` hold the codec-encoded payload. `send` overwrites the
/// slot from offset 0 — there is no queuing, so a second `send` before any
/// `recv` silently replaces the previous message (last-writer-wins), and
/// `recv` is non-destructive (re-reading yields the same message).
///
/// Known limitation: this transport carries no synchronization between
/// writer and reader. A concurrent writer and reader can race; callers
/// coordinating multiple writers must bring their own lock. The region
/// identity is OS-global, so two instances constructed with the same name
/// on the same host contend for the same object.
///
/// `disconnect` unmaps the region and unlinks the backing object — a
/// destructive, shared side effect if other processes still hold the name.
pub struct SharedMemoryTransport {
    config: SharedMemoryConfig,
    region: Option<Region>,
}

impl SharedMemoryTransport {
    pub fn new(config: SharedMemoryConfig) -> Self {
        Self {
            config,
            region: None,
        }
    }

    /// The transport configuration.
    pub fn config(&self) -> &SharedMemoryConfig {
        &self.config
    }

    fn shm_name(&self) -> String {
        format!("/{}_shm", self.config.name)
    }
}

impl Transport for SharedMemoryTransport {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn is_connected(&self) -> bool {
        self.region.is_some()
    }

    fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }

        let shm_name = self.shm_name();
        let len = NonZeroUsize::new(self.config.region_size)
            .filter(|len| len.get() > HEADER_SIZE)
            .ok_or_else(|| TransportError::Acquire {
                what: format!("shared memory object {shm_name}"),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "region size must exceed the 4-byte length header",
                ),
            })?;

        let fd = shm_open(
            shm_name.as_str(),
            OFlag::O_CREAT | OFlag::O_RDWR,
            Mode::from_bits_truncate(0o600),
        )
        .map_err(|err| TransportError::Acquire {
            what: format!("shared memory object {shm_name}"),
            source: err.into(),
        })?;

        nix::unistd::ftruncate(&fd, self.config.region_size as libc::off_t).map_err(|err| {
            TransportError::Acquire {
                what: format!("shared memory object {shm_name}"),
                source: err.into(),
            }
        })?;

        // SAFETY: `len` is non-zero and `fd` refers to a shm object sized
        // to exactly `len` bytes by the ftruncate above.
        let ptr = unsafe {
            mmap(
                None,
                len,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
                &fd,
                0,
            )
        }
        .map_err(|err| TransportError::Acquire {
            what: format!("mapping of {shm_name}"),
            source: err.into(),
        })?;

        info!(name = %self.config.name, shm = %shm_name, size = self.config.region_size,
              "shared memory transport connected");
        self.region = Some(Region {
            ptr,
            len: self.config.region_size,
            _fd: fd,
            shm_name,
        });
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        if let Some(region) = self.region.take() {
            // SAFETY: `ptr`/`len` come from the successful mmap in
            // `connect`, and the region is unmapped exactly once here.
            if let Err(err) = unsafe { munmap(region.ptr, region.len) } {
                // Keep releasing the remaining resources regardless.
                warn!(shm = %region.shm_name, %err, "munmap failed");
            }
            if let Err(err) = shm_unlink(region.shm_name.as_str()) {
                // Another instance may have unlinked the name already.
                debug!(shm = %region.shm_name, %err, "shm_unlink skipped");
            }
            debug!(name = %self.config.name, "shared memory transport disconnected");
        }
        Ok(())
    }

    fn send<T: Serialize>(&mut self, message: &T) -> Result<()> {
        let format = self.config.format;
        let region = self.region.as_mut().ok_or(TransportError::NotConnected)?;

        let payload = unipc_codec::encode(message, format)?;
        let capacity = region.len - HEADER_SIZE;
        if payload.len() > capacity {
            // Checked before any write: an oversize send leaves the slot
            // exactly as it was.
            return Err(TransportError::Oversize {
                size: payload.len(),
                capacity,
            });
        }

        let slot = region.slot_mut();
        slot[..HEADER_SIZE].copy_from_slice(&(payload.len() as u32).to_be_bytes());
        slot[HEADER_SIZE..HEADER_SIZE + payload.len()].copy_from_slice(&payload);
        Ok(())
    }

    fn recv<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        let format = self.config.format;
        let region = self.region.as_ref().ok_or(TransportError::NotConnected)?;

        let slot = region.slot();
        let mut header = [0u8; HEADER_SIZE];
        header.copy_from_slice(&slot[..HEADER_SIZE]);
        let stored = u32::from_be_bytes(header) as usize;

        if stored == 0 {
            // Fresh region (zero-filled) or nothing written yet.
            return Ok(None);
        }
        if stored > region.len - HEADER_SIZE {
            return Err(TransportError::Protocol(format!(
                "stored length {stored} exceeds region capacity {}",
                region.len - HEADER_SIZE
            )));
        }

        let payload = &slot[HEADER_SIZE..HEADER_SIZE + stored];
        Ok(Some(unipc_codec::decode(payload, format)?))
    }
}
