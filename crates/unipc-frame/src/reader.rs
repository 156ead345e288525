use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};
use tracing::debug;

use crate::codec::{decode_frame, FrameConfig, HEADER_SIZE};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete frames from any `Read` stream.
///
/// Handles partial reads internally — callers always get complete frames
/// or a clean end-of-stream.
pub struct FrameReader<R> {
    inner: R,
    buf: BytesMut,
    config: FrameConfig,
}

impl<R: Read> FrameReader<R> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: R) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: R, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Ok(None)` when the peer closed the stream — either exactly
    /// on a frame boundary, or partway through a payload (the partial
    /// buffer is discarded; callers retry the whole message, never resume
    /// a partial frame). A close partway through the 4-byte length prefix
    /// is a protocol violation and yields [`FrameError::TruncatedHeader`].
    pub fn read_frame(&mut self) -> Result<Option<Bytes>> {
        loop {
            if let Some(payload) = decode_frame(&mut self.buf, self.config.max_payload_size)? {
                return Ok(Some(payload));
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return match self.buf.len() {
                    0 => Ok(None),
                    got if got < HEADER_SIZE => Err(FrameError::TruncatedHeader { got }),
                    got => {
                        debug!(buffered = got, "peer closed mid-payload, discarding");
                        self.buf.clear();
                        Ok(None)
                    }
                };
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::BufMut;

    use super::*;
    use crate::codec::encode_frame;

    #[test]
    fn read_single_frame() {
        let mut wire = BytesMut::new();
        encode_frame(b"hello", &mut wire).unwrap();

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));
        let payload = reader.read_frame().unwrap().unwrap();

        assert_eq!(payload.as_ref(), b"hello");
    }

    #[test]
    fn read_multiple_frames() {
        let mut wire = BytesMut::new();
        encode_frame(b"one", &mut wire).unwrap();
        encode_frame(b"two", &mut wire).unwrap();
        encode_frame(b"three", &mut wire).unwrap();

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));

        assert_eq!(reader.read_frame().unwrap().unwrap().as_ref(), b"one");
        assert_eq!(reader.read_frame().unwrap().unwrap().as_ref(), b"two");
        assert_eq!(reader.read_frame().unwrap().unwrap().as_ref(), b"three");
        assert!(reader.read_frame().unwrap().is_none());
    }

    #[test]
    fn read_frame_with_large_payload() {
        let payload = vec![0xAB; 64 * 1024];
        let mut wire = BytesMut::new();
        encode_frame(&payload, &mut wire).unwrap();

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));
        let decoded = reader.read_frame().unwrap().unwrap();

        assert_eq!(decoded.as_ref(), payload.as_slice());
    }

    #[test]
    fn partial_reads_reassemble() {
        let mut wire = BytesMut::new();
        encode_frame(b"slow", &mut wire).unwrap();

        let byte_reader = ByteByByteReader {
            bytes: wire.to_vec(),
            pos: 0,
        };
        let mut reader = FrameReader::new(byte_reader);

        let payload = reader.read_frame().unwrap().unwrap();
        assert_eq!(payload.as_ref(), b"slow");
    }

    #[test]
    fn empty_payload_frame() {
        let mut wire = BytesMut::new();
        encode_frame(b"", &mut wire).unwrap();

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));
        let payload = reader.read_frame().unwrap().unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn clean_close_is_end_of_stream() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        assert!(reader.read_frame().unwrap().is_none());
    }

    #[test]
    fn close_inside_length_prefix_is_fatal() {
        let mut reader = FrameReader::new(Cursor::new(vec![0x00, 0x00]));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::TruncatedHeader { got: 2 }));
    }

    #[test]
    fn close_mid_payload_is_end_of_stream() {
        let mut partial = BytesMut::new();
        partial.put_u32(16);
        partial.put_slice(b"only-part");

        let mut reader = FrameReader::new(Cursor::new(partial.to_vec()));
        assert!(reader.read_frame().unwrap().is_none());
    }

    #[test]
    fn oversized_frame_in_stream() {
        let mut wire = BytesMut::new();
        wire.put_u32(1024);

        let cfg = FrameConfig {
            max_payload_size: 16,
        };
        let mut reader = FrameReader::with_config(Cursor::new(wire.to_vec()), cfg);
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
    }

    #[test]
    fn interrupted_read_retries() {
        let mut wire = BytesMut::new();
        encode_frame(b"ok", &mut wire).unwrap();

        let inner = InterruptedThenData {
            interrupted: false,
            bytes: wire.to_vec(),
            pos: 0,
        };
        let mut reader = FrameReader::new(inner);
        let payload = reader.read_frame().unwrap().unwrap();

        assert_eq!(payload.as_ref(), b"ok");
    }

    #[test]
    fn io_error_propagates() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::from(ErrorKind::BrokenPipe))
            }
        }

        let mut reader = FrameReader::new(Broken);
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::BrokenPipe));
    }

    #[cfg(unix)]
    #[test]
    fn roundtrip_over_socket_pair() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = crate::writer::FrameWriter::new(left);
        let mut reader = FrameReader::new(right);

        writer.write_frame(b"ping").unwrap();
        let payload = reader.read_frame().unwrap().unwrap();

        assert_eq!(payload.as_ref(), b"ping");
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            let n = (self.bytes.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }
}
