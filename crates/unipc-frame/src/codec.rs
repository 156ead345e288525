use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Frame header: a 4-byte big-endian payload length.
pub const HEADER_SIZE: usize = 4;

/// Default maximum payload size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Encode a payload into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────────────┬──────────────────┐
/// │ Length (4B BE) │ Payload          │
/// │                │ (Length bytes)   │
/// └────────────────┴──────────────────┘
/// ```
///
/// The length prefix always equals the exact byte length of the payload
/// that follows it.
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > u32::MAX as usize {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: u32::MAX as usize,
        });
    }
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_u32(payload.len() as u32);
    dst.put_slice(payload);
    Ok(())
}

/// Decode one frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Bytes>> {
    if src.len() < HEADER_SIZE {
        return Ok(None); // Need more data
    }

    let mut header = [0u8; HEADER_SIZE];
    header.copy_from_slice(&src[..HEADER_SIZE]);
    let payload_len = u32::from_be_bytes(header) as usize;

    if payload_len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    let total = HEADER_SIZE + payload_len;
    if src.len() < total {
        return Ok(None); // Need more data
    }

    src.advance(HEADER_SIZE);
    let payload = src.split_to(payload_len).freeze();

    Ok(Some(payload))
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 16 MiB.
    pub max_payload_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let mut buf = BytesMut::new();
        let payload = b"hello, unipc!";

        encode_frame(payload, &mut buf).unwrap();

        assert_eq!(buf.len(), HEADER_SIZE + payload.len());
        assert_eq!(buf[..HEADER_SIZE], (payload.len() as u32).to_be_bytes());

        let decoded = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .unwrap();

        assert_eq!(decoded.as_ref(), payload);
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_incomplete_header() {
        let mut buf = BytesMut::from(&[0x00, 0x00, 0x01][..]);
        let result = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn decode_incomplete_payload() {
        let mut buf = BytesMut::new();
        encode_frame(b"hello", &mut buf).unwrap();
        buf.truncate(HEADER_SIZE + 2); // Truncate payload

        let result = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn decode_payload_too_large() {
        let mut buf = BytesMut::new();
        buf.put_u32(32 * 1024 * 1024); // 32 MiB

        let result = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD);
        assert!(matches!(result, Err(FrameError::PayloadTooLarge { .. })));
    }

    #[test]
    fn multiple_frames() {
        let mut buf = BytesMut::new();
        encode_frame(b"first", &mut buf).unwrap();
        encode_frame(b"second", &mut buf).unwrap();

        let f1 = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .unwrap();
        assert_eq!(f1.as_ref(), b"first");

        let f2 = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .unwrap();
        assert_eq!(f2.as_ref(), b"second");

        assert!(buf.is_empty());
    }

    #[test]
    fn empty_payload() {
        let mut buf = BytesMut::new();
        encode_frame(b"", &mut buf).unwrap();

        let decoded = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .unwrap();
        assert!(decoded.is_empty());
        assert!(buf.is_empty());
    }

    #[test]
    fn prefix_is_big_endian() {
        let mut buf = BytesMut::new();
        encode_frame(&[0xAA; 0x0102], &mut buf).unwrap();
        assert_eq!(buf[..HEADER_SIZE], [0x00, 0x00, 0x01, 0x02]);
    }
}
