use serde::de::DeserializeOwned;
use serde::Serialize;
#[cfg(unix)]
use tracing::{debug, info};
use unipc_codec::WireFormat;

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// Default System V IPC key.
pub const DEFAULT_KEY: i32 = 1234;

/// Upper bound on one queued message, matching the kernel's default
/// `MSGMAX` of 8 KiB.
pub const MAX_MESSAGE_SIZE: usize = 8192;

/// Fixed type tag used for every message on the queue.
#[cfg(unix)]
const MESSAGE_TYPE: libc::c_long = 1;

/// Configuration for a [`MessageQueueTransport`].
#[derive(Debug, Clone)]
pub struct MessageQueueConfig {
    /// Transport name, for diagnostics.
    pub name: String,
    /// System V IPC key identifying the queue. Default: 1234.
    pub key: i32,
    /// Payload format; both peers must be configured alike.
    pub format: WireFormat,
}

impl MessageQueueConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: DEFAULT_KEY,
            format: WireFormat::default(),
        }
    }

    pub fn with_key(mut self, key: i32) -> Self {
        self.key = key;
        self
    }
}

/// Buffer layout expected by `msgsnd`/`msgrcv`: a type tag followed by
/// the message bytes.
#[cfg(unix)]
#[repr(C)]
struct MsgBuf {
    mtype: libc::c_long,
    mtext: [u8; MAX_MESSAGE_SIZE],
}

/// IPC over a kernel System V message queue.
///
/// The queue already delimits messages, so payloads are enqueued
/// codec-encoded but frame-free — no length prefix, unlike the stream
/// transports. `recv` blocks until a message with the fixed type tag is
/// available.
///
/// The key is OS-global: two instances constructed with the same key on
/// the same host share one queue. `disconnect` removes the queue from the
/// kernel namespace, a destructive side effect for any other process
/// still holding the key.
///
/// On platforms without System V queues, `connect` fails cleanly with
/// [`TransportError::Unsupported`].
pub struct MessageQueueTransport {
    config: MessageQueueConfig,
    #[cfg(unix)]
    queue_id: Option<libc::c_int>,
}

impl MessageQueueTransport {
    pub fn new(config: MessageQueueConfig) -> Self {
        Self {
            config,
            #[cfg(unix)]
            queue_id: None,
        }
    }

    /// The transport configuration.
    pub fn config(&self) -> &MessageQueueConfig {
        &self.config
    }
}

impl Transport for MessageQueueTransport {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn is_connected(&self) -> bool {
        #[cfg(unix)]
        {
            self.queue_id.is_some()
        }
        #[cfg(not(unix))]
        {
            false
        }
    }

    fn connect(&mut self) -> Result<()> {
        #[cfg(unix)]
        {
            if self.queue_id.is_some() {
                return Ok(());
            }

            // SAFETY: msgget takes no pointer arguments.
            let id = unsafe {
                libc::msgget(self.config.key as libc::key_t, libc::IPC_CREAT | 0o666)
            };
            if id < 0 {
                return Err(TransportError::Acquire {
                    what: format!("message queue key {}", self.config.key),
                    source: std::io::Error::last_os_error(),
                });
            }

            info!(name = %self.config.name, key = self.config.key, id, "message queue connected");
            self.queue_id = Some(id);
            Ok(())
        }
        #[cfg(not(unix))]
        {
            Err(TransportError::Unsupported("System V message queues"))
        }
    }

    fn disconnect(&mut self) -> Result<()> {
        #[cfg(unix)]
        {
            if let Some(id) = self.queue_id.take() {
                // SAFETY: IPC_RMID ignores the buffer argument.
                let rc = unsafe { libc::msgctl(id, libc::IPC_RMID, std::ptr::null_mut()) };
                if rc < 0 {
                    let err = std::io::Error::last_os_error();
                    match err.raw_os_error() {
                        // Another holder of the key removed it first.
                        Some(libc::EINVAL) | Some(libc::EIDRM) => {
                            debug!(name = %self.config.name, "queue already removed")
                        }
                        _ => return Err(TransportError::Io(err)),
                    }
                }
                debug!(name = %self.config.name, "message queue disconnected");
            }
        }
        Ok(())
    }

    fn send<T: Serialize>(&mut self, message: &T) -> Result<()> {
        #[cfg(unix)]
        {
            let id = self.queue_id.ok_or(TransportError::NotConnected)?;
            let payload = unipc_codec::encode(message, self.config.format)?;
            if payload.len() > MAX_MESSAGE_SIZE {
                return Err(TransportError::Oversize {
                    size: payload.len(),
                    capacity: MAX_MESSAGE_SIZE,
                });
            }

            let mut msg = MsgBuf {
                mtype: MESSAGE_TYPE,
                mtext: [0u8; MAX_MESSAGE_SIZE],
            };
            msg.mtext[..payload.len()].copy_from_slice(&payload);

            // SAFETY: `msg` is a properly laid out msgbuf and `payload.len()`
            // never exceeds the size of `mtext`.
            let rc = unsafe {
                libc::msgsnd(
                    id,
                    (&msg as *const MsgBuf).cast::<libc::c_void>(),
                    payload.len(),
                    0,
                )
            };
            if rc < 0 {
                return Err(TransportError::Io(std::io::Error::last_os_error()));
            }
            Ok(())
        }
        #[cfg(not(unix))]
        {
            let _ = message;
            Err(TransportError::NotConnected)
        }
    }

    fn recv<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        #[cfg(unix)]
        {
            let id = self.queue_id.ok_or(TransportError::NotConnected)?;

            let mut msg = MsgBuf {
                mtype: 0,
                mtext: [0u8; MAX_MESSAGE_SIZE],
            };
            // SAFETY: `msg.mtext` really is MAX_MESSAGE_SIZE bytes, so the
            // kernel cannot write past it. Blocks until a type-1 message
            // is available.
            let received = unsafe {
                libc::msgrcv(
                    id,
                    (&mut msg as *mut MsgBuf).cast::<libc::c_void>(),
                    MAX_MESSAGE_SIZE,
                    MESSAGE_TYPE,
                    0,
                )
            };
            if received < 0 {
                let err = std::io::Error::last_os_error();
                return match err.raw_os_error() {
                    // The queue was removed out from under us; report the
                    // peer's action as absent, not as an error.
                    Some(libc::EIDRM) | Some(libc::EINVAL) => Ok(None),
                    _ => Err(TransportError::Io(err)),
                };
            }

            let payload = &msg.mtext[..received as usize];
            Ok(Some(unipc_codec::decode(payload, self.config.format)?))
        }
        #[cfg(not(unix))]
        {
            Err(TransportError::NotConnected)
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use serde_json::json;

    use super::*;

    fn unique_key(offset: i32) -> i32 {
        ((std::process::id() as i32) & 0x0FFF) | 0x4000 | (offset << 16)
    }

    #[test]
    fn queue_roundtrip_preserves_order() {
        let config = MessageQueueConfig::new("mq-rt").with_key(unique_key(1));
        let mut mq = MessageQueueTransport::new(config);
        mq.connect().expect("connect should succeed");
        assert!(mq.is_connected());

        mq.send(&json!({ "seq": 1 })).expect("first send");
        mq.send(&json!({ "seq": 2 })).expect("second send");

        let first: serde_json::Value = mq.recv().expect("recv").expect("present");
        let second: serde_json::Value = mq.recv().expect("recv").expect("present");
        assert_eq!(first, json!({ "seq": 1 }));
        assert_eq!(second, json!({ "seq": 2 }));

        mq.disconnect().expect("disconnect should succeed");
    }

    #[test]
    fn two_instances_share_the_queue() {
        let key = unique_key(2);
        let mut producer = MessageQueueTransport::new(
            MessageQueueConfig::new("producer").with_key(key),
        );
        let mut consumer = MessageQueueTransport::new(
            MessageQueueConfig::new("consumer").with_key(key),
        );

        producer.connect().expect("producer connect");
        consumer.connect().expect("consumer connect");

        producer.send(&json!({ "job": "seek" })).expect("send");
        let got: serde_json::Value = consumer.recv().expect("recv").expect("present");
        assert_eq!(got, json!({ "job": "seek" }));

        producer.disconnect().expect("producer disconnect");
        // The queue is already gone; the second removal is tolerated.
        consumer.disconnect().expect("consumer disconnect");
    }

    #[test]
    fn oversize_message_rejected() {
        let config = MessageQueueConfig::new("mq-big").with_key(unique_key(3));
        let mut mq = MessageQueueTransport::new(config);
        mq.connect().expect("connect should succeed");

        let huge = json!({ "blob": "x".repeat(MAX_MESSAGE_SIZE) });
        let err = mq.send(&huge).unwrap_err();
        assert!(matches!(err, TransportError::Oversize { .. }));

        mq.disconnect().expect("disconnect should succeed");
    }

    #[test]
    fn disconnected_send_and_recv_fail() {
        let mut mq =
            MessageQueueTransport::new(MessageQueueConfig::new("mq-noop").with_key(unique_key(4)));
        let err = mq.send(&json!({})).unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));
        let err = mq.recv::<serde_json::Value>().unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));
    }

    #[test]
    fn disconnect_is_idempotent() {
        let mut mq =
            MessageQueueTransport::new(MessageQueueConfig::new("mq-idem").with_key(unique_key(5)));
        mq.connect().expect("connect should succeed");
        mq.disconnect().expect("first disconnect");
        mq.disconnect().expect("second disconnect");
        assert!(!mq.is_connected());
    }

    #[test]
    fn default_key() {
        assert_eq!(MessageQueueConfig::new("d").key, DEFAULT_KEY);
    }
}
