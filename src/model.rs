use bytes::Bytes;
use std::collections::HashMap;

/// An immutable (host, port) pair identifying a backend server.
///
/// Serialized as `"{host}:{port}"` via [`crate::routing::connection_key`] for
/// use as a connection key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HostAddress {
    pub host: String,
    pub port: u16,
}

/// Opaque handle the application presents to ack or nack a specific
/// delivered message. Internally a pair of (ack-id, connection-key) that
/// must be preserved together: acking against the wrong output host is
/// undefined behavior, so the pair is never decomposed outside this crate
/// except through [`DeliveryToken::ack_id`] / [`DeliveryToken::hostport`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DeliveryToken {
    pub(crate) ack_id: String,
    pub(crate) hostport: String,
}

impl DeliveryToken {
    pub fn ack_id(&self) -> &str {
        &self.ack_id
    }

    pub fn hostport(&self) -> &str {
        &self.hostport
    }
}

/// Which checksum (if any) the frontend wants the publisher to stamp on
/// outgoing messages. Reported by `readPublisherOptions` at reconfiguration
/// time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChecksumOption {
    None,
    Crc32Ieee,
    Md5,
}

/// The checksum a [`PublisherWorker`](crate::publisher::PublisherWorker)
/// computed for a message, or the absence of one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Checksum {
    None,
    Crc32(u32),
    Md5([u8; 16]),
}

/// An application-supplied message awaiting publish.
#[derive(Clone, Debug)]
pub struct PutMessage {
    pub id: String,
    pub data: Bytes,
    pub user_context: HashMap<String, String>,
    /// Always 0 via `publish`/`publish_async` today; carried as a field so
    /// the wire shape is complete and a future delayed-publish is additive.
    pub delay_seconds: u32,
    pub crc32: Option<u32>,
    pub md5: Option<[u8; 16]>,
}

impl PutMessage {
    pub fn new(id: String, data: Bytes, user_context: HashMap<String, String>) -> Self {
        Self {
            id,
            data,
            user_context,
            delay_seconds: 0,
            crc32: None,
            md5: None,
        }
    }

    pub fn stamp(&mut self, checksum: Checksum) {
        match checksum {
            Checksum::None => {}
            Checksum::Crc32(v) => self.crc32 = Some(v),
            Checksum::Md5(v) => self.md5 = Some(v),
        }
    }
}

/// Outcome of a publish, correlated back to the originating [`PutMessage`]
/// by `id`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PutMessageAck {
    pub id: String,
    pub status: AckStatus,
    pub receipt: Option<String>,
    pub message: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AckStatus {
    Ok,
    Failed,
    TimedOut,
}

impl PutMessageAck {
    pub fn failed(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: AckStatus::Failed,
            receipt: None,
            message: Some(message.into()),
        }
    }

    pub fn timed_out(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: AckStatus::TimedOut,
            receipt: None,
            message: Some("timeout".to_string()),
        }
    }
}

/// Payload of a message delivered to a consumer, as reported by the output
/// host.
#[derive(Clone, Debug)]
pub struct MessagePayload {
    pub data: Bytes,
    pub crc32: Option<u32>,
    pub md5: Option<[u8; 16]>,
}

/// A message delivered from an output host, prior to being paired with a
/// [`DeliveryToken`] for handoff to the application.
#[derive(Clone, Debug)]
pub struct ConsumerMessage {
    pub ack_id: String,
    pub payload: MessagePayload,
}

/// Outcome of an ack or nack request, delivered to the request's callback.
#[derive(Clone, Debug)]
pub struct AckMessageResult {
    pub call_success: bool,
    pub is_ack: bool,
    pub delivery_token: DeliveryToken,
    pub error_msg: Option<String>,
}

impl AckMessageResult {
    pub fn success(is_ack: bool, delivery_token: DeliveryToken) -> Self {
        Self {
            call_success: true,
            is_ack,
            delivery_token,
            error_msg: None,
        }
    }

    pub fn failure(is_ack: bool, delivery_token: DeliveryToken, error_msg: impl Into<String>) -> Self {
        Self {
            call_success: false,
            is_ack,
            delivery_token,
            error_msg: Some(error_msg.into()),
        }
    }
}
