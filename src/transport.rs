use crate::model::{ChecksumOption, HostAddress, PutMessage, PutMessageAck};
use std::collections::HashMap;
use std::time::Duration;

/// Headers carried on every call (at minimum `user-name`/`host-name`,
/// attached by [`crate::Client`]).
pub type Headers = HashMap<String, String>;

/// A transport or application-level RPC failure. The concrete transport
/// (a Thrift-over-multiplexed-framed-RPC channel in the system this crate
/// targets) is out of scope for this crate -- this is the only failure
/// shape it needs to understand.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("rpc to {method} timed out after {timeout:?}")]
    Timeout { method: &'static str, timeout: Duration },

    #[error("rpc to {method} failed: {source}")]
    Failed {
        method: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

// --- Frontend RPC surface -------------------------------------------------

pub struct ReadPublisherOptionsRequest {
    pub path: String,
}

pub struct HostProtocol {
    pub protocol: Protocol,
    pub host_addresses: Vec<HostAddress>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protocol {
    TChannel,
    Other,
}

pub struct ReadPublisherOptionsReply {
    pub host_protocols: Vec<HostProtocol>,
    pub checksum_option: ChecksumOption,
}

pub struct ReadConsumerGroupHostsRequest {
    pub destination_path: String,
    pub consumer_group_name: String,
}

pub struct ReadConsumerGroupHostsReply {
    pub host_addresses: Vec<HostAddress>,
}

/// Opaque pass-through payloads for the administrative frontend calls.
/// These are thin forwarders (spec.md §6) and are not otherwise interpreted
/// by this crate.
pub struct CreateDestinationRequest(pub Vec<u8>);
pub struct CreateDestinationReply(pub Vec<u8>);
pub struct ReadDestinationRequest(pub Vec<u8>);
pub struct ReadDestinationReply(pub Vec<u8>);
pub struct CreateConsumerGroupRequest(pub Vec<u8>);
pub struct CreateConsumerGroupReply(pub Vec<u8>);
pub struct ReadConsumerGroupRequest(pub Vec<u8>);
pub struct ReadConsumerGroupReply(pub Vec<u8>);
pub struct PurgeDlqForConsumerGroupRequest(pub Vec<u8>);
pub struct PurgeDlqForConsumerGroupReply(pub Vec<u8>);
pub struct MergeDlqForConsumerGroupRequest(pub Vec<u8>);
pub struct MergeDlqForConsumerGroupReply(pub Vec<u8>);

// --- Input host RPC surface -----------------------------------------------

pub struct PutMessageBatchRequest {
    pub destination_path: String,
    pub messages: Vec<PutMessage>,
}

pub struct PutMessageBatchReply {
    pub success_messages: Vec<PutMessageAck>,
    pub failed_messages: Vec<PutMessageAck>,
}

// --- Output host RPC surface ----------------------------------------------

pub struct ReceiveMessageBatchRequest {
    pub destination_path: String,
    pub consumer_group_name: String,
    pub max_number_of_messages: u32,
    pub receive_timeout: Duration,
}

pub struct ReceiveMessageBatchReply {
    pub messages: Vec<crate::model::ConsumerMessage>,
}

pub struct AckMessagesRequest {
    pub ack_ids: Vec<String>,
    pub nack_ids: Vec<String>,
}

pub struct AckMessagesReply;

/// The three remote roles the client consumes: a frontend that returns
/// metadata and routing, a set of input hosts that accept publishes, and a
/// set of output hosts that deliver messages and receive acknowledgements.
///
/// Implementations are responsible for encoding/decoding over the wire and
/// for resolving `service_suffix`/`hostport` to an actual connection; this
/// crate only needs the typed request/reply exchange described here.
#[async_trait::async_trait]
pub trait RpcTransport: Send + Sync + 'static {
    async fn read_publisher_options(
        &self,
        service_suffix: &str,
        headers: &Headers,
        timeout: Duration,
        req: ReadPublisherOptionsRequest,
    ) -> Result<ReadPublisherOptionsReply, TransportError>;

    async fn read_consumer_group_hosts(
        &self,
        service_suffix: &str,
        headers: &Headers,
        timeout: Duration,
        req: ReadConsumerGroupHostsRequest,
    ) -> Result<ReadConsumerGroupHostsReply, TransportError>;

    async fn create_destination(
        &self,
        service_suffix: &str,
        headers: &Headers,
        timeout: Duration,
        req: CreateDestinationRequest,
    ) -> Result<CreateDestinationReply, TransportError>;

    async fn read_destination(
        &self,
        service_suffix: &str,
        headers: &Headers,
        timeout: Duration,
        req: ReadDestinationRequest,
    ) -> Result<ReadDestinationReply, TransportError>;

    async fn create_consumer_group(
        &self,
        service_suffix: &str,
        headers: &Headers,
        timeout: Duration,
        req: CreateConsumerGroupRequest,
    ) -> Result<CreateConsumerGroupReply, TransportError>;

    async fn read_consumer_group(
        &self,
        service_suffix: &str,
        headers: &Headers,
        timeout: Duration,
        req: ReadConsumerGroupRequest,
    ) -> Result<ReadConsumerGroupReply, TransportError>;

    async fn purge_dlq_for_consumer_group(
        &self,
        service_suffix: &str,
        headers: &Headers,
        timeout: Duration,
        req: PurgeDlqForConsumerGroupRequest,
    ) -> Result<PurgeDlqForConsumerGroupReply, TransportError>;

    async fn merge_dlq_for_consumer_group(
        &self,
        service_suffix: &str,
        headers: &Headers,
        timeout: Duration,
        req: MergeDlqForConsumerGroupRequest,
    ) -> Result<MergeDlqForConsumerGroupReply, TransportError>;

    async fn put_message_batch(
        &self,
        hostport: &str,
        headers: &Headers,
        timeout: Duration,
        req: PutMessageBatchRequest,
    ) -> Result<PutMessageBatchReply, TransportError>;

    async fn receive_message_batch(
        &self,
        hostport: &str,
        headers: &Headers,
        timeout: Duration,
        req: ReceiveMessageBatchRequest,
    ) -> Result<ReceiveMessageBatchReply, TransportError>;

    async fn ack_messages(
        &self,
        hostport: &str,
        headers: &Headers,
        timeout: Duration,
        req: AckMessagesRequest,
    ) -> Result<AckMessagesReply, TransportError>;
}

/// Builds an [`RpcTransport`] from a service name and a hyperbahn host file,
/// for applications that don't already have a dialed transport. Injected by
/// the embedding application; dialing a live hyperbahn-advertised channel is
/// outside this crate's CORE.
pub trait TransportFactory: Send + Sync + 'static {
    fn build(
        &self,
        client_name: &str,
        hyperbahn_host: &str,
    ) -> Result<std::sync::Arc<dyn RpcTransport>, TransportError>;
}

/// Resolves a deployment string to the frontend service-name suffix used to
/// key the per-suffix service cache: `prod*`, `dev*`, and empty all map to
/// the canonical (empty) suffix; any other non-empty value is used as-is.
pub fn frontend_service_suffix(deployment_str: &str) -> String {
    let lower = deployment_str.to_lowercase();
    if deployment_str.is_empty() || lower.starts_with("prod") || lower.starts_with("dev") {
        String::new()
    } else {
        deployment_str.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frontend_suffix_canonicalizes_prod_and_dev() {
        assert_eq!(frontend_service_suffix("prod"), "");
        assert_eq!(frontend_service_suffix("prod2"), "");
        assert_eq!(frontend_service_suffix("dev"), "");
        assert_eq!(frontend_service_suffix(""), "");
        assert_eq!(frontend_service_suffix("staging"), "staging");
    }
}
