use msgbus_client::{
    AckMessagesReply, AckMessagesRequest, CreateConsumerGroupReply, CreateConsumerGroupRequest,
    CreateDestinationReply, CreateDestinationRequest, Headers, HostAddress, HostProtocol,
    MergeDlqForConsumerGroupReply, MergeDlqForConsumerGroupRequest, Protocol,
    PurgeDlqForConsumerGroupReply, PurgeDlqForConsumerGroupRequest, PutMessageBatchReply,
    PutMessageBatchRequest, ReadConsumerGroupHostsReply, ReadConsumerGroupHostsRequest,
    ReadConsumerGroupReply,
    ReadConsumerGroupRequest, ReadDestinationReply, ReadDestinationRequest,
    ReadPublisherOptionsReply, ReadPublisherOptionsRequest, ReceiveMessageBatchReply,
    ReceiveMessageBatchRequest, RpcTransport, TransportError,
};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// In-memory [`RpcTransport`] test double. Scenario tests configure the
/// canned host lists and per-call outcome queues up front, then drive a
/// `Publisher`/`Consumer` against it and inspect what was captured.
pub struct MockTransport {
    pub publisher_hosts: Vec<HostAddress>,
    pub checksum_option: msgbus_client::ChecksumOption,
    pub consumer_hosts: Vec<HostAddress>,

    pub put_results: Mutex<VecDeque<Result<PutMessageBatchReply, TransportError>>>,
    pub put_requests: Mutex<Vec<PutMessageBatchRequest>>,

    pub receive_batches: Mutex<VecDeque<Vec<msgbus_client::ConsumerMessage>>>,

    pub ack_results: Mutex<VecDeque<Result<AckMessagesReply, TransportError>>>,
    pub ack_requests: Mutex<Vec<AckMessagesRequest>>,

    /// `service_suffix` values seen by `read_consumer_group_hosts`, in call order.
    pub consumer_group_hosts_suffixes: Mutex<Vec<String>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self {
            publisher_hosts: vec![HostAddress { host: "127.0.0.1".to_string(), port: 4922 }],
            checksum_option: msgbus_client::ChecksumOption::Crc32Ieee,
            consumer_hosts: vec![HostAddress { host: "0".to_string(), port: 0 }],
            put_results: Mutex::new(VecDeque::new()),
            put_requests: Mutex::new(Vec::new()),
            receive_batches: Mutex::new(VecDeque::new()),
            ack_results: Mutex::new(VecDeque::new()),
            ack_requests: Mutex::new(Vec::new()),
            consumer_group_hosts_suffixes: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl RpcTransport for MockTransport {
    async fn read_publisher_options(
        &self,
        _service_suffix: &str,
        _headers: &Headers,
        _timeout: Duration,
        _req: ReadPublisherOptionsRequest,
    ) -> Result<ReadPublisherOptionsReply, TransportError> {
        Ok(ReadPublisherOptionsReply {
            host_protocols: vec![HostProtocol {
                protocol: Protocol::TChannel,
                host_addresses: self.publisher_hosts.clone(),
            }],
            checksum_option: self.checksum_option,
        })
    }

    async fn read_consumer_group_hosts(
        &self,
        service_suffix: &str,
        _headers: &Headers,
        _timeout: Duration,
        _req: ReadConsumerGroupHostsRequest,
    ) -> Result<ReadConsumerGroupHostsReply, TransportError> {
        self.consumer_group_hosts_suffixes
            .lock()
            .unwrap()
            .push(service_suffix.to_string());
        Ok(ReadConsumerGroupHostsReply {
            host_addresses: self.consumer_hosts.clone(),
        })
    }

    async fn create_destination(
        &self,
        _service_suffix: &str,
        _headers: &Headers,
        _timeout: Duration,
        req: CreateDestinationRequest,
    ) -> Result<CreateDestinationReply, TransportError> {
        Ok(CreateDestinationReply(req.0))
    }

    async fn read_destination(
        &self,
        _service_suffix: &str,
        _headers: &Headers,
        _timeout: Duration,
        req: ReadDestinationRequest,
    ) -> Result<ReadDestinationReply, TransportError> {
        Ok(ReadDestinationReply(req.0))
    }

    async fn create_consumer_group(
        &self,
        _service_suffix: &str,
        _headers: &Headers,
        _timeout: Duration,
        req: CreateConsumerGroupRequest,
    ) -> Result<CreateConsumerGroupReply, TransportError> {
        Ok(CreateConsumerGroupReply(req.0))
    }

    async fn read_consumer_group(
        &self,
        _service_suffix: &str,
        _headers: &Headers,
        _timeout: Duration,
        req: ReadConsumerGroupRequest,
    ) -> Result<ReadConsumerGroupReply, TransportError> {
        Ok(ReadConsumerGroupReply(req.0))
    }

    async fn purge_dlq_for_consumer_group(
        &self,
        _service_suffix: &str,
        _headers: &Headers,
        _timeout: Duration,
        req: PurgeDlqForConsumerGroupRequest,
    ) -> Result<PurgeDlqForConsumerGroupReply, TransportError> {
        Ok(PurgeDlqForConsumerGroupReply(req.0))
    }

    async fn merge_dlq_for_consumer_group(
        &self,
        _service_suffix: &str,
        _headers: &Headers,
        _timeout: Duration,
        req: MergeDlqForConsumerGroupRequest,
    ) -> Result<MergeDlqForConsumerGroupReply, TransportError> {
        Ok(MergeDlqForConsumerGroupReply(req.0))
    }

    async fn put_message_batch(
        &self,
        _hostport: &str,
        _headers: &Headers,
        _timeout: Duration,
        req: PutMessageBatchRequest,
    ) -> Result<PutMessageBatchReply, TransportError> {
        self.put_requests.lock().unwrap().push(clone_put_request(&req));
        let next = self.put_results.lock().unwrap().pop_front();
        match next {
            Some(result) => result,
            None => Ok(PutMessageBatchReply {
                success_messages: req
                    .messages
                    .into_iter()
                    .map(|m| msgbus_client::PutMessageAck {
                        id: m.id,
                        status: msgbus_client::AckStatus::Ok,
                        receipt: Some("receipt".to_string()),
                        message: None,
                    })
                    .collect(),
                failed_messages: vec![],
            }),
        }
    }

    async fn receive_message_batch(
        &self,
        _hostport: &str,
        _headers: &Headers,
        _timeout: Duration,
        _req: ReceiveMessageBatchRequest,
    ) -> Result<ReceiveMessageBatchReply, TransportError> {
        let next = self.receive_batches.lock().unwrap().pop_front();
        match next {
            Some(messages) => Ok(ReceiveMessageBatchReply { messages }),
            // Nothing left to deliver; idle briefly so the worker loop
            // doesn't spin the test's executor.
            None => {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(ReceiveMessageBatchReply { messages: vec![] })
            }
        }
    }

    async fn ack_messages(
        &self,
        _hostport: &str,
        _headers: &Headers,
        _timeout: Duration,
        req: AckMessagesRequest,
    ) -> Result<AckMessagesReply, TransportError> {
        self.ack_requests.lock().unwrap().push(AckMessagesRequest {
            ack_ids: req.ack_ids.clone(),
            nack_ids: req.nack_ids.clone(),
        });
        let next = self.ack_results.lock().unwrap().pop_front();
        next.unwrap_or(Ok(AckMessagesReply))
    }
}

fn clone_put_request(req: &PutMessageBatchRequest) -> PutMessageBatchRequest {
    PutMessageBatchRequest {
        destination_path: req.destination_path.clone(),
        messages: req.messages.clone(),
    }
}
