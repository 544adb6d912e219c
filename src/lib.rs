mod client;
mod consumer;
mod error;
mod model;
mod publisher;
mod reconfigure;
mod rpc;
mod transport;

pub mod routing;

pub use client::Client;
pub use consumer::{Consumer, ConsumerOptions};
pub use error::{Error, Result};
pub use model::{
    AckMessageResult, AckStatus, Checksum, ChecksumOption, ConsumerMessage, DeliveryToken,
    HostAddress, MessagePayload, PutMessage, PutMessageAck,
};
pub use publisher::{Publisher, PublisherOptions};
pub use rpc::Invoker;
pub use transport::{
    AckMessagesReply, AckMessagesRequest, CreateConsumerGroupReply, CreateConsumerGroupRequest,
    CreateDestinationReply, CreateDestinationRequest, Headers, HostProtocol,
    MergeDlqForConsumerGroupReply, MergeDlqForConsumerGroupRequest,
    Protocol, PurgeDlqForConsumerGroupReply, PurgeDlqForConsumerGroupRequest,
    PutMessageBatchReply, PutMessageBatchRequest, ReadConsumerGroupHostsReply,
    ReadConsumerGroupHostsRequest,
    ReadConsumerGroupReply, ReadConsumerGroupRequest, ReadDestinationReply,
    ReadDestinationRequest, ReadPublisherOptionsReply, ReadPublisherOptionsRequest,
    ReceiveMessageBatchReply, ReceiveMessageBatchRequest, RpcTransport, TransportError,
    TransportFactory,
};
