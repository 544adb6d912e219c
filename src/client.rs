use crate::consumer::{Consumer, ConsumerOptions};
use crate::error::{Error, Result};
use crate::publisher::{Publisher, PublisherOptions};
use crate::rpc::Invoker;
use crate::transport::{
    CreateConsumerGroupReply, CreateConsumerGroupRequest, CreateDestinationReply,
    CreateDestinationRequest, Headers, MergeDlqForConsumerGroupReply,
    MergeDlqForConsumerGroupRequest, PurgeDlqForConsumerGroupReply,
    PurgeDlqForConsumerGroupRequest, ReadConsumerGroupReply, ReadConsumerGroupRequest,
    ReadDestinationReply, ReadDestinationRequest, RpcTransport, TransportFactory,
    frontend_service_suffix,
};
use std::sync::Arc;
use std::time::Duration;

/// Constructs [`Publisher`]s and [`Consumer`]s, and forwards the
/// administrative frontend calls. Headers supplied at construction are
/// augmented with `user-name`/`host-name` and frozen from then on.
pub struct Client {
    invoker: Invoker,
    deployment_str: String,
    service_suffix: String,
    headers: Headers,
    timeout: Duration,
    reconfigure_interval: Duration,
}

impl Client {
    /// `transport` must be supplied directly, or both `client_name` and
    /// `hyperbahn_host` given so `transport_factory` can build one.
    pub fn new(
        transport: Option<Arc<dyn RpcTransport>>,
        transport_factory: Option<&dyn TransportFactory>,
        client_name: Option<&str>,
        hyperbahn_host: Option<&str>,
        mut headers: Headers,
        deployment_str: String,
        timeout: Duration,
        reconfigure_interval: Duration,
    ) -> Result<Self> {
        let transport = match transport {
            Some(transport) => transport,
            None => {
                let (factory, client_name, hyperbahn_host) =
                    match (transport_factory, client_name, hyperbahn_host) {
                        (Some(factory), Some(client_name), Some(hyperbahn_host))
                            if !client_name.is_empty() && !hyperbahn_host.is_empty() =>
                        {
                            (factory, client_name, hyperbahn_host)
                        }
                        _ => return Err(Error::MissingTransport),
                    };
                factory.build(client_name, hyperbahn_host)?
            }
        };

        headers.insert("user-name".to_string(), current_username());
        headers.insert("host-name".to_string(), hostname());

        Ok(Self {
            invoker: Invoker::new(transport),
            service_suffix: frontend_service_suffix(&deployment_str),
            deployment_str,
            headers,
            timeout,
            reconfigure_interval,
        })
    }

    pub fn create_publisher(&self, path: String) -> Result<Publisher> {
        self.create_publisher_with_options(path, PublisherOptions::default())
    }

    pub fn create_publisher_with_options(
        &self,
        path: String,
        options: PublisherOptions,
    ) -> Result<Publisher> {
        Publisher::new(
            path,
            self.invoker.clone(),
            self.deployment_str.clone(),
            self.headers.clone(),
            self.timeout,
            self.reconfigure_interval,
            options,
        )
    }

    pub fn create_consumer(
        &self,
        path: String,
        consumer_group_name: String,
    ) -> Result<Consumer> {
        self.create_consumer_with_options(path, consumer_group_name, ConsumerOptions::default())
    }

    pub fn create_consumer_with_options(
        &self,
        path: String,
        consumer_group_name: String,
        options: ConsumerOptions,
    ) -> Result<Consumer> {
        Consumer::new(
            path,
            consumer_group_name,
            self.invoker.clone(),
            self.deployment_str.clone(),
            self.headers.clone(),
            self.timeout,
            self.reconfigure_interval,
            options,
        )
    }

    pub async fn create_destination(
        &self,
        request: CreateDestinationRequest,
    ) -> Result<CreateDestinationReply> {
        Ok(self
            .invoker
            .call_frontend("createDestination", || {
                self.invoker.transport().create_destination(
                    &self.service_suffix,
                    &self.headers,
                    self.timeout,
                    request,
                )
            })
            .await?)
    }

    pub async fn read_destination(
        &self,
        request: ReadDestinationRequest,
    ) -> Result<ReadDestinationReply> {
        Ok(self
            .invoker
            .call_frontend("readDestination", || {
                self.invoker.transport().read_destination(
                    &self.service_suffix,
                    &self.headers,
                    self.timeout,
                    request,
                )
            })
            .await?)
    }

    pub async fn create_consumer_group(
        &self,
        request: CreateConsumerGroupRequest,
    ) -> Result<CreateConsumerGroupReply> {
        Ok(self
            .invoker
            .call_frontend("createConsumerGroup", || {
                self.invoker.transport().create_consumer_group(
                    &self.service_suffix,
                    &self.headers,
                    self.timeout,
                    request,
                )
            })
            .await?)
    }

    pub async fn read_consumer_group(
        &self,
        request: ReadConsumerGroupRequest,
    ) -> Result<ReadConsumerGroupReply> {
        Ok(self
            .invoker
            .call_frontend("readConsumerGroup", || {
                self.invoker.transport().read_consumer_group(
                    &self.service_suffix,
                    &self.headers,
                    self.timeout,
                    request,
                )
            })
            .await?)
    }

    pub async fn purge_dlq_for_consumer_group(
        &self,
        request: PurgeDlqForConsumerGroupRequest,
    ) -> Result<PurgeDlqForConsumerGroupReply> {
        Ok(self
            .invoker
            .call_frontend("purgeDLQForConsumerGroup", || {
                self.invoker.transport().purge_dlq_for_consumer_group(
                    &self.service_suffix,
                    &self.headers,
                    self.timeout,
                    request,
                )
            })
            .await?)
    }

    pub async fn merge_dlq_for_consumer_group(
        &self,
        request: MergeDlqForConsumerGroupRequest,
    ) -> Result<MergeDlqForConsumerGroupReply> {
        Ok(self
            .invoker
            .call_frontend("mergeDLQForConsumerGroup", || {
                self.invoker.transport().merge_dlq_for_consumer_group(
                    &self.service_suffix,
                    &self.headers,
                    self.timeout,
                    request,
                )
            })
            .await?)
    }
}

fn current_username() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

fn hostname() -> String {
    gethostname::gethostname()
        .into_string()
        .unwrap_or_else(|_| "unknown".to_string())
}
