mod ack_worker;
mod worker;

use crate::error::{Error, Result};
use crate::model::{AckMessageResult, ConsumerMessage, DeliveryToken};
use crate::reconfigure::Reconfigurer;
use crate::routing::{connection_key, host_set_diff};
use crate::rpc::Invoker;
use crate::transport::{Headers, ReadConsumerGroupHostsRequest};
use ack_worker::{AckCallback, AckTask, AckWorker};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use worker::ConsumerWorker;

/// Tuning knobs for a [`Consumer`].
#[derive(Clone, Debug)]
pub struct ConsumerOptions {
    /// Capacity of the bounded delivered-message queue, and the number of
    /// messages requested per `receiveMessageBatch` call is derived from it
    /// (`max(pre_fetch_count / 10, 1)`).
    pub pre_fetch_count: u32,
    /// Capacity of the bounded ack-request queue.
    pub ack_message_buffer_size: usize,
    /// Number of [`AckWorker`]s sharing the ack queue.
    pub ack_message_thread_count: usize,
}

impl Default for ConsumerOptions {
    fn default() -> Self {
        Self {
            pre_fetch_count: 100,
            ack_message_buffer_size: 100,
            ack_message_thread_count: 2,
        }
    }
}

struct Shared {
    path: String,
    consumer_group_name: String,
    deployment_str: String,
    invoker: Invoker,
    headers: Arc<Headers>,
    timeout: Duration,
    batch_size: u32,
}

/// Public endpoint for consuming messages from a consumer group. Owns the
/// delivered-message queue, the [`ConsumerWorker`] pool, the ack queue, the
/// [`AckWorker`] pool, and its [`Reconfigurer`].
pub struct Consumer {
    shared: Arc<Shared>,
    delivery_tx: mpsc::Sender<(DeliveryToken, ConsumerMessage)>,
    delivery_rx: tokio::sync::Mutex<mpsc::Receiver<(DeliveryToken, ConsumerMessage)>>,
    ack_tx: mpsc::Sender<AckTask>,
    ack_rx: Arc<tokio::sync::Mutex<mpsc::Receiver<AckTask>>>,
    consumer_workers: Arc<std::sync::Mutex<HashMap<String, ConsumerWorker>>>,
    ack_workers: Vec<AckWorker>,
    ack_thread_count: usize,
    reconfigure_interval: Duration,
    reconfigurer: Option<Reconfigurer>,
    closed: bool,
}

impl Consumer {
    pub fn new(
        path: String,
        consumer_group_name: String,
        invoker: Invoker,
        deployment_str: String,
        headers: Headers,
        timeout: Duration,
        reconfigure_interval: Duration,
        options: ConsumerOptions,
    ) -> Result<Self> {
        if path.is_empty() {
            return Err(Error::MissingPath);
        }
        if consumer_group_name.is_empty() {
            return Err(Error::MissingConsumerGroup);
        }

        let batch_size = (options.pre_fetch_count / 10).max(1);
        let (delivery_tx, delivery_rx) = mpsc::channel(options.pre_fetch_count.max(1) as usize);
        let (ack_tx, ack_rx) = mpsc::channel(options.ack_message_buffer_size.max(1));

        Ok(Self {
            shared: Arc::new(Shared {
                path,
                consumer_group_name,
                deployment_str,
                invoker,
                headers: Arc::new(headers),
                timeout,
                batch_size,
            }),
            delivery_tx,
            delivery_rx: tokio::sync::Mutex::new(delivery_rx),
            ack_tx,
            ack_rx: Arc::new(tokio::sync::Mutex::new(ack_rx)),
            consumer_workers: Arc::new(std::sync::Mutex::new(HashMap::new())),
            ack_workers: Vec::new(),
            ack_thread_count: options.ack_message_thread_count.max(1),
            reconfigure_interval,
            reconfigurer: None,
            closed: false,
        })
    }

    /// Performs the first reconfiguration synchronously (populating the
    /// `ConsumerWorker` pool), starts the Reconfigurer, then starts the fixed
    /// pool of `AckWorker`s. Any failure closes the consumer and re-raises.
    pub async fn open(&mut self) -> Result<()> {
        if let Err(err) = reconfigure(&self.shared, &self.consumer_workers, &self.delivery_tx).await {
            self.close();
            return Err(Error::OpenFailed(Box::new(err)));
        }

        let shared = self.shared.clone();
        let consumer_workers = self.consumer_workers.clone();
        let delivery_tx = self.delivery_tx.clone();
        self.reconfigurer = Some(Reconfigurer::start(self.reconfigure_interval, move || {
            let shared = shared.clone();
            let consumer_workers = consumer_workers.clone();
            let delivery_tx = delivery_tx.clone();
            async move { reconfigure(&shared, &consumer_workers, &delivery_tx).await }
        }));

        for _ in 0..self.ack_thread_count {
            self.ack_workers.push(AckWorker::start(
                self.ack_rx.clone(),
                self.shared.invoker.clone(),
                self.shared.headers.clone(),
                self.shared.timeout,
            ));
        }

        Ok(())
    }

    /// Stops the reconfigurer, every `ConsumerWorker`, and every `AckWorker`.
    /// Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Some(mut reconfigurer) = self.reconfigurer.take() {
            reconfigurer.stop();
        }

        let mut workers = self.consumer_workers.lock().unwrap();
        for (_, mut worker) in workers.drain() {
            worker.stop();
        }
        drop(workers);

        for mut worker in self.ack_workers.drain(..) {
            worker.stop();
        }
    }

    /// Blocks up to `timeout` seconds total, accumulating delivered messages
    /// until either `num_msgs` is reached or the deadline elapses. Returns
    /// whatever was collected, possibly empty.
    pub async fn receive(&self, num_msgs: usize) -> Vec<(DeliveryToken, ConsumerMessage)> {
        let deadline = Instant::now() + self.shared.timeout;
        let mut out = Vec::with_capacity(num_msgs);
        let mut rx = self.delivery_rx.lock().await;

        while out.len() < num_msgs {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match tokio::time::timeout(remaining, rx.recv()).await {
                Ok(Some(item)) => out.push(item),
                // Sender dropped: no more workers can deliver.
                Ok(None) => break,
                Err(_elapsed) => break,
            }
        }

        out
    }

    /// Recomputes the checksum declared on `message` (if any) and compares
    /// it. Returns `true` when no checksum was declared -- verification is
    /// application-initiated and makes no claim in that case.
    pub fn verify_checksum(&self, message: &ConsumerMessage) -> bool {
        if let Some(expected) = message.payload.crc32 {
            return crc32fast::hash(&message.payload.data) == expected;
        }
        if let Some(expected) = message.payload.md5 {
            return md5::compute(&message.payload.data).0 == expected;
        }
        true
    }

    /// Acknowledges a delivered message, blocking up to `timeout` seconds.
    /// Returns `true` iff a successful [`AckMessageResult`] was received.
    pub async fn ack(&self, token: DeliveryToken) -> bool {
        self.respond(true, token).await
    }

    /// Negatively acknowledges a delivered message (immediate redelivery),
    /// blocking up to `timeout` seconds.
    pub async fn nack(&self, token: DeliveryToken) -> bool {
        self.respond(false, token).await
    }

    async fn respond(&self, is_ack: bool, token: DeliveryToken) -> bool {
        let (tx, rx) = tokio::sync::oneshot::channel();

        self.respond_async(
            is_ack,
            token,
            Some(Box::new(move |result| {
                let _ = tx.send(result);
            })),
        )
        .await;

        match tokio::time::timeout(self.shared.timeout, rx).await {
            Ok(Ok(result)) => result.call_success,
            Ok(Err(_)) => false,
            Err(_elapsed) => {
                tracing::info!(is_ack, "ack/nack timed out waiting for result");
                false
            }
        }
    }

    /// Asynchronously acknowledges a delivered message. `callback` is
    /// invoked exactly once with the outcome, unless the ack queue is full,
    /// in which case a synthetic failure is delivered immediately.
    pub async fn ack_async(&self, token: DeliveryToken, callback: Option<AckCallback>) {
        self.respond_async(true, token, callback).await
    }

    /// Asynchronously negatively-acknowledges a delivered message. See
    /// [`Consumer::ack_async`].
    pub async fn nack_async(&self, token: DeliveryToken, callback: Option<AckCallback>) {
        self.respond_async(false, token, callback).await
    }

    async fn respond_async(&self, is_ack: bool, token: DeliveryToken, callback: Option<AckCallback>) {
        match self.ack_tx.try_send((is_ack, token.clone(), match callback {
            Some(cb) => cb,
            None => return,
        })) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full((is_ack, token, callback))) => {
                callback(AckMessageResult::failure(
                    is_ack,
                    token,
                    "ack message buffer is full",
                ));
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

async fn reconfigure(
    shared: &Arc<Shared>,
    workers: &Arc<std::sync::Mutex<HashMap<String, ConsumerWorker>>>,
    delivery_tx: &mpsc::Sender<(DeliveryToken, ConsumerMessage)>,
) -> Result<()> {
    tracing::info!(path = %shared.path, consumer_group = %shared.consumer_group_name, "consumer reconfiguration started");

    let service_suffix = crate::transport::frontend_service_suffix(&shared.deployment_str);
    let reply = shared
        .invoker
        .call_frontend("readConsumerGroupHosts", || {
            shared.invoker.transport().read_consumer_group_hosts(
                &service_suffix,
                &shared.headers,
                shared.timeout,
                ReadConsumerGroupHostsRequest {
                    destination_path: shared.path.clone(),
                    consumer_group_name: shared.consumer_group_name.clone(),
                },
            )
        })
        .await?;

    let desired: HashSet<String> = reply.host_addresses.iter().map(connection_key).collect();

    let mut workers = workers.lock().unwrap();
    let current: HashSet<String> = workers.keys().cloned().collect();
    let (to_add, to_remove) = host_set_diff(&current, &desired);

    for conn in to_remove {
        tracing::info!(connection = %conn, "cleaning up connection");
        if let Some(mut worker) = workers.remove(&conn) {
            worker.stop();
        }
    }

    for conn in to_add {
        tracing::info!(connection = %conn, "creating new connection");
        let worker = ConsumerWorker::start(
            shared.path.clone(),
            shared.consumer_group_name.clone(),
            delivery_tx.clone(),
            shared.invoker.clone(),
            conn.clone(),
            shared.headers.clone(),
            shared.timeout,
            shared.batch_size,
        );
        workers.insert(conn, worker);
    }

    tracing::info!(path = %shared.path, "consumer reconfiguration succeeded");
    Ok(())
}
