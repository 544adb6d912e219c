mod worker;

use crate::error::{Error, Result};
use crate::model::{PutMessage, PutMessageAck};
use crate::reconfigure::Reconfigurer;
use crate::routing::{connection_key, host_set_diff};
use crate::rpc::Invoker;
use crate::transport::{Headers, Protocol, ReadPublisherOptionsRequest};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use worker::{PublishCallback, PublishTask, PublisherWorker};

/// Tuning knobs for a [`Publisher`], beyond the path and timeouts shared
/// with the rest of the client.
#[derive(Clone, Debug)]
pub struct PublisherOptions {
    /// Capacity of the bounded task queue shared by all `PublisherWorker`s.
    /// `publish_async` returns a synthetic `FAILED` ack when the queue is
    /// full rather than growing without bound (spec.md §9's flagged
    /// unbounded-queue behavior, resolved here).
    pub task_queue_capacity: usize,
}

impl Default for PublisherOptions {
    fn default() -> Self {
        Self {
            task_queue_capacity: 1000,
        }
    }
}

struct Shared {
    path: String,
    deployment_str: String,
    invoker: Invoker,
    headers: Arc<Headers>,
    timeout: Duration,
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<PublishTask>>>,
}

/// Public endpoint for publishing messages to a destination. Owns its task
/// queue, its worker pool (one [`PublisherWorker`] per input host), and its
/// [`Reconfigurer`].
pub struct Publisher {
    shared: Arc<Shared>,
    sender: mpsc::Sender<PublishTask>,
    workers: Arc<std::sync::Mutex<HashMap<String, PublisherWorker>>>,
    reconfigure_interval: Duration,
    reconfigurer: Option<Reconfigurer>,
    closed: bool,
}

impl Publisher {
    pub fn new(
        path: String,
        invoker: Invoker,
        deployment_str: String,
        headers: Headers,
        timeout: Duration,
        reconfigure_interval: Duration,
        options: PublisherOptions,
    ) -> Result<Self> {
        if path.is_empty() {
            return Err(Error::MissingPath);
        }

        let (sender, receiver) = mpsc::channel(options.task_queue_capacity);

        Ok(Self {
            shared: Arc::new(Shared {
                path,
                deployment_str,
                invoker,
                headers: Arc::new(headers),
                timeout,
                receiver: Arc::new(tokio::sync::Mutex::new(receiver)),
            }),
            sender,
            workers: Arc::new(std::sync::Mutex::new(HashMap::new())),
            reconfigure_interval,
            reconfigurer: None,
            closed: false,
        })
    }

    /// Performs the first reconfiguration synchronously, then starts the
    /// recurring [`Reconfigurer`]. Any failure closes the publisher and
    /// re-raises.
    pub async fn open(&mut self) -> Result<()> {
        if let Err(err) = reconfigure(&self.shared, &self.workers).await {
            self.close();
            return Err(Error::OpenFailed(Box::new(err)));
        }

        let shared = self.shared.clone();
        let workers = self.workers.clone();
        self.reconfigurer = Some(Reconfigurer::start(self.reconfigure_interval, move || {
            let shared = shared.clone();
            let workers = workers.clone();
            async move { reconfigure(&shared, &workers).await }
        }));

        Ok(())
    }

    /// Stops the reconfigurer and every worker, then drains the task queue,
    /// firing a synthetic `FAILED` callback for every task still queued.
    /// Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Some(mut reconfigurer) = self.reconfigurer.take() {
            reconfigurer.stop();
        }

        let mut workers = self.workers.lock().unwrap();
        for (_, mut worker) in workers.drain() {
            worker.stop();
        }
        drop(workers);

        if let Ok(mut receiver) = self.shared.receiver.try_lock() {
            while let Ok((msg, callback)) = receiver.try_recv() {
                if let Some(callback) = callback {
                    callback(PutMessageAck::failed(msg.id, "publisher closed"));
                }
            }
        }
    }

    /// Publishes a message, blocking up to `timeout_seconds` for the ack.
    /// Returns a synthesized `TIMEDOUT` ack if the wait elapses without a
    /// callback.
    pub async fn publish(
        &self,
        id: String,
        data: bytes::Bytes,
        user_context: HashMap<String, String>,
    ) -> PutMessageAck {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let id_for_timeout = id.clone();

        self.publish_async(
            id,
            data,
            Some(Box::new(move |ack| {
                let _ = tx.send(ack);
            })),
            user_context,
        )
        .await;

        match tokio::time::timeout(self.shared.timeout, rx).await {
            Ok(Ok(ack)) => ack,
            Ok(Err(_)) => PutMessageAck::failed(
                id_for_timeout,
                "unexpected: callback does not carry result",
            ),
            Err(_elapsed) => PutMessageAck::timed_out(id_for_timeout),
        }
    }

    /// Asynchronously publishes a message. `callback` is invoked exactly
    /// once with the outcome, unless the task queue is full, in which case
    /// a synthetic `FAILED` ack is delivered immediately.
    pub async fn publish_async(
        &self,
        id: String,
        data: bytes::Bytes,
        callback: Option<PublishCallback>,
        user_context: HashMap<String, String>,
    ) {
        let msg = PutMessage::new(id.clone(), data, user_context);

        match self.sender.try_send((msg, callback)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full((_, Some(callback)))) => {
                callback(PutMessageAck::failed(id, "publish task queue is full"));
            }
            Err(mpsc::error::TrySendError::Full((_, None))) => {}
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

async fn reconfigure(
    shared: &Arc<Shared>,
    workers: &Arc<std::sync::Mutex<HashMap<String, PublisherWorker>>>,
) -> Result<()> {
    tracing::info!(path = %shared.path, "publisher reconfiguration started");

    let service_suffix = crate::transport::frontend_service_suffix(&shared.deployment_str);
    let reply = shared
        .invoker
        .call_frontend("readPublisherOptions", || {
            shared.invoker.transport().read_publisher_options(
                &service_suffix,
                &shared.headers,
                shared.timeout,
                ReadPublisherOptionsRequest {
                    path: shared.path.clone(),
                },
            )
        })
        .await?;

    let host_addresses = reply
        .host_protocols
        .iter()
        .find(|p| p.protocol == Protocol::TChannel)
        .map(|p| p.host_addresses.clone())
        .unwrap_or_default();

    if host_addresses.is_empty() {
        return Err(Error::ProtocolNotSupported);
    }

    let desired: HashSet<String> = host_addresses.iter().map(connection_key).collect();

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
        // All workers share one receiver handle guarded by a tokio Mutex:
        // only one worker dequeues at a time, but whichever is free picks up
        // the next task, giving fan-out across input hosts for free.
        let worker = PublisherWorker::start(
            shared.path.clone(),
            shared.receiver.clone(),
            shared.invoker.clone(),
            conn.clone(),
            shared.headers.clone(),
            shared.timeout,
            reply.checksum_option,
        );
        workers.insert(conn, worker);
    }

    tracing::info!(path = %shared.path, "publisher reconfiguration succeeded");
    Ok(())
}
