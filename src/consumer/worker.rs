use crate::model::{ConsumerMessage, DeliveryToken};
use crate::routing::create_delivery_token;
use crate::rpc::Invoker;
use crate::transport::ReceiveMessageBatchRequest;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const ENQUEUE_POLL: Duration = Duration::from_secs(5);
const BACKOFF_BASE: Duration = Duration::from_millis(100);
const BACKOFF_CAP: Duration = Duration::from_secs(5);

/// One worker per output host: issues receive-batch RPCs in a loop, pushing
/// delivered messages onto the shared bounded delivery queue. A stalled
/// application backs up the queue, which stalls the enqueue retry loop,
/// which slows the RPC pull -- propagating backpressure to the service.
pub struct ConsumerWorker {
    cancel: CancellationToken,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl ConsumerWorker {
    pub fn start(
        path: String,
        consumer_group_name: String,
        queue: mpsc::Sender<(DeliveryToken, ConsumerMessage)>,
        invoker: Invoker,
        hostport: String,
        headers: Arc<crate::transport::Headers>,
        timeout: Duration,
        batch_size: u32,
    ) -> Self {
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let transport = invoker.transport().clone();

        let receive_timeout = Duration::from_secs(timeout.as_secs().saturating_sub(1).max(1));

        let handle = tokio::spawn(async move {
            let mut backoff = BACKOFF_BASE;

            loop {
                if task_cancel.is_cancelled() {
                    return;
                }

                let request = ReceiveMessageBatchRequest {
                    destination_path: path.clone(),
                    consumer_group_name: consumer_group_name.clone(),
                    max_number_of_messages: batch_size,
                    receive_timeout,
                };

                let result = invoker
                    .call_output("receiveMessageBatch", &hostport, || {
                        transport.receive_message_batch(&hostport, &headers, timeout, request)
                    })
                    .await;

                let reply = match result {
                    Ok(reply) => {
                        backoff = BACKOFF_BASE;
                        reply
                    }
                    Err(err) => {
                        tracing::info!(hostport = %hostport, error = %err, "error receiving msg from output host");
                        tokio::select! {
                            _ = task_cancel.cancelled() => return,
                            _ = tokio::time::sleep(backoff) => {},
                        }
                        backoff = (backoff * 2).min(BACKOFF_CAP);
                        continue;
                    }
                };

                for msg in reply.messages {
                    let token = create_delivery_token(msg.ack_id.clone(), hostport.clone());
                    let item = (token, msg);

                    // If the queue is full, keep trying until there's a free
                    // slot or the worker has been stopped.
                    loop {
                        tokio::select! {
                            _ = task_cancel.cancelled() => return,
                            res = tokio::time::timeout(ENQUEUE_POLL, queue.send(item.clone())) => {
                                match res {
                                    Ok(Ok(())) => break,
                                    // Receiver dropped: the consumer has closed.
                                    Ok(Err(_)) => return,
                                    // Put timed out because the queue is full; retry.
                                    Err(_elapsed) => continue,
                                }
                            }
                        }
                    }
                }
            }
        });

        Self {
            cancel,
            handle: Some(handle),
        }
    }

    pub fn stop(&mut self) {
        self.cancel.cancel();
        self.handle = None;
    }
}

impl Drop for ConsumerWorker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
