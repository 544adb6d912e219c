use crate::model::{ChecksumOption, PutMessage, PutMessageAck};
use crate::routing::calc_crc;
use crate::rpc::Invoker;
use crate::transport::PutMessageBatchRequest;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub type PublishCallback = Box<dyn FnOnce(PutMessageAck) + Send>;
pub type PublishTask = (PutMessage, Option<PublishCallback>);

const DEQUEUE_POLL: Duration = Duration::from_secs(5);

/// One worker per input host: pulls send-tasks from the shared queue,
/// attaches a checksum, issues a single-message batch RPC, and invokes the
/// per-task completion callback with an acknowledgement exactly once.
pub struct PublisherWorker {
    cancel: CancellationToken,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl PublisherWorker {
    pub fn start(
        path: String,
        queue: Arc<tokio::sync::Mutex<mpsc::Receiver<PublishTask>>>,
        invoker: Invoker,
        hostport: String,
        headers: Arc<crate::transport::Headers>,
        timeout: Duration,
        checksum_option: ChecksumOption,
    ) -> Self {
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let start_time = std::time::Instant::now();
        let transport = invoker.transport().clone();

        let handle = tokio::spawn(async move {
            loop {
                if task_cancel.is_cancelled() {
                    return;
                }

                let next = {
                    let mut queue = queue.lock().await;
                    tokio::select! {
                        _ = task_cancel.cancelled() => return,
                        res = tokio::time::timeout(DEQUEUE_POLL, queue.recv()) => res,
                    }
                };

                let (mut msg, callback) = match next {
                    Ok(Some(task)) => task,
                    // Sender dropped: the publisher has closed.
                    Ok(None) => return,
                    // Dequeue timed out; re-check stop and loop.
                    Err(_elapsed) => continue,
                };

                let checksum = calc_crc(&msg.data, checksum_option);
                msg.stamp(checksum);
                let id = msg.id.clone();

                let request = PutMessageBatchRequest {
                    destination_path: path.clone(),
                    messages: vec![msg],
                };

                let result = invoker
                    .call_input("putMessageBatch", &hostport, || {
                        transport.put_message_batch(&hostport, &headers, timeout, request)
                    })
                    .await;

                let Some(callback) = callback else { continue };

                match result {
                    Ok(batch_result) => {
                        let ack = if let Some(ack) = batch_result.success_messages.into_iter().next() {
                            ack
                        } else if let Some(ack) = batch_result.failed_messages.into_iter().next() {
                            ack
                        } else {
                            PutMessageAck::failed(id, "sender gets no result from input")
                        };
                        callback(ack);
                    }
                    Err(err) => {
                        let message = format!(
                            "error:{err}, hostport:{hostport}, worker start time:{start_time:?}"
                        );
                        callback(PutMessageAck::failed(id, message));
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

impl Drop for PublisherWorker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
