use crate::model::{AckMessageResult, DeliveryToken};
use crate::routing::{get_ack_id_from_delivery_token, get_hostport_from_delivery_token};
use crate::rpc::Invoker;
use crate::transport::AckMessagesRequest;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub type AckCallback = Box<dyn FnOnce(AckMessageResult) + Send>;
pub type AckTask = (bool, DeliveryToken, AckCallback);

/// One of several symmetric workers shared across all output hosts of a
/// [`crate::Consumer`]: pulls ack/nack requests from the shared queue and
/// issues an ack-messages RPC to the output host encoded in the delivery
/// token. Not bound to a specific host -- the host comes from the token.
pub struct AckWorker {
    cancel: CancellationToken,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl AckWorker {
    pub fn start(
        queue: Arc<tokio::sync::Mutex<mpsc::Receiver<AckTask>>>,
        invoker: Invoker,
        headers: Arc<crate::transport::Headers>,
        timeout: Duration,
    ) -> Self {
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
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
                        res = tokio::time::timeout(timeout, queue.recv()) => res,
                    }
                };

                let (is_ack, token, callback) = match next {
                    Ok(Some(task)) => task,
                    // Sender dropped: the consumer has closed.
                    Ok(None) => return,
                    // Dequeue timed out; re-check stop and loop.
                    Err(_elapsed) => continue,
                };

                let ack_id = get_ack_id_from_delivery_token(&token).to_string();
                let hostport = get_hostport_from_delivery_token(&token).to_string();

                let request = AckMessagesRequest {
                    ack_ids: if is_ack { vec![ack_id.clone()] } else { vec![] },
                    nack_ids: if is_ack { vec![] } else { vec![ack_id.clone()] },
                };

                let result = invoker
                    .call_output("ackMessages", &hostport, || {
                        transport.ack_messages(&hostport, &headers, timeout, request)
                    })
                    .await;

                match result {
                    Ok(_) => callback(AckMessageResult::success(is_ack, token)),
                    Err(err) => {
                        tracing::info!(
                            hostport = %hostport,
                            ack_id = %ack_id,
                            is_ack,
                            error = %err,
                            "error ack msg from output host"
                        );
                        callback(AckMessageResult::failure(is_ack, token, err.to_string()));
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

impl Drop for AckWorker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
