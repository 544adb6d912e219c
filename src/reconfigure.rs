use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Recurring task that reconciles a [`crate::model`] worker pool against the
/// authoritative host set fetched from the frontend, or any other periodic
/// reconfiguration function.
///
/// Loops until stopped: wait on the wake-now signal OR the interval,
/// whichever fires first. Invokes the reconfiguration function, swallowing
/// and logging any error so reconfiguration never crashes the endpoint --
/// the existing worker set continues to serve while the service is
/// unavailable.
pub struct Reconfigurer {
    wake: Arc<Notify>,
    cancel: CancellationToken,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl Reconfigurer {
    /// Starts the recurring task. `reconfigure` is invoked immediately on
    /// each wake; callers are responsible for performing the first,
    /// synchronous reconfiguration themselves before calling `start` (a
    /// failure there is fatal per spec, unlike periodic failures here).
    pub fn start<F, Fut>(interval: Duration, reconfigure: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = crate::error::Result<()>> + Send,
    {
        let wake = Arc::new(Notify::new());
        let cancel = CancellationToken::new();

        let task_wake = wake.clone();
        let task_cancel = cancel.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => return,
                    _ = task_wake.notified() => {},
                    _ = tokio::time::sleep(interval) => {},
                }

                if task_cancel.is_cancelled() {
                    return;
                }

                if let Err(err) = reconfigure().await {
                    tracing::info!(error = %err, "periodic reconfiguration failed, continuing with existing worker set");
                }
            }
        });

        Self {
            wake,
            cancel,
            handle: Some(handle),
        }
    }

    /// Stops the loop. Idempotent: sets the cancellation token (also waking
    /// the loop so it doesn't wait out the interval) and drops the task
    /// handle on the next call without re-cancelling an already-cancelled
    /// token.
    pub fn stop(&mut self) {
        self.cancel.cancel();
        self.wake.notify_one();
        self.handle = None;
    }
}

impl Drop for Reconfigurer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
