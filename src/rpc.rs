use crate::transport::{RpcTransport, TransportError};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Wraps calls to the frontend/input/output RPC surface, instrumenting each
/// with a "calls" counter, a "success"/"exception" counter, and a
/// "duration.success"/"duration.exception" timing -- all tagged by method
/// name (and hostport, for input/output calls).
pub struct Invoker {
    transport: Arc<dyn RpcTransport>,
}

impl Invoker {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<dyn RpcTransport> {
        &self.transport
    }

    /// Frontend call: resolved by deployment suffix rather than an explicit
    /// hostport.
    pub async fn call_frontend<F, Fut, R>(&self, method: &'static str, call: F) -> Result<R, TransportError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<R, TransportError>>,
    {
        self.instrument(method, None, call).await
    }

    /// Input-host call against an explicit hostport.
    pub async fn call_input<F, Fut, R>(
        &self,
        method: &'static str,
        hostport: &str,
        call: F,
    ) -> Result<R, TransportError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<R, TransportError>>,
    {
        self.instrument(method, Some(hostport), call).await
    }

    /// Output-host call against an explicit hostport.
    pub async fn call_output<F, Fut, R>(
        &self,
        method: &'static str,
        hostport: &str,
        call: F,
    ) -> Result<R, TransportError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<R, TransportError>>,
    {
        self.instrument(method, Some(hostport), call).await
    }

    async fn instrument<F, Fut, R>(
        &self,
        method: &'static str,
        hostport: Option<&str>,
        call: F,
    ) -> Result<R, TransportError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<R, TransportError>>,
    {
        let hostport_label = hostport.unwrap_or("").to_string();
        metrics::counter!("msgbus_client_rpc_calls", "method" => method, "hostport" => hostport_label.clone())
            .increment(1);

        let start = Instant::now();
        tracing::debug!(method, hostport, "issuing rpc");

        match call().await {
            Ok(reply) => {
                metrics::counter!("msgbus_client_rpc_success", "method" => method, "hostport" => hostport_label.clone())
                    .increment(1);
                metrics::histogram!("msgbus_client_rpc_duration_ms", "method" => method, "hostport" => hostport_label, "outcome" => "success")
                    .record(duration_ms(start.elapsed()));
                Ok(reply)
            }
            Err(err) => {
                metrics::counter!("msgbus_client_rpc_exception", "method" => method, "hostport" => hostport_label.clone())
                    .increment(1);
                metrics::histogram!("msgbus_client_rpc_duration_ms", "method" => method, "hostport" => hostport_label, "outcome" => "exception")
                    .record(duration_ms(start.elapsed()));
                tracing::warn!(method, hostport, error = %err, "rpc failed");
                Err(err)
            }
        }
    }
}

fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

impl Clone for Invoker {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
        }
    }
}
