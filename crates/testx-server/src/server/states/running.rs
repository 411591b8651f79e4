use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::backend::Backend;
use crate::health::HealthCheck;

pub(crate) struct Running {
    backend: Arc<Backend>,
    address: SocketAddr,
    cancellation_token: CancellationToken,
    health_check: Option<HealthCheck>,
    handle: Option<JoinHandle<()>>,
}

impl Running {
    pub(crate) fn new(
        backend: Arc<Backend>,
        address: SocketAddr,
        cancellation_token: CancellationToken,
        health_check: Option<HealthCheck>,
        handle: JoinHandle<()>,
    ) -> Self {
        Self {
            backend,
            address,
            cancellation_token,
            health_check,
            handle: Some(handle),
        }
    }

    pub(crate) fn backend(&self) -> &Backend {
        &self.backend
    }

    pub(crate) fn address(&self) -> SocketAddr {
        self.address
    }

    fn cancel(&self) {
        if let Some(health_check) = &self.health_check {
            health_check.mark_down();
        }
        self.cancellation_token.cancel();
    }

    /// Stop serving and wait for in-flight requests to finish
    pub(crate) async fn stop(mut self) {
        self.cancel();
        if let Some(handle) = self.handle.take()
            && let Err(e) = handle.await
        {
            error!(error = %e, "testx server task failed");
        }
        debug!(address = %self.address, "testx server stopped");
    }
}

impl Drop for Running {
    fn drop(&mut self) {
        self.cancel();
    }
}
