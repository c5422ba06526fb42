//! DeviceHandle - per-device dispatch worker with a bounded queue
//!
//! One worker per device serializes command delivery so commands never
//! interleave at the transport; a full queue rejects with `Busy`.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use contracts::{Command, CommandTransport, ContractError, DeviceConfig, DeviceId, DispatchConfig};

use crate::metrics::DispatchMetrics;

/// One queued dispatch. The address is resolved at submit time so workers
/// always use the registry's current value.
pub struct DispatchJob {
    pub address: String,
    pub command: Command,
    pub config: Option<DeviceConfig>,
    pub reply: oneshot::Sender<Result<(), ContractError>>,
}

/// Handle to a running per-device dispatch worker
pub struct DeviceHandle {
    /// Device this worker serves
    device_id: DeviceId,
    /// Channel to queue jobs for the worker
    tx: mpsc::Sender<DispatchJob>,
    /// Shared metrics
    metrics: Arc<DispatchMetrics>,
    /// Worker task handle
    worker_handle: JoinHandle<()>,
}

impl DeviceHandle {
    /// Create a new DeviceHandle and spawn the worker task
    pub fn spawn<T>(
        device_id: DeviceId,
        transport: Arc<T>,
        config: DispatchConfig,
        sweep_hint: Arc<Notify>,
    ) -> Self
    where
        T: CommandTransport + Send + Sync + 'static,
    {
        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let metrics = Arc::new(DispatchMetrics::new());

        let worker_metrics = Arc::clone(&metrics);
        let worker_id = device_id.clone();

        let worker_handle = tokio::spawn(async move {
            device_worker(worker_id, transport, config, rx, worker_metrics, sweep_hint).await;
        });

        Self {
            device_id,
            tx,
            metrics,
            worker_handle,
        }
    }

    /// Device this worker serves
    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<DispatchMetrics> {
        &self.metrics
    }

    /// Queue a job for the worker (non-blocking).
    ///
    /// Fails with `Busy` when the device already has its queue full.
    pub fn try_send(&self, job: DispatchJob) -> Result<(), ContractError> {
        match self.tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(job)) => {
                self.metrics.inc_busy_count();
                warn!(
                    device = %self.device_id,
                    command = job.command.name(),
                    "dispatch queue full, rejecting with busy"
                );
                Err(ContractError::Busy {
                    device_id: self.device_id.to_string(),
                })
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!(device = %self.device_id, "dispatch worker closed unexpectedly");
                Err(ContractError::Other(format!(
                    "dispatch worker for '{}' terminated",
                    self.device_id
                )))
            }
        }
    }

    /// Shutdown the worker gracefully, draining queued jobs first
    #[instrument(name = "device_handle_shutdown", skip(self), fields(device = %self.device_id))]
    pub async fn shutdown(self) {
        // Drop sender to signal worker to stop
        drop(self.tx);
        // Wait for worker to finish
        if let Err(e) = self.worker_handle.await {
            error!(device = %self.device_id, error = ?e, "Worker task panicked");
        }
        debug!(device = %self.device_id, "DeviceHandle shutdown complete");
    }
}

/// Worker task that executes queued dispatches one at a time
#[instrument(
    name = "device_worker_loop",
    skip(transport, config, rx, metrics, sweep_hint),
    fields(device = %device_id)
)]
async fn device_worker<T>(
    device_id: DeviceId,
    transport: Arc<T>,
    config: DispatchConfig,
    mut rx: mpsc::Receiver<DispatchJob>,
    metrics: Arc<DispatchMetrics>,
    sweep_hint: Arc<Notify>,
) where
    T: CommandTransport + Send + Sync,
{
    debug!(device = %device_id, "dispatch worker started");

    while let Some(job) = rx.recv().await {
        let result = execute_with_retries(&device_id, transport.as_ref(), &config, &job, &metrics)
            .await;

        match &result {
            Ok(()) => metrics.inc_success_count(),
            Err(e) => {
                metrics.inc_failure_count();
                warn!(
                    device = %device_id,
                    command = job.command.name(),
                    error = %e,
                    "dispatch failed after retries"
                );
                // Absence of ingest decides offline, not this failure; just
                // ask the sweep to look sooner
                sweep_hint.notify_one();
            }
        }

        // Caller may have stopped waiting; that is not a worker error
        let _ = job.reply.send(result);
    }

    debug!(device = %device_id, "dispatch worker stopped");
}

/// One dispatch: up to `1 + max_retries` attempts, each bounded by the
/// request timeout, with doubling backoff between attempts.
async fn execute_with_retries<T>(
    device_id: &DeviceId,
    transport: &T,
    config: &DispatchConfig,
    job: &DispatchJob,
    metrics: &DispatchMetrics,
) -> Result<(), ContractError>
where
    T: CommandTransport + Send + Sync,
{
    let timeout = config.request_timeout();
    let mut last_error = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            metrics.inc_retry_count();
            tokio::time::sleep(config.backoff_for(attempt - 1)).await;
        }

        let send = transport.send(device_id, &job.address, &job.command, job.config.as_ref());
        match tokio::time::timeout(timeout, send).await {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => {
                debug!(
                    device = %device_id,
                    attempt,
                    error = %e,
                    "dispatch attempt failed"
                );
                last_error = Some(e);
            }
            Err(_) => {
                // In-flight request is abandoned; commands are idempotent so
                // a duplicate arrival on the tablet is harmless
                metrics.inc_timeout_count();
                debug!(device = %device_id, attempt, "dispatch attempt timed out");
                last_error = Some(ContractError::Timeout {
                    device_id: device_id.to_string(),
                    waited_ms: timeout.as_millis() as u64,
                });
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        ContractError::unreachable(device_id.as_str(), "no dispatch attempt executed")
    }))
}
