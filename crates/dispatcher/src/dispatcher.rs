//! CommandDispatcher - main entry for outbound commands
//!
//! Resolves the target from the registry, lazily creates the observed-state
//! record, and routes the job to the device's worker. Dispatches to different
//! devices run fully in parallel; per device they are serialized.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{oneshot, Notify};
use tracing::{debug, info, instrument};

use contracts::{
    Command, CommandTransport, ContractError, DeviceConfig, DeviceId, DispatchConfig,
    ImmichSettings,
};
use registry::{DeviceRegistry, StatusStore};

use crate::handle::{DeviceHandle, DispatchJob};
use crate::metrics::DispatchSnapshot;

/// Hub-side context baked into every pushed configuration.
#[derive(Debug, Clone)]
pub struct HubContext {
    /// Photo backend credentials, passed through opaquely
    pub immich: ImmichSettings,

    /// Status webhook URL advertised to tablets
    pub webhook_url: String,
}

/// Outbound command dispatcher.
pub struct CommandDispatcher<T>
where
    T: CommandTransport + Send + Sync + 'static,
{
    registry: Arc<DeviceRegistry>,
    statuses: Arc<StatusStore>,
    transport: Arc<T>,
    config: DispatchConfig,
    hub: HubContext,
    sweep_hint: Arc<Notify>,
    handles: Mutex<HashMap<DeviceId, DeviceHandle>>,
}

impl<T> CommandDispatcher<T>
where
    T: CommandTransport + Send + Sync + 'static,
{
    pub fn new(
        registry: Arc<DeviceRegistry>,
        statuses: Arc<StatusStore>,
        transport: Arc<T>,
        config: DispatchConfig,
        hub: HubContext,
        sweep_hint: Arc<Notify>,
    ) -> Self {
        Self {
            registry,
            statuses,
            transport,
            config,
            hub,
            sweep_hint,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Dispatch one command to one device and wait for the outcome.
    ///
    /// # Errors
    /// - `UnknownDevice` when the id is not configured
    /// - `Busy` when the device's dispatch queue is full
    /// - `Unreachable` / `Timeout` after the retry bound is exhausted
    #[instrument(
        name = "dispatcher_dispatch",
        skip(self, command),
        fields(device = %device_id, command = command.name())
    )]
    pub async fn dispatch(&self, device_id: &str, command: Command) -> Result<(), ContractError> {
        let device = self.registry.get_device(device_id)?;

        // First dispatch attempt creates the observed-state record
        self.statuses.ensure(&device.id);

        let config = match &command {
            Command::RefreshConfig => {
                let profile = self.registry.get_profile(&device.profile)?;
                Some(DeviceConfig::assemble(
                    &device,
                    &profile,
                    &self.hub.immich,
                    self.hub.webhook_url.clone(),
                ))
            }
            _ => None,
        };

        let (reply, outcome) = oneshot::channel();
        let job = DispatchJob {
            address: device.address.clone(),
            command,
            config,
            reply,
        };

        {
            let mut handles = self.handles.lock().expect("dispatcher handles poisoned");
            let handle = handles.entry(device.id.clone()).or_insert_with(|| {
                debug!(device = %device.id, "spawning dispatch worker");
                DeviceHandle::spawn(
                    device.id.clone(),
                    Arc::clone(&self.transport),
                    self.config,
                    Arc::clone(&self.sweep_hint),
                )
            });
            handle.try_send(job)?;
        }

        outcome.await.map_err(|_| {
            ContractError::Other(format!("dispatch worker for '{}' dropped the reply", device.id))
        })?
    }

    /// Tear down the worker of a removed device. Queued jobs drain first.
    pub fn remove_device(&self, device_id: &str) {
        let handle = {
            let mut handles = self.handles.lock().expect("dispatcher handles poisoned");
            handles.remove(device_id)
        };
        if let Some(handle) = handle {
            info!(device = %device_id, "tearing down dispatch worker");
            tokio::spawn(handle.shutdown());
        }
    }

    /// Metrics snapshots for all active device workers.
    pub fn metrics(&self) -> Vec<(String, DispatchSnapshot)> {
        let handles = self.handles.lock().expect("dispatcher handles poisoned");
        handles
            .values()
            .map(|handle| (handle.device_id().to_string(), handle.metrics().snapshot()))
            .collect()
    }

    /// Shut down all workers gracefully.
    pub async fn shutdown(&self) {
        let handles: Vec<DeviceHandle> = {
            let mut map = self.handles.lock().expect("dispatcher handles poisoned");
            map.drain().map(|(_, handle)| handle).collect()
        };
        for handle in handles {
            handle.shutdown().await;
        }
    }
}
