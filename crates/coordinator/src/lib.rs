//! # Coordinator
//!
//! Reconciliation loop between desired and observed state.
//!
//! Consumes the coordination bus: config changes become best-effort reload
//! dispatches, status and connectivity changes republish the unified fleet
//! view. The view (and the service pass-throughs) are the only surface the
//! external automation layer sees.

use std::sync::Arc;
use std::time::Duration;

use async_channel::Receiver;
use metrics::gauge;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use contracts::{
    Command, CommandTransport, Connectivity, ContractError, CoordinationEvent, DeviceStatus,
    DeviceView,
};
use dispatcher::CommandDispatcher;
use registry::{DeviceRegistry, StatusStore};

/// Reconciliation coordinator.
///
/// Owns no device state itself; it reads the registry and status store and
/// drives the dispatcher.
pub struct Coordinator<T>
where
    T: CommandTransport + Send + Sync + 'static,
{
    registry: Arc<DeviceRegistry>,
    statuses: Arc<StatusStore>,
    dispatcher: Arc<CommandDispatcher<T>>,
    events: Receiver<CoordinationEvent>,
    fleet_tx: watch::Sender<Vec<DeviceView>>,
}

impl<T> Coordinator<T>
where
    T: CommandTransport + Send + Sync + 'static,
{
    pub fn new(
        registry: Arc<DeviceRegistry>,
        statuses: Arc<StatusStore>,
        dispatcher: Arc<CommandDispatcher<T>>,
        events: Receiver<CoordinationEvent>,
    ) -> Self {
        let coordinator = Self {
            registry,
            statuses,
            dispatcher,
            events,
            fleet_tx: watch::channel(Vec::new()).0,
        };
        coordinator.republish();
        coordinator
    }

    /// Unified desired + observed view of one device.
    ///
    /// A device that never reported and was never dispatched to gets an empty
    /// observed record (connectivity `unknown`) without creating one.
    pub fn device_view(&self, device_id: &str) -> Result<DeviceView, ContractError> {
        let desired = self.registry.get_device(device_id)?;
        let observed = self
            .statuses
            .get(device_id)
            .unwrap_or_else(|| DeviceStatus::new(desired.id.clone()));
        Ok(DeviceView { desired, observed })
    }

    /// Views for the whole fleet, ordered by device id.
    pub fn fleet_views(&self) -> Vec<DeviceView> {
        self.registry
            .list_devices()
            .into_iter()
            .map(|desired| {
                let observed = self
                    .statuses
                    .get(&desired.id)
                    .unwrap_or_else(|| DeviceStatus::new(desired.id.clone()));
                DeviceView { desired, observed }
            })
            .collect()
    }

    /// Watch the published fleet snapshot; updated on every relevant event.
    pub fn subscribe(&self) -> watch::Receiver<Vec<DeviceView>> {
        self.fleet_tx.subscribe()
    }

    // ===== Service commands (external automation layer) =====

    /// Advance the slideshow on one device.
    pub async fn next_image(&self, device_id: &str) -> Result<(), ContractError> {
        self.dispatcher.dispatch(device_id, Command::NextImage).await
    }

    /// Push the assembled configuration to one device.
    pub async fn refresh_config(&self, device_id: &str) -> Result<(), ContractError> {
        self.dispatcher
            .dispatch(device_id, Command::RefreshConfig)
            .await
    }

    /// Assign a profile to a device.
    ///
    /// The registry mutation is the authoritative effect; the reconciliation
    /// loop performs the resulting `SetProfile` dispatch best-effort, and the
    /// next status report confirms (or not) that the tablet followed.
    pub fn set_profile(&self, device_id: &str, profile: &str) -> Result<(), ContractError> {
        self.registry.set_device_profile(device_id, profile)?;
        Ok(())
    }

    /// Staggered config refresh across the whole fleet.
    ///
    /// The first device is refreshed immediately; each further device is
    /// scheduled `stagger * i` later so a fleet-wide reload does not hammer
    /// the photo backend all at once. Returns the number of devices touched.
    #[instrument(name = "coordinator_refresh_fleet", skip(self))]
    pub async fn refresh_fleet(&self, stagger: Duration) -> usize {
        let devices = self.registry.list_devices();
        let count = devices.len();

        for (i, device) in devices.into_iter().enumerate() {
            if i == 0 {
                if let Err(e) = self.refresh_config(&device.id).await {
                    warn!(device = %device.id, error = %e, "fleet refresh dispatch failed");
                }
                continue;
            }
            let dispatcher = Arc::clone(&self.dispatcher);
            let delay = stagger * i as u32;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if let Err(e) = dispatcher.dispatch(&device.id, Command::RefreshConfig).await {
                    warn!(device = %device.id, error = %e, "fleet refresh dispatch failed");
                }
            });
        }
        count
    }

    // ===== Reconciliation loop =====

    /// Consume coordination events until the bus closes.
    pub async fn run(&self) {
        info!("coordinator started");

        while let Ok(event) = self.events.recv().await {
            self.handle_event(event).await;
        }

        info!("coordination bus closed, coordinator stopping");
    }

    async fn handle_event(&self, event: CoordinationEvent) {
        debug!(?event, "coordination event");
        match event {
            CoordinationEvent::ConfigChanged {
                device_id,
                profile_changed,
            } => {
                let command = if profile_changed {
                    match self.registry.get_device(&device_id) {
                        Ok(device) => Command::SetProfile {
                            profile: device.profile,
                        },
                        // Removed between event and handling; nothing to push
                        Err(_) => return,
                    }
                } else {
                    Command::RefreshConfig
                };

                // Best-effort: the dispatcher already retried; the next
                // successful ingest or a manual retry is the recovery path
                if let Err(e) = self.dispatcher.dispatch(&device_id, command).await {
                    warn!(device = %device_id, error = %e, "reload dispatch failed");
                }
                self.republish();
            }
            CoordinationEvent::StatusUpdated { .. }
            | CoordinationEvent::ConnectivityChanged { .. } => {
                self.republish();
            }
            CoordinationEvent::DeviceRemoved { device_id } => {
                self.statuses.remove(&device_id);
                self.dispatcher.remove_device(&device_id);
                self.republish();
            }
        }
    }

    fn republish(&self) {
        let views = self.fleet_views();
        let online = views
            .iter()
            .filter(|view| view.observed.connectivity == Connectivity::Online)
            .count();
        gauge!("photodream_devices_online").set(online as f64);
        gauge!("photodream_devices_total").set(views.len() as f64);
        self.fleet_tx.send_replace(views);
    }
}
