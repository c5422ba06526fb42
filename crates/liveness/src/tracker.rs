//! Liveness tracker implementation.

use std::sync::Arc;

use async_channel::Sender;
use chrono::{DateTime, Utc};
use metrics::counter;
use tokio::sync::Notify;
use tracing::{debug, info, instrument, warn};

use contracts::{Connectivity, CoordinationEvent, DeviceId, LivenessConfig};
use registry::StatusStore;

/// Derives online/offline from ingest recency.
///
/// Owns no device data beyond `connectivity`; it reads `last_seen` from the
/// status store and writes `connectivity` back through the same per-device
/// locks.
pub struct LivenessTracker {
    statuses: Arc<StatusStore>,
    config: LivenessConfig,
    events: Sender<CoordinationEvent>,
    nudge: Arc<Notify>,
}

impl LivenessTracker {
    pub fn new(
        statuses: Arc<StatusStore>,
        config: LivenessConfig,
        events: Sender<CoordinationEvent>,
    ) -> Self {
        Self {
            statuses,
            config,
            events,
            nudge: Arc::new(Notify::new()),
        }
    }

    /// Handle the dispatcher uses to request an early sweep after a failed
    /// dispatch. Waking the sweep is the only effect; no state is written.
    pub fn nudge_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.nudge)
    }

    /// Record that a status report was accepted for the device.
    ///
    /// `unknown -> online` and `offline -> online` transitions emit a
    /// `ConnectivityChanged` event; `online -> online` is a no-op.
    pub fn observe_report(&self, device_id: &DeviceId) {
        let entry = self.statuses.ensure(device_id);
        let transitioned = {
            let mut status = entry.lock().expect("status entry lock poisoned");
            if status.connectivity == Connectivity::Online {
                false
            } else {
                status.connectivity = Connectivity::Online;
                true
            }
        };

        if transitioned {
            info!(device = %device_id, "device online");
            counter!("photodream_connectivity_transitions_total", "state" => "online")
                .increment(1);
            self.emit(CoordinationEvent::ConnectivityChanged {
                device_id: device_id.clone(),
                connectivity: Connectivity::Online,
            });
        }
    }

    /// Mark every online device offline whose newest accepted report is older
    /// than the timeout window. Returns the number of transitions.
    #[instrument(name = "liveness_sweep", skip(self, now))]
    pub fn sweep_once(&self, now: DateTime<Utc>) -> usize {
        let offline_after = self.config.offline_after();
        let mut transitions = Vec::new();

        for (device_id, entry) in self.statuses.entries() {
            let mut status = entry.lock().expect("status entry lock poisoned");
            if status.connectivity != Connectivity::Online {
                continue;
            }
            let stale = match status.last_seen {
                Some(last_seen) => now.signed_duration_since(last_seen) > offline_after,
                // Online implies a report was accepted, but guard anyway
                None => true,
            };
            if stale {
                status.connectivity = Connectivity::Offline;
                transitions.push(device_id);
            }
        }

        for device_id in &transitions {
            info!(device = %device_id, "device offline");
            counter!("photodream_connectivity_transitions_total", "state" => "offline")
                .increment(1);
            self.emit(CoordinationEvent::ConnectivityChanged {
                device_id: device_id.clone(),
                connectivity: Connectivity::Offline,
            });
        }
        transitions.len()
    }

    /// Run the periodic sweep until the task is cancelled.
    ///
    /// Ticks every `sweep_interval` and also wakes early when the dispatcher
    /// nudges after a failed dispatch.
    pub async fn run(&self) {
        let mut interval = tokio::time::interval(self.config.sweep_interval());
        // The first tick fires immediately; skip it so a fresh start does not
        // sweep before any ingest had a chance to arrive.
        interval.tick().await;

        debug!(
            sweep_interval_secs = self.config.sweep_interval_secs,
            offline_after_secs = self.config.offline_after_secs,
            "liveness sweep started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = self.nudge.notified() => {
                    debug!("sweep nudged by dispatch failure");
                }
            }
            self.sweep_once(Utc::now());
        }
    }

    fn emit(&self, event: CoordinationEvent) {
        if let Err(e) = self.events.try_send(event) {
            warn!(error = %e, "coordination event dropped");
        }
    }
}
