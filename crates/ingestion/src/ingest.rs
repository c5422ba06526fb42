//! Status ingest - recency-gated application of tablet reports.

use std::sync::Arc;

use async_channel::Sender;
use chrono::Utc;
use metrics::counter;
use tracing::{debug, instrument, warn};

use contracts::{ContractError, CoordinationEvent, StatusReport};
use liveness::LivenessTracker;
use registry::{DeviceRegistry, StatusStore};

/// Result of one accepted ingest call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Report applied to the device's observed state
    Applied,
    /// Report older than the stored state; dropped without side effects
    Stale,
}

/// Applies inbound status reports to the observed state.
///
/// Shares the status store with the dispatcher and the liveness tracker only
/// through short per-device critical sections; it never waits on dispatch
/// activity.
pub struct StatusIngest {
    registry: Arc<DeviceRegistry>,
    statuses: Arc<StatusStore>,
    tracker: Arc<LivenessTracker>,
    events: Sender<CoordinationEvent>,
}

impl StatusIngest {
    pub fn new(
        registry: Arc<DeviceRegistry>,
        statuses: Arc<StatusStore>,
        tracker: Arc<LivenessTracker>,
        events: Sender<CoordinationEvent>,
    ) -> Self {
        Self {
            registry,
            statuses,
            tracker,
            events,
        }
    }

    /// Apply one status report.
    ///
    /// Reports are applied last-write-wins by the report timestamp (receive
    /// time when the tablet sent none); an older report than the stored
    /// `last_seen` is dropped silently. Optional fields the tablet omitted
    /// keep their previous observed value.
    ///
    /// # Errors
    /// - `UnknownDevice` for ids not present in the registry (registration
    ///   is a registry operation, never implicit)
    /// - `MalformedPayload` for an empty device id
    #[instrument(name = "ingest_receive_status", skip(self, report), fields(device = %report.device_id))]
    pub fn receive_status(&self, report: StatusReport) -> Result<IngestOutcome, ContractError> {
        if report.device_id.is_empty() {
            return Err(ContractError::malformed_payload("missing device_id"));
        }
        let device = self.registry.get_device(&report.device_id).map_err(|e| {
            counter!("photodream_ingest_rejected_total").increment(1);
            e
        })?;

        let timestamp = report.timestamp.unwrap_or_else(Utc::now);
        let entry = self.statuses.ensure(&device.id);
        let applied = {
            let mut status = entry.lock().expect("status entry lock poisoned");
            match status.last_seen {
                Some(last_seen) if timestamp < last_seen => false,
                _ => {
                    if let Some(image) = report.current_image {
                        status.current_image = Some(image);
                    }
                    if let Some(url) = report.current_image_url {
                        status.current_image_url = Some(url);
                    }
                    if let Some(profile) = report.profile {
                        status.last_reported_profile = Some(profile);
                    }
                    status.error_flag = report.error;
                    status.last_seen = Some(timestamp);
                    true
                }
            }
        };

        if !applied {
            debug!(device = %device.id, "stale status report dropped");
            counter!("photodream_ingest_stale_total").increment(1);
            return Ok(IngestOutcome::Stale);
        }

        counter!("photodream_ingest_accepted_total").increment(1);
        self.tracker.observe_report(&device.id);
        if let Err(e) = self.events.try_send(CoordinationEvent::StatusUpdated {
            device_id: device.id.clone(),
        }) {
            warn!(error = %e, "coordination event dropped");
        }
        Ok(IngestOutcome::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use contracts::{Connectivity, Device, DisplaySettings, LivenessConfig, Profile};

    struct Fixture {
        ingest: StatusIngest,
        statuses: Arc<StatusStore>,
        events: async_channel::Receiver<CoordinationEvent>,
    }

    fn fixture() -> Fixture {
        let (tx, rx) = async_channel::bounded(32);
        let registry = Arc::new(DeviceRegistry::new(tx.clone()));
        registry.upsert_profile(Profile {
            id: "default".into(),
            query: "family".into(),
            exclude_paths: vec![],
        });
        registry
            .upsert_device(Device {
                id: "kitchen".into(),
                address: "192.168.1.40:8080".into(),
                profile: "default".into(),
                display: DisplaySettings::default(),
            })
            .unwrap();
        // Drain the upsert's ConfigChanged
        rx.try_recv().unwrap();

        let statuses = Arc::new(StatusStore::new());
        let tracker = Arc::new(LivenessTracker::new(
            Arc::clone(&statuses),
            LivenessConfig::default(),
            tx.clone(),
        ));
        Fixture {
            ingest: StatusIngest::new(registry, Arc::clone(&statuses), tracker, tx),
            statuses,
            events: rx,
        }
    }

    fn report(image: &str, at: chrono::DateTime<Utc>) -> StatusReport {
        StatusReport {
            device_id: "kitchen".into(),
            current_image: Some(image.into()),
            current_image_url: None,
            profile: Some("default".into()),
            timestamp: Some(at),
            error: false,
        }
    }

    #[test]
    fn accepted_report_updates_observed_state() {
        let f = fixture();
        let at = Utc::now();

        let outcome = f.ingest.receive_status(report("img-42", at)).unwrap();
        assert_eq!(outcome, IngestOutcome::Applied);

        let status = f.statuses.get("kitchen").unwrap();
        assert_eq!(status.current_image.as_deref(), Some("img-42"));
        assert_eq!(status.last_reported_profile.as_deref(), Some("default"));
        assert_eq!(status.last_seen, Some(at));
        assert_eq!(status.connectivity, Connectivity::Online);
    }

    #[test]
    fn accepted_report_emits_connectivity_then_status_events() {
        let f = fixture();
        f.ingest.receive_status(report("img-1", Utc::now())).unwrap();

        assert_eq!(
            f.events.try_recv().unwrap(),
            CoordinationEvent::ConnectivityChanged {
                device_id: "kitchen".into(),
                connectivity: Connectivity::Online,
            }
        );
        assert_eq!(
            f.events.try_recv().unwrap(),
            CoordinationEvent::StatusUpdated {
                device_id: "kitchen".into(),
            }
        );
    }

    #[test]
    fn older_report_is_dropped_silently() {
        let f = fixture();
        let now = Utc::now();
        f.ingest.receive_status(report("img-2", now)).unwrap();

        let outcome = f
            .ingest
            .receive_status(report("img-1", now - Duration::seconds(10)))
            .unwrap();
        assert_eq!(outcome, IngestOutcome::Stale);

        let status = f.statuses.get("kitchen").unwrap();
        assert_eq!(status.current_image.as_deref(), Some("img-2"));
        assert_eq!(status.last_seen, Some(now));
    }

    #[test]
    fn duplicate_report_reapplies_idempotently() {
        let f = fixture();
        let now = Utc::now();
        f.ingest.receive_status(report("img-3", now)).unwrap();

        let outcome = f.ingest.receive_status(report("img-3", now)).unwrap();
        assert_eq!(outcome, IngestOutcome::Applied);
        assert_eq!(
            f.statuses.get("kitchen").unwrap().current_image.as_deref(),
            Some("img-3")
        );
    }

    #[test]
    fn reordered_delivery_converges_to_newest() {
        let f = fixture();
        let base = Utc::now();
        let stamped =
            |image: &str, offset: i64| report(image, base + Duration::seconds(offset));

        // Delivered out of order: 3, 1, 4, 2
        f.ingest.receive_status(stamped("img-3", 3)).unwrap();
        f.ingest.receive_status(stamped("img-1", 1)).unwrap();
        f.ingest.receive_status(stamped("img-4", 4)).unwrap();
        f.ingest.receive_status(stamped("img-2", 2)).unwrap();

        let status = f.statuses.get("kitchen").unwrap();
        assert_eq!(status.current_image.as_deref(), Some("img-4"));
        assert_eq!(status.last_seen, Some(base + Duration::seconds(4)));
    }

    #[test]
    fn unknown_device_is_rejected_without_side_effects() {
        let f = fixture();
        let mut bad = report("img-1", Utc::now());
        bad.device_id = "garage".into();

        let err = f.ingest.receive_status(bad).unwrap_err();
        assert!(matches!(err, ContractError::UnknownDevice { .. }));
        assert!(f.statuses.get("garage").is_none());
        assert!(f.events.try_recv().is_err());
    }

    #[test]
    fn empty_device_id_is_malformed() {
        let f = fixture();
        let mut bad = report("img-1", Utc::now());
        bad.device_id = String::new();

        let err = f.ingest.receive_status(bad).unwrap_err();
        assert!(matches!(err, ContractError::MalformedPayload { .. }));
    }

    #[test]
    fn omitted_fields_keep_previous_values() {
        let f = fixture();
        let now = Utc::now();
        f.ingest.receive_status(report("img-5", now)).unwrap();

        let heartbeat = StatusReport {
            device_id: "kitchen".into(),
            current_image: None,
            current_image_url: None,
            profile: None,
            timestamp: Some(now + Duration::seconds(5)),
            error: false,
        };
        f.ingest.receive_status(heartbeat).unwrap();

        let status = f.statuses.get("kitchen").unwrap();
        assert_eq!(status.current_image.as_deref(), Some("img-5"));
        assert_eq!(status.last_reported_profile.as_deref(), Some("default"));
        assert_eq!(status.last_seen, Some(now + Duration::seconds(5)));
    }

    #[test]
    fn error_flag_follows_latest_report() {
        let f = fixture();
        let now = Utc::now();
        let mut failing = report("img-6", now);
        failing.error = true;
        f.ingest.receive_status(failing).unwrap();
        assert!(f.statuses.get("kitchen").unwrap().error_flag);

        f.ingest
            .receive_status(report("img-7", now + Duration::seconds(1)))
            .unwrap();
        assert!(!f.statuses.get("kitchen").unwrap().error_flag);
    }
}
