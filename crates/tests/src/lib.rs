//! # Integration Tests
//!
//! Cross-crate end-to-end tests for the coordination layer:
//! - the full register -> ingest -> liveness -> set_profile scenario
//! - the webhook endpoint over a real TCP listener
//! - the HTTP command transport against a mock tablet server

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::{Duration as ChronoDuration, Utc};

    use contracts::{
        Command, Connectivity, ContractError, Device, DispatchConfig, DisplaySettings,
        ImmichSettings, LivenessConfig, Profile, StatusReport,
    };
    use coordinator::Coordinator;
    use dispatcher::{CommandDispatcher, HubContext, MockTransport};
    use ingestion::{IngestOutcome, StatusIngest};
    use liveness::LivenessTracker;
    use registry::{DeviceRegistry, StatusStore};

    struct Harness {
        registry: Arc<DeviceRegistry>,
        statuses: Arc<StatusStore>,
        tracker: Arc<LivenessTracker>,
        ingest: StatusIngest,
        coordinator: Arc<Coordinator<MockTransport>>,
        transport: Arc<MockTransport>,
    }

    /// Wire the full stack against a mock transport, with the reconciliation
    /// loop running.
    fn harness() -> Harness {
        let (events_tx, events_rx) = async_channel::bounded(64);

        let registry = Arc::new(DeviceRegistry::new(events_tx.clone()));
        registry.upsert_profile(Profile {
            id: "default".into(),
            query: "family".into(),
            exclude_paths: vec![],
        });
        registry.upsert_profile(Profile {
            id: "christmas".into(),
            query: "christmas tree".into(),
            exclude_paths: vec![],
        });

        let statuses = Arc::new(StatusStore::new());
        let tracker = Arc::new(LivenessTracker::new(
            Arc::clone(&statuses),
            LivenessConfig::default(),
            events_tx.clone(),
        ));

        let transport = Arc::new(MockTransport::new());
        let dispatcher = Arc::new(CommandDispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&statuses),
            Arc::clone(&transport),
            DispatchConfig {
                request_timeout_secs: 1,
                max_retries: 0,
                initial_backoff_ms: 10,
                queue_capacity: 4,
            },
            HubContext {
                immich: ImmichSettings {
                    base_url: "http://immich.local".into(),
                    api_key: "secret".into(),
                },
                webhook_url: "http://hub.local/webhook/pf_status_abc".into(),
            },
            tracker.nudge_handle(),
        ));

        let ingest = StatusIngest::new(
            Arc::clone(&registry),
            Arc::clone(&statuses),
            Arc::clone(&tracker),
            events_tx.clone(),
        );

        let coordinator = Arc::new(Coordinator::new(
            Arc::clone(&registry),
            Arc::clone(&statuses),
            dispatcher,
            events_rx,
        ));
        let runner = Arc::clone(&coordinator);
        tokio::spawn(async move { runner.run().await });

        Harness {
            registry,
            statuses,
            tracker,
            ingest,
            coordinator,
            transport,
        }
    }

    fn kitchen() -> Device {
        Device {
            id: "kitchen".into(),
            address: "10.0.0.5:8080".into(),
            profile: "default".into(),
            display: DisplaySettings::default(),
        }
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    /// The full coordination scenario: register, ingest, go offline, switch
    /// profile, observe desired/observed divergence.
    #[tokio::test]
    async fn test_e2e_device_lifecycle() {
        let h = harness();

        // Register kitchen with the default profile
        h.registry.upsert_device(kitchen()).unwrap();
        wait_until(|| !h.transport.calls_for("kitchen").is_empty()).await;

        // Tablet reports img-42 on the default profile
        let reported_at = Utc::now();
        let outcome = h
            .ingest
            .receive_status(StatusReport {
                device_id: "kitchen".into(),
                current_image: Some("img-42".into()),
                current_image_url: None,
                profile: Some("default".into()),
                timestamp: Some(reported_at),
                error: false,
            })
            .unwrap();
        assert_eq!(outcome, IngestOutcome::Applied);

        let view = h.coordinator.device_view("kitchen").unwrap();
        assert_eq!(view.observed.current_image.as_deref(), Some("img-42"));
        assert_eq!(view.observed.connectivity, Connectivity::Online);

        // No report for longer than the timeout window: sweep flips offline
        let transitions = h
            .tracker
            .sweep_once(reported_at + ChronoDuration::seconds(120));
        assert_eq!(transitions, 1);
        let view = h.coordinator.device_view("kitchen").unwrap();
        assert_eq!(view.observed.connectivity, Connectivity::Offline);

        // Switch the desired profile; dispatch happens via the loop
        h.coordinator.set_profile("kitchen", "christmas").unwrap();
        wait_until(|| {
            h.transport.calls_for("kitchen").iter().any(|call| {
                call.command
                    == Command::SetProfile {
                        profile: "christmas".into(),
                    }
            })
        })
        .await;

        // Desired moved; observed profile stays until the tablet confirms
        let view = h.coordinator.device_view("kitchen").unwrap();
        assert_eq!(view.desired.profile, "christmas");
        assert_eq!(view.observed.last_reported_profile.as_deref(), Some("default"));

        // The tablet confirms the new profile on its next report
        h.ingest
            .receive_status(StatusReport {
                device_id: "kitchen".into(),
                current_image: Some("img-43".into()),
                current_image_url: None,
                profile: Some("christmas".into()),
                timestamp: Some(reported_at + ChronoDuration::seconds(130)),
                error: false,
            })
            .unwrap();

        let view = h.coordinator.device_view("kitchen").unwrap();
        assert_eq!(view.observed.last_reported_profile.as_deref(), Some("christmas"));
        assert_eq!(view.observed.connectivity, Connectivity::Online);
    }

    /// Stale and duplicate pushes never move observed state backwards.
    #[tokio::test]
    async fn test_e2e_out_of_order_ingest() {
        let h = harness();
        h.registry.upsert_device(kitchen()).unwrap();

        let base = Utc::now();
        let report = |image: &str, offset: i64| StatusReport {
            device_id: "kitchen".into(),
            current_image: Some(image.into()),
            current_image_url: None,
            profile: Some("default".into()),
            timestamp: Some(base + ChronoDuration::seconds(offset)),
            error: false,
        };

        assert_eq!(
            h.ingest.receive_status(report("img-2", 20)).unwrap(),
            IngestOutcome::Applied
        );
        assert_eq!(
            h.ingest.receive_status(report("img-1", 10)).unwrap(),
            IngestOutcome::Stale
        );
        assert_eq!(
            h.ingest.receive_status(report("img-2", 20)).unwrap(),
            IngestOutcome::Applied
        );

        let status = h.statuses.get("kitchen").unwrap();
        assert_eq!(status.current_image.as_deref(), Some("img-2"));
        assert_eq!(status.last_seen, Some(base + ChronoDuration::seconds(20)));
    }

    /// Removing a device tears down its observed state through the loop.
    #[tokio::test]
    async fn test_e2e_device_removal() {
        let h = harness();
        h.registry.upsert_device(kitchen()).unwrap();
        h.ingest
            .receive_status(StatusReport {
                device_id: "kitchen".into(),
                current_image: Some("img-1".into()),
                current_image_url: None,
                profile: None,
                timestamp: Some(Utc::now()),
                error: false,
            })
            .unwrap();
        assert!(h.statuses.get("kitchen").is_some());

        h.registry.remove_device("kitchen").unwrap();
        wait_until(|| h.statuses.get("kitchen").is_none()).await;

        // Further ingest for the removed id is rejected
        let err = h
            .ingest
            .receive_status(StatusReport {
                device_id: "kitchen".into(),
                current_image: None,
                current_image_url: None,
                profile: None,
                timestamp: None,
                error: false,
            })
            .unwrap_err();
        assert!(matches!(err, ContractError::UnknownDevice { .. }));
    }

    /// Profile deletion is blocked while assigned, allowed afterwards.
    #[tokio::test]
    async fn test_e2e_profile_referential_constraint() {
        let h = harness();
        h.registry.upsert_device(kitchen()).unwrap();

        let err = h.registry.delete_profile("default").unwrap_err();
        assert!(matches!(err, ContractError::ProfileInUse { .. }));

        h.coordinator.set_profile("kitchen", "christmas").unwrap();
        assert!(h.registry.delete_profile("default").is_ok());
    }
}

#[cfg(test)]
mod config_tests {
    use std::sync::Arc;

    use config_loader::{ConfigFormat, ConfigLoader};
    use registry::DeviceRegistry;

    const HUB_TOML: &str = r#"
[hub]
webhook_id = "pf_status_abc"
bind_addr = "127.0.0.1:8750"
base_url = "http://hub.example.net"

[immich]
base_url = "http://immich.local:2283"
api_key = "secret"

[liveness]
offline_after_secs = 120

[[profiles]]
id = "default"
query = "family"
exclude_paths = ["/archive"]

[[profiles]]
id = "christmas"
query = "christmas tree"

[[devices]]
id = "kitchen"
address = "192.168.1.40:8080"
profile = "default"

[devices.display]
interval_seconds = 45
ken_burns = false

[[devices]]
id = "hallway"
address = "192.168.1.41:8080"
profile = "christmas"
"#;

    /// A loaded blueprint seeds the registry as-is.
    #[test]
    fn test_blueprint_seeds_registry() {
        let blueprint = ConfigLoader::load_from_str(HUB_TOML, ConfigFormat::Toml).unwrap();
        assert_eq!(
            blueprint.hub.webhook_url(),
            "http://hub.example.net/webhook/pf_status_abc"
        );
        assert_eq!(blueprint.liveness.offline_after_secs, 120);

        let (events_tx, _events_rx) = async_channel::bounded(8);
        let registry = Arc::new(DeviceRegistry::new(events_tx));
        registry.seed(&blueprint).unwrap();

        assert_eq!(registry.list_devices().len(), 2);
        assert_eq!(registry.list_profiles().len(), 2);

        let kitchen = registry.get_device("kitchen").unwrap();
        assert_eq!(kitchen.profile, "default");
        assert_eq!(kitchen.display.interval_seconds, 45);
        assert!(!kitchen.display.ken_burns);
    }

    /// Seeding does not bypass the referential constraint.
    #[test]
    fn test_seed_rejects_dangling_reference() {
        let mut blueprint = ConfigLoader::load_from_str(HUB_TOML, ConfigFormat::Toml).unwrap();
        blueprint.devices[0].profile = "missing".into();

        let (events_tx, _events_rx) = async_channel::bounded(8);
        let registry = DeviceRegistry::new(events_tx);
        assert!(registry.seed(&blueprint).is_err());
    }
}

#[cfg(test)]
mod webhook_tests {
    use std::sync::Arc;

    use contracts::{Device, DisplaySettings, LivenessConfig, Profile};
    use ingestion::{webhook_router, StatusIngest};
    use liveness::LivenessTracker;
    use registry::{DeviceRegistry, StatusStore};

    struct Server {
        base_url: String,
        statuses: Arc<StatusStore>,
        _events: async_channel::Receiver<contracts::CoordinationEvent>,
    }

    /// Serve the webhook router on an ephemeral port.
    async fn serve() -> Server {
        let (events_tx, events_rx) = async_channel::bounded(64);
        let registry = Arc::new(DeviceRegistry::new(events_tx.clone()));
        registry.upsert_profile(Profile {
            id: "default".into(),
            query: "family".into(),
            exclude_paths: vec![],
        });
        registry
            .upsert_device(Device {
                id: "kitchen".into(),
                address: "10.0.0.5:8080".into(),
                profile: "default".into(),
                display: DisplaySettings::default(),
            })
            .unwrap();

        let statuses = Arc::new(StatusStore::new());
        let tracker = Arc::new(LivenessTracker::new(
            Arc::clone(&statuses),
            LivenessConfig::default(),
            events_tx.clone(),
        ));
        let ingest = Arc::new(StatusIngest::new(
            registry,
            Arc::clone(&statuses),
            tracker,
            events_tx,
        ));

        let app = webhook_router(ingest, "pf_status_abc");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Server {
            base_url: format!("http://{addr}"),
            statuses,
            _events: events_rx,
        }
    }

    #[tokio::test]
    async fn test_webhook_accepts_status_push() {
        let server = serve().await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{}/webhook/pf_status_abc", server.base_url))
            .json(&serde_json::json!({
                "device_id": "kitchen",
                "current_image": "img-42",
                "profile": "default",
                "timestamp": "2024-06-01T12:00:00Z"
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["status"], "ok");

        let status = server.statuses.get("kitchen").unwrap();
        assert_eq!(status.current_image.as_deref(), Some("img-42"));
    }

    #[tokio::test]
    async fn test_webhook_rejects_wrong_webhook_id() {
        let server = serve().await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{}/webhook/other_id", server.base_url))
            .json(&serde_json::json!({"device_id": "kitchen"}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 404);
        assert!(server.statuses.get("kitchen").is_none());
    }

    #[tokio::test]
    async fn test_webhook_rejects_unknown_device() {
        let server = serve().await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{}/webhook/pf_status_abc", server.base_url))
            .json(&serde_json::json!({"device_id": "garage"}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 404);
        assert!(server.statuses.get("garage").is_none());
    }

    #[tokio::test]
    async fn test_webhook_rejects_malformed_body() {
        let server = serve().await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{}/webhook/pf_status_abc", server.base_url))
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 400);

        // A malformed push never crashes the ingest path: a valid one
        // right after is still accepted
        let response = client
            .post(format!("{}/webhook/pf_status_abc", server.base_url))
            .json(&serde_json::json!({"device_id": "kitchen", "current_image": "img-1"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }
}

#[cfg(test)]
mod transport_tests {
    use std::sync::{Arc, Mutex};

    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use tokio::sync::Notify;

    use contracts::{
        Command, Connectivity, ContractError, Device, DeviceConfig, DispatchConfig,
        DisplaySettings, ImmichSettings, Profile,
    };
    use dispatcher::{CommandDispatcher, HttpTransport, HubContext};
    use registry::{DeviceRegistry, StatusStore};

    /// Mock tablet: accepts /next and /set_profile, records /configure bodies.
    async fn serve_tablet() -> (String, Arc<Mutex<Vec<DeviceConfig>>>) {
        let received: Arc<Mutex<Vec<DeviceConfig>>> = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&received);

        let app = Router::new()
            .route("/next", post(|| async { StatusCode::OK }))
            .route(
                "/configure",
                post(move |Json(config): Json<DeviceConfig>| {
                    let captured = Arc::clone(&captured);
                    async move {
                        captured.lock().unwrap().push(config);
                        StatusCode::OK
                    }
                }),
            )
            .route(
                "/set_profile",
                post(|Json(_body): Json<serde_json::Value>| async { StatusCode::OK }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (addr.to_string(), received)
    }

    fn dispatcher_for(
        address: &str,
    ) -> (Arc<CommandDispatcher<HttpTransport>>, Arc<StatusStore>) {
        let (events_tx, _events_rx) = async_channel::bounded::<contracts::CoordinationEvent>(64);
        let registry = Arc::new(DeviceRegistry::new(events_tx));
        registry.upsert_profile(Profile {
            id: "default".into(),
            query: "family".into(),
            exclude_paths: vec!["/archive".into()],
        });
        registry
            .upsert_device(Device {
                id: "kitchen".into(),
                address: address.to_string(),
                profile: "default".into(),
                display: DisplaySettings::default(),
            })
            .unwrap();

        let statuses = Arc::new(StatusStore::new());
        let dispatcher = Arc::new(CommandDispatcher::new(
            registry,
            Arc::clone(&statuses),
            Arc::new(HttpTransport::new()),
            DispatchConfig {
                request_timeout_secs: 2,
                max_retries: 0,
                initial_backoff_ms: 10,
                queue_capacity: 2,
            },
            HubContext {
                immich: ImmichSettings {
                    base_url: "http://immich.local".into(),
                    api_key: "secret".into(),
                },
                webhook_url: "http://hub.local/webhook/pf_status_abc".into(),
            },
            Arc::new(Notify::new()),
        ));
        (dispatcher, statuses)
    }

    #[tokio::test]
    async fn test_http_transport_next_image() {
        let (address, _received) = serve_tablet().await;
        let (dispatcher, _statuses) = dispatcher_for(&address);

        dispatcher
            .dispatch("kitchen", Command::NextImage)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_http_transport_pushes_config() {
        let (address, received) = serve_tablet().await;
        let (dispatcher, _statuses) = dispatcher_for(&address);

        dispatcher
            .dispatch("kitchen", Command::RefreshConfig)
            .await
            .unwrap();

        let configs = received.lock().unwrap();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].device_id, "kitchen");
        assert_eq!(configs[0].profile.name, "default");
        assert_eq!(configs[0].immich.base_url, "http://immich.local");
        assert_eq!(
            configs[0].webhook_url,
            "http://hub.local/webhook/pf_status_abc"
        );
    }

    #[tokio::test]
    async fn test_http_transport_set_profile() {
        let (address, _received) = serve_tablet().await;
        let (dispatcher, _statuses) = dispatcher_for(&address);

        dispatcher
            .dispatch(
                "kitchen",
                Command::SetProfile {
                    profile: "christmas".into(),
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_device_surfaces_error_without_flipping_connectivity() {
        // Nothing listens on this port
        let (dispatcher, statuses) = dispatcher_for("127.0.0.1:9");

        let err = dispatcher
            .dispatch("kitchen", Command::NextImage)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ContractError::Unreachable { .. } | ContractError::Timeout { .. }
        ));

        // Dispatch failure must not write connectivity
        let status = statuses.get("kitchen").unwrap();
        assert_eq!(status.connectivity, Connectivity::Unknown);
    }
}
