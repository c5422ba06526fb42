//! Hub assembly - wires all components and serves the HTTP surface.
//!
//! Construction order: coordination bus, registry (seeded from the
//! blueprint), status store, liveness tracker, dispatcher, ingest,
//! coordinator. All instances are built once here and passed by reference;
//! nothing is pulled from ambient global state.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use contracts::HubBlueprint;
use coordinator::Coordinator;
use dispatcher::{CommandDispatcher, HttpTransport, HubContext};
use ingestion::{webhook_router, StatusIngest};
use liveness::LivenessTracker;
use registry::{DeviceRegistry, StatusStore};

use crate::server::admin_router;

/// Runtime options for one hub instance
pub struct HubOptions {
    /// The loaded blueprint configuration
    pub blueprint: HubBlueprint,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,

    /// Push configuration to the whole fleet after startup
    pub startup_refresh: bool,

    /// Delay between per-device refreshes during a fleet refresh
    pub refresh_stagger: Duration,
}

/// The assembled coordination hub
pub struct Hub {
    options: HubOptions,
}

impl Hub {
    /// Create a new hub with the given options
    pub fn new(options: HubOptions) -> Self {
        Self { options }
    }

    /// Run the hub until the server fails or the process is stopped
    pub async fn run(self) -> Result<()> {
        let HubOptions {
            blueprint,
            metrics_port,
            startup_refresh,
            refresh_stagger,
        } = self.options;

        // Initialize Metrics (optional)
        if let Some(port) = metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Coordination bus: registry, ingest and liveness produce,
        // the coordinator consumes
        let (events_tx, events_rx) = async_channel::bounded(256);

        let registry = Arc::new(DeviceRegistry::new(events_tx.clone()));
        registry
            .seed(&blueprint)
            .context("Failed to seed registry from blueprint")?;

        let statuses = Arc::new(StatusStore::new());
        let tracker = Arc::new(LivenessTracker::new(
            Arc::clone(&statuses),
            blueprint.liveness,
            events_tx.clone(),
        ));

        let transport = Arc::new(HttpTransport::new());
        let dispatcher = Arc::new(CommandDispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&statuses),
            transport,
            blueprint.dispatch,
            HubContext {
                immich: blueprint.immich.clone(),
                webhook_url: blueprint.hub.webhook_url(),
            },
            tracker.nudge_handle(),
        ));

        let ingest = Arc::new(StatusIngest::new(
            Arc::clone(&registry),
            Arc::clone(&statuses),
            Arc::clone(&tracker),
            events_tx.clone(),
        ));

        let coordinator = Arc::new(Coordinator::new(
            Arc::clone(&registry),
            Arc::clone(&statuses),
            Arc::clone(&dispatcher),
            events_rx,
        ));

        // Background loops
        let sweep = tokio::spawn({
            let tracker = Arc::clone(&tracker);
            async move { tracker.run().await }
        });
        let reconcile = tokio::spawn({
            let coordinator = Arc::clone(&coordinator);
            async move { coordinator.run().await }
        });

        // HTTP surface: status webhook + admin API
        let app = webhook_router(ingest, &blueprint.hub.webhook_id)
            .merge(admin_router(Arc::clone(&coordinator)));

        let listener = tokio::net::TcpListener::bind(&blueprint.hub.bind_addr)
            .await
            .with_context(|| format!("Failed to bind {}", blueprint.hub.bind_addr))?;
        info!(
            addr = %listener.local_addr()?,
            webhook_id = %blueprint.hub.webhook_id,
            devices = registry.list_devices().len(),
            "Hub listening"
        );

        if startup_refresh {
            let touched = coordinator.refresh_fleet(refresh_stagger).await;
            info!(devices = touched, "Startup fleet refresh scheduled");
        }

        let result = axum::serve(listener, app).await;

        // Serve only returns on error; tear the loops down anyway
        sweep.abort();
        reconcile.abort();
        dispatcher.shutdown().await;

        result.context("Hub server failed")
    }
}
