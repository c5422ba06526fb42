//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::hub::{Hub, HubOptions};

/// Execute the `run` command
pub async fn run_hub(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    // Validate config path
    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    // Load and parse configuration
    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(ref bind) = args.bind {
        info!(bind = %bind, "Overriding listen address from CLI");
        blueprint.hub.bind_addr = bind.clone();
    }

    info!(
        webhook_id = %blueprint.hub.webhook_id,
        bind = %blueprint.hub.bind_addr,
        devices = blueprint.devices.len(),
        profiles = blueprint.profiles.len(),
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    // Build hub options
    let hub = Hub::new(HubOptions {
        blueprint,
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
        startup_refresh: !args.no_startup_refresh,
        refresh_stagger: Duration::from_secs(args.refresh_stagger),
    });

    // Setup graceful shutdown handler
    let shutdown_signal = setup_shutdown_signal();

    info!("Starting hub...");

    // Run hub with shutdown signal
    tokio::select! {
        result = hub.run() => {
            result.context("Hub execution failed")?;
        }
        _ = shutdown_signal => {
            warn!("Received shutdown signal, stopping hub...");
        }
    }

    info!("PhotoDream Hub finished");
    Ok(())
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &contracts::HubBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Hub:");
    println!("  Webhook URL: {}", blueprint.hub.webhook_url());
    println!("  Listen: {}", blueprint.hub.bind_addr);

    println!("\nProfiles ({}):", blueprint.profiles.len());
    for profile in &blueprint.profiles {
        println!(
            "  - {} (query: {:?}, {} exclusions)",
            profile.id,
            profile.query,
            profile.exclude_paths.len()
        );
    }

    println!("\nDevices ({}):", blueprint.devices.len());
    for device in &blueprint.devices {
        println!(
            "  - {} at {} -> profile '{}'",
            device.id, device.address, device.profile
        );
    }

    println!(
        "\nLiveness: offline after {}s, sweep every {}s",
        blueprint.liveness.offline_after_secs, blueprint.liveness.sweep_interval_secs
    );
    println!(
        "Dispatch: {}s timeout, {} retries, backoff {}ms",
        blueprint.dispatch.request_timeout_secs,
        blueprint.dispatch.max_retries,
        blueprint.dispatch.initial_backoff_ms
    );
    println!();
}
