//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    hub: HubInfo,
    liveness: LivenessInfo,
    dispatch: DispatchInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    profiles: Vec<ProfileInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    devices: Vec<DeviceInfo>,
}

#[derive(Serialize)]
struct HubInfo {
    webhook_id: String,
    bind_addr: String,
    webhook_url: String,
}

#[derive(Serialize)]
struct LivenessInfo {
    offline_after_secs: u64,
    sweep_interval_secs: u64,
}

#[derive(Serialize)]
struct DispatchInfo {
    request_timeout_secs: u64,
    max_retries: u32,
    initial_backoff_ms: u64,
    queue_capacity: usize,
}

#[derive(Serialize)]
struct ProfileInfo {
    id: String,
    query: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    exclude_paths: Vec<String>,
}

#[derive(Serialize)]
struct DeviceInfo {
    id: String,
    address: String,
    profile: String,
    interval_seconds: u32,
    clock: bool,
    ken_burns: bool,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Reading configuration");

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let config_info = build_info(&blueprint);

    if args.json {
        let json =
            serde_json::to_string_pretty(&config_info).context("Failed to serialize info")?;
        println!("{}", json);
        return Ok(());
    }

    println!("Hub configuration ({})", args.config.display());
    println!("  Webhook URL: {}", config_info.hub.webhook_url);
    println!("  Listen: {}", config_info.hub.bind_addr);
    println!(
        "  Liveness: offline after {}s, sweep every {}s",
        config_info.liveness.offline_after_secs, config_info.liveness.sweep_interval_secs
    );
    println!(
        "  Dispatch: {}s timeout, {} retries",
        config_info.dispatch.request_timeout_secs, config_info.dispatch.max_retries
    );

    if args.profiles || !args.devices {
        println!("\nProfiles ({}):", config_info.profiles.len());
        for profile in &config_info.profiles {
            println!("  - {} (query: {:?})", profile.id, profile.query);
            for path in &profile.exclude_paths {
                println!("      excludes {}", path);
            }
        }
    }

    if args.devices || !args.profiles {
        println!("\nDevices ({}):", config_info.devices.len());
        for device in &config_info.devices {
            println!(
                "  - {} at {} -> '{}' ({}s interval, clock {}, ken burns {})",
                device.id,
                device.address,
                device.profile,
                device.interval_seconds,
                on_off(device.clock),
                on_off(device.ken_burns),
            );
        }
    }

    Ok(())
}

fn build_info(blueprint: &contracts::HubBlueprint) -> ConfigInfo {
    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        hub: HubInfo {
            webhook_id: blueprint.hub.webhook_id.clone(),
            bind_addr: blueprint.hub.bind_addr.clone(),
            webhook_url: blueprint.hub.webhook_url(),
        },
        liveness: LivenessInfo {
            offline_after_secs: blueprint.liveness.offline_after_secs,
            sweep_interval_secs: blueprint.liveness.sweep_interval_secs,
        },
        dispatch: DispatchInfo {
            request_timeout_secs: blueprint.dispatch.request_timeout_secs,
            max_retries: blueprint.dispatch.max_retries,
            initial_backoff_ms: blueprint.dispatch.initial_backoff_ms,
            queue_capacity: blueprint.dispatch.queue_capacity,
        },
        profiles: blueprint
            .profiles
            .iter()
            .map(|profile| ProfileInfo {
                id: profile.id.clone(),
                query: profile.query.clone(),
                exclude_paths: profile.exclude_paths.clone(),
            })
            .collect(),
        devices: blueprint
            .devices
            .iter()
            .map(|device| DeviceInfo {
                id: device.id.to_string(),
                address: device.address.clone(),
                profile: device.profile.clone(),
                interval_seconds: device.display.interval_seconds,
                clock: device.display.clock,
                ken_burns: device.display.ken_burns,
            })
            .collect(),
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}
