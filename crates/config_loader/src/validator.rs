//! Configuration validation
//!
//! Rules:
//! - webhook_id non-empty
//! - profile ids unique
//! - device ids unique, addresses non-empty
//! - every device profile reference resolves
//! - interval_seconds >= 1, pan_speed in 0.0..=1.0
//! - liveness/dispatch timers non-zero

use std::collections::HashSet;

use contracts::{ContractError, HubBlueprint};

/// Validate a HubBlueprint configuration
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &HubBlueprint) -> Result<(), ContractError> {
    validate_hub(blueprint)?;
    validate_profiles(blueprint)?;
    validate_devices(blueprint)?;
    validate_timers(blueprint)?;
    Ok(())
}

fn validate_hub(blueprint: &HubBlueprint) -> Result<(), ContractError> {
    if blueprint.hub.webhook_id.is_empty() {
        return Err(ContractError::config_validation(
            "hub.webhook_id",
            "webhook_id cannot be empty",
        ));
    }
    Ok(())
}

/// Validate profile id uniqueness
fn validate_profiles(blueprint: &HubBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for profile in &blueprint.profiles {
        if profile.id.is_empty() {
            return Err(ContractError::config_validation(
                "profiles[].id",
                "profile id cannot be empty",
            ));
        }
        if !seen.insert(&profile.id) {
            return Err(ContractError::config_validation(
                format!("profiles[id={}]", profile.id),
                "duplicate profile id",
            ));
        }
    }
    Ok(())
}

/// Validate devices: unique ids, addresses, profile references, display ranges
fn validate_devices(blueprint: &HubBlueprint) -> Result<(), ContractError> {
    let profile_ids: HashSet<_> = blueprint.profiles.iter().map(|p| p.id.as_str()).collect();

    let mut seen = HashSet::new();
    for device in &blueprint.devices {
        if device.id.as_str().is_empty() {
            return Err(ContractError::config_validation(
                "devices[].id",
                "device id cannot be empty",
            ));
        }
        if !seen.insert(device.id.as_str()) {
            return Err(ContractError::config_validation(
                format!("devices[id={}]", device.id),
                "duplicate device id",
            ));
        }
        if device.address.is_empty() {
            return Err(ContractError::config_validation(
                format!("devices[{}].address", device.id),
                "address cannot be empty",
            ));
        }
        if !profile_ids.contains(device.profile.as_str()) {
            return Err(ContractError::config_validation(
                format!("devices[{}].profile", device.id),
                format!("profile '{}' not found in [[profiles]]", device.profile),
            ));
        }
        if device.display.interval_seconds == 0 {
            return Err(ContractError::config_validation(
                format!("devices[{}].display.interval_seconds", device.id),
                "interval_seconds must be >= 1",
            ));
        }
        if !(0.0..=1.0).contains(&device.display.pan_speed) {
            return Err(ContractError::config_validation(
                format!("devices[{}].display.pan_speed", device.id),
                format!(
                    "pan_speed must be within 0.0..=1.0, got {}",
                    device.display.pan_speed
                ),
            ));
        }
    }
    Ok(())
}

/// Validate liveness/dispatch timer sanity
fn validate_timers(blueprint: &HubBlueprint) -> Result<(), ContractError> {
    if blueprint.liveness.offline_after_secs == 0 {
        return Err(ContractError::config_validation(
            "liveness.offline_after_secs",
            "offline_after_secs must be > 0",
        ));
    }
    if blueprint.liveness.sweep_interval_secs == 0 {
        return Err(ContractError::config_validation(
            "liveness.sweep_interval_secs",
            "sweep_interval_secs must be > 0",
        ));
    }
    if blueprint.dispatch.request_timeout_secs == 0 {
        return Err(ContractError::config_validation(
            "dispatch.request_timeout_secs",
            "request_timeout_secs must be > 0",
        ));
    }
    if blueprint.dispatch.queue_capacity == 0 {
        return Err(ContractError::config_validation(
            "dispatch.queue_capacity",
            "queue_capacity must be >= 1",
        ));
    }
    Ok(())
}
