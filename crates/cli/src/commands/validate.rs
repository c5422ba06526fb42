//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    webhook_id: String,
    profile_count: usize,
    device_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    webhook_id: blueprint.hub.webhook_id.clone(),
                    profile_count: blueprint.profiles.len(),
                    device_count: blueprint.devices.len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

fn collect_warnings(blueprint: &contracts::HubBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.devices.is_empty() {
        warnings.push("No devices configured - the hub will coordinate nothing".to_string());
    }
    if blueprint.immich.base_url.is_empty() {
        warnings.push("immich.base_url is empty - tablets get no photo source".to_string());
    }
    if blueprint.immich.api_key.is_empty() {
        warnings.push("immich.api_key is empty - tablets may fail to authenticate".to_string());
    }
    if blueprint.hub.base_url.is_none() {
        warnings.push(
            "hub.base_url not set - webhook URL falls back to the bind address".to_string(),
        );
    }
    for profile in &blueprint.profiles {
        if !blueprint.devices.iter().any(|d| d.profile == profile.id) {
            warnings.push(format!("Profile '{}' is not used by any device", profile.id));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("Configuration is valid: {}", result.config_path);
        if let Some(summary) = &result.summary {
            println!("  Webhook id: {}", summary.webhook_id);
            println!("  Profiles: {}", summary.profile_count);
            println!("  Devices: {}", summary.device_count);
        }
        if let Some(warnings) = &result.warnings {
            println!("\nWarnings:");
            for warning in warnings {
                println!("  ! {}", warning);
            }
        }
    } else {
        println!("Configuration is INVALID: {}", result.config_path);
        if let Some(error) = &result.error {
            println!("  Error: {}", error);
        }
    }
}
