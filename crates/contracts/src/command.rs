//! Outbound command model
//!
//! One endpoint per command on the tablet's control port. `RefreshConfig`
//! carries the full assembled `DeviceConfig`; `SetProfile` carries only the
//! target profile id.

use serde::{Deserialize, Serialize};

use crate::{Device, DeviceId, DisplaySettings, Profile};

/// Imperative command for one tablet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Advance the slideshow by one image
    NextImage,

    /// Push the current assembled configuration
    RefreshConfig,

    /// Switch the tablet to another profile
    SetProfile { profile: String },
}

impl Command {
    /// Path segment of the tablet control endpoint for this command.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::NextImage => "next",
            Self::RefreshConfig => "configure",
            Self::SetProfile { .. } => "set_profile",
        }
    }

    /// Stable command name for logs and metrics labels.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NextImage => "next_image",
            Self::RefreshConfig => "refresh_config",
            Self::SetProfile { .. } => "set_profile",
        }
    }
}

/// Photo backend credentials, passed through opaquely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImmichSettings {
    #[serde(default)]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,
}

/// Profile section of the pushed configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileConfig {
    pub name: String,
    pub query: String,
    pub exclude_paths: Vec<String>,
}

/// Full configuration payload pushed on `RefreshConfig`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub device_id: DeviceId,
    pub immich: ImmichSettings,
    pub display: DisplaySettings,
    pub profile: ProfileConfig,

    /// Where the tablet should push its status reports
    pub webhook_url: String,
}

impl DeviceConfig {
    /// Assemble the push payload from registry state.
    pub fn assemble(
        device: &Device,
        profile: &Profile,
        immich: &ImmichSettings,
        webhook_url: impl Into<String>,
    ) -> Self {
        Self {
            device_id: device.id.clone(),
            immich: immich.clone(),
            display: device.display.clone(),
            profile: ProfileConfig {
                name: profile.id.clone(),
                query: profile.query.clone(),
                exclude_paths: profile.exclude_paths.clone(),
            },
            webhook_url: webhook_url.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_endpoints() {
        assert_eq!(Command::NextImage.endpoint(), "next");
        assert_eq!(Command::RefreshConfig.endpoint(), "configure");
        assert_eq!(
            Command::SetProfile {
                profile: "christmas".into()
            }
            .endpoint(),
            "set_profile"
        );
    }

    #[test]
    fn set_profile_wire_body() {
        let command = Command::SetProfile {
            profile: "christmas".into(),
        };
        let json = serde_json::to_value(&command).unwrap();
        assert_eq!(json["command"], "set_profile");
        assert_eq!(json["profile"], "christmas");
    }

    #[test]
    fn assemble_device_config() {
        let device = Device {
            id: "kitchen".into(),
            address: "192.168.1.40:8080".into(),
            profile: "default".into(),
            display: DisplaySettings::default(),
        };
        let profile = Profile {
            id: "default".into(),
            query: "family".into(),
            exclude_paths: vec!["/archive".into()],
        };
        let immich = ImmichSettings {
            base_url: "http://immich.local".into(),
            api_key: "secret".into(),
        };

        let config =
            DeviceConfig::assemble(&device, &profile, &immich, "http://hub.local/webhook/abc");

        assert_eq!(config.device_id, "kitchen");
        assert_eq!(config.profile.name, "default");
        assert_eq!(config.profile.query, "family");
        assert_eq!(config.immich.api_key, "secret");
        assert_eq!(config.webhook_url, "http://hub.local/webhook/abc");
    }
}
