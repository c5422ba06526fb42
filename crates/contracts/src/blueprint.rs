//! HubBlueprint - Config Loader output
//!
//! Describes the full hub configuration: webhook identity, photo backend
//! pass-through, liveness and dispatch tuning, profiles and devices.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{Device, ImmichSettings, Profile};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Full hub configuration blueprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Hub identity and listen settings
    pub hub: HubConfig,

    /// Photo backend credentials, passed through to tablets
    #[serde(default)]
    pub immich: ImmichSettings,

    /// Liveness tracker tuning
    #[serde(default)]
    pub liveness: LivenessConfig,

    /// Command dispatch tuning
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Configured filter profiles
    #[serde(default)]
    pub profiles: Vec<Profile>,

    /// Configured tablet devices
    #[serde(default)]
    pub devices: Vec<Device>,
}

/// Hub identity: webhook id, listen address, advertised base URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// Per-installation webhook identifier; part of the inbound URL
    pub webhook_id: String,

    /// Address the hub listens on
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Externally reachable base URL advertised to tablets.
    ///
    /// Falls back to `http://{bind_addr}` when unset.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl HubConfig {
    /// Full status webhook URL advertised in pushed configs.
    pub fn webhook_url(&self) -> String {
        let base = match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}", self.bind_addr),
        };
        format!("{}/webhook/{}", base, self.webhook_id)
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:8750".to_string()
}

/// Liveness tracker tuning
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LivenessConfig {
    /// A device with no accepted report for this long is marked offline
    #[serde(default = "default_offline_after_secs")]
    pub offline_after_secs: u64,

    /// Interval between periodic sweeps
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            offline_after_secs: default_offline_after_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl LivenessConfig {
    pub fn offline_after(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.offline_after_secs as i64)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

fn default_offline_after_secs() -> u64 {
    90
}

fn default_sweep_interval_secs() -> u64 {
    30
}

/// Command dispatch tuning
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Per-attempt timeout for one command call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Retries after the first failed attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First backoff delay; doubles per retry
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Dispatch jobs that may wait per device before `Busy`
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl DispatchConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Backoff before retry `attempt` (0-based), doubling each time.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.initial_backoff_ms.saturating_mul(1 << attempt.min(16)))
    }
}

fn default_request_timeout_secs() -> u64 {
    5
}

fn default_max_retries() -> u32 {
    2
}

fn default_initial_backoff_ms() -> u64 {
    1000
}

fn default_queue_capacity() -> usize {
    1
}

impl HubBlueprint {
    /// Look up a configured device by id.
    pub fn device(&self, id: &str) -> Option<&Device> {
        self.devices.iter().find(|device| device.id == id)
    }

    /// Look up a configured profile by id.
    pub fn profile(&self, id: &str) -> Option<&Profile> {
        self.profiles.iter().find(|profile| profile.id == id)
    }
}
