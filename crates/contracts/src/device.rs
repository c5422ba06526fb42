//! Desired state: devices and filter profiles
//!
//! These records are owned by the registry; tablets never write them.

use serde::{Deserialize, Serialize};

use crate::DeviceId;

/// One configured tablet endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Unique, user-assigned id (e.g. "kitchen")
    pub id: DeviceId,

    /// Network address of the tablet control endpoint (host:port)
    pub address: String,

    /// Assigned filter profile id; must reference an existing profile
    pub profile: String,

    /// Display settings pushed with every config refresh
    #[serde(default)]
    pub display: DisplaySettings,
}

/// Slideshow display settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplaySettings {
    /// Show the clock overlay
    #[serde(default = "default_clock")]
    pub clock: bool,

    /// Clock rendering format
    #[serde(default)]
    pub clock_format: ClockFormat,

    /// Seconds each image stays on screen, >= 1
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u32,

    /// Enable the Ken Burns pan/zoom effect
    #[serde(default = "default_ken_burns")]
    pub ken_burns: bool,

    /// Pan speed for the Ken Burns effect, 0.0..=1.0
    #[serde(default = "default_pan_speed")]
    pub pan_speed: f64,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            clock: default_clock(),
            clock_format: ClockFormat::default(),
            interval_seconds: default_interval_seconds(),
            ken_burns: default_ken_burns(),
            pan_speed: default_pan_speed(),
        }
    }
}

fn default_clock() -> bool {
    true
}

fn default_interval_seconds() -> u32 {
    30
}

fn default_ken_burns() -> bool {
    true
}

fn default_pan_speed() -> f64 {
    0.5
}

/// Clock rendering format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClockFormat {
    #[default]
    #[serde(rename = "24h")]
    TwentyFourHour,
    #[serde(rename = "12h")]
    TwelveHour,
}

/// Named filter configuration for photo selection.
///
/// The query string is opaque to the hub; only the tablet's photo backend
/// interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Unique profile id
    pub id: String,

    /// Opaque search query forwarded to the tablet
    #[serde(default)]
    pub query: String,

    /// Path prefixes excluded from selection
    #[serde(default)]
    pub exclude_paths: Vec<String>,
}
