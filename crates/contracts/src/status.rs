//! Observed state: status reports and per-device connectivity
//!
//! `DeviceStatus` is the hub's record of what a tablet last reported.
//! `connectivity` is written only by the liveness tracker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Device, DeviceId};

/// Connectivity state derived from ingest recency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    /// No report seen yet since the record was created
    #[default]
    Unknown,
    Online,
    Offline,
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Online => write!(f, "online"),
            Self::Offline => write!(f, "offline"),
        }
    }
}

/// Last observed state of one device.
///
/// Created lazily on first ingest or first dispatch attempt; removed together
/// with the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub device_id: DeviceId,

    /// Identifier of the image currently on screen (opaque)
    pub current_image: Option<String>,

    /// Direct URL of the current image, if the tablet reports one
    pub current_image_url: Option<String>,

    /// Profile the tablet last confirmed it is running.
    ///
    /// May lag behind the registry's assigned profile until the next report.
    pub last_reported_profile: Option<String>,

    /// Timestamp of the newest accepted report
    pub last_seen: Option<DateTime<Utc>>,

    pub connectivity: Connectivity,

    /// Tablet flagged an error in its last report
    pub error_flag: bool,
}

impl DeviceStatus {
    /// Fresh record with nothing observed yet.
    pub fn new(device_id: DeviceId) -> Self {
        Self {
            device_id,
            current_image: None,
            current_image_url: None,
            last_reported_profile: None,
            last_seen: None,
            connectivity: Connectivity::Unknown,
            error_flag: false,
        }
    }
}

/// Inbound webhook payload pushed by a tablet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub device_id: String,

    #[serde(default)]
    pub current_image: Option<String>,

    #[serde(default)]
    pub current_image_url: Option<String>,

    #[serde(default)]
    pub profile: Option<String>,

    /// Tablet-side timestamp of the report; receive time is used when absent
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(default)]
    pub error: bool,
}

/// Unified desired + observed view of one device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceView {
    pub desired: Device,
    pub observed: DeviceStatus,
}
