//! Coordination events flowing from the state-owning components to the
//! reconciliation loop.

use crate::{Connectivity, DeviceId};

/// Event published on the shared coordination bus.
///
/// Producers emit best-effort (non-blocking); the reconciliation loop is the
/// single consumer and can always recover by re-reading the stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinationEvent {
    /// Desired state changed in the registry
    ConfigChanged {
        device_id: DeviceId,
        /// True when the assigned profile id changed (not just display settings)
        profile_changed: bool,
    },

    /// A status report was accepted for the device
    StatusUpdated { device_id: DeviceId },

    /// The liveness tracker transitioned the device
    ConnectivityChanged {
        device_id: DeviceId,
        connectivity: Connectivity,
    },

    /// The device was removed from the registry
    DeviceRemoved { device_id: DeviceId },
}

impl CoordinationEvent {
    /// Device the event refers to.
    pub fn device_id(&self) -> &DeviceId {
        match self {
            Self::ConfigChanged { device_id, .. }
            | Self::StatusUpdated { device_id }
            | Self::ConnectivityChanged { device_id, .. }
            | Self::DeviceRemoved { device_id } => device_id,
        }
    }
}
