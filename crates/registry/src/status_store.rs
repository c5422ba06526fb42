//! StatusStore - observed DeviceStatus records with per-device locking
//!
//! The map lock is held only to look up or insert an entry; all field
//! updates go through the per-device mutex so ingest and the liveness sweep
//! never contend globally.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use contracts::{DeviceId, DeviceStatus};

/// Shared store of observed per-device state.
///
/// Entries are created lazily on first ingest or first dispatch attempt and
/// removed together with the device.
#[derive(Default)]
pub struct StatusStore {
    inner: RwLock<HashMap<DeviceId, Arc<Mutex<DeviceStatus>>>>,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the entry for a device, creating a fresh record if needed.
    pub fn ensure(&self, device_id: &DeviceId) -> Arc<Mutex<DeviceStatus>> {
        if let Some(entry) = self.entry(device_id) {
            return entry;
        }
        let mut inner = self.inner.write().expect("status store lock poisoned");
        inner
            .entry(device_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(DeviceStatus::new(device_id.clone()))))
            .clone()
    }

    /// Existing entry for a device, if any.
    pub fn entry(&self, device_id: &str) -> Option<Arc<Mutex<DeviceStatus>>> {
        let inner = self.inner.read().expect("status store lock poisoned");
        inner.get(device_id).cloned()
    }

    /// Snapshot of one device's status.
    pub fn get(&self, device_id: &str) -> Option<DeviceStatus> {
        self.entry(device_id)
            .map(|entry| entry.lock().expect("status entry lock poisoned").clone())
    }

    /// Remove a device's record (on device removal).
    pub fn remove(&self, device_id: &str) {
        let mut inner = self.inner.write().expect("status store lock poisoned");
        inner.remove(device_id);
    }

    /// All entries, for the liveness sweep. The map lock is released before
    /// the caller touches any per-device mutex.
    pub fn entries(&self) -> Vec<(DeviceId, Arc<Mutex<DeviceStatus>>)> {
        let inner = self.inner.read().expect("status store lock poisoned");
        inner
            .iter()
            .map(|(id, entry)| (id.clone(), entry.clone()))
            .collect()
    }

    /// Snapshot of all statuses, ordered by device id.
    pub fn snapshot(&self) -> Vec<DeviceStatus> {
        let mut statuses: Vec<_> = self
            .entries()
            .into_iter()
            .map(|(_, entry)| entry.lock().expect("status entry lock poisoned").clone())
            .collect();
        statuses.sort_by(|a, b| a.device_id.as_str().cmp(b.device_id.as_str()));
        statuses
    }
}
