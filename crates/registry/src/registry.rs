//! DeviceRegistry - desired state and its mutation rules
//!
//! All mutations are synchronous and atomic with respect to readers; events
//! are emitted best-effort after the lock is released.

use std::collections::HashMap;
use std::sync::RwLock;

use async_channel::Sender;
use tracing::{debug, warn};

use contracts::{ContractError, CoordinationEvent, Device, DeviceId, HubBlueprint, Profile};

#[derive(Default)]
struct RegistryState {
    devices: HashMap<DeviceId, Device>,
    profiles: HashMap<String, Profile>,
}

/// Source of truth for configured devices and profiles.
pub struct DeviceRegistry {
    state: RwLock<RegistryState>,
    events: Sender<CoordinationEvent>,
}

impl DeviceRegistry {
    /// Create an empty registry emitting onto the given coordination bus.
    pub fn new(events: Sender<CoordinationEvent>) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            events,
        }
    }

    /// Load profiles and devices from a validated blueprint.
    ///
    /// Seeding emits no events; the startup path triggers its own fleet
    /// refresh once everything is wired.
    pub fn seed(&self, blueprint: &HubBlueprint) -> Result<(), ContractError> {
        let mut state = self.state.write().expect("registry lock poisoned");
        for profile in &blueprint.profiles {
            state.profiles.insert(profile.id.clone(), profile.clone());
        }
        for device in &blueprint.devices {
            if !state.profiles.contains_key(&device.profile) {
                return Err(ContractError::UnknownProfile {
                    profile_id: device.profile.clone(),
                });
            }
            state.devices.insert(device.id.clone(), device.clone());
        }
        debug!(
            devices = state.devices.len(),
            profiles = state.profiles.len(),
            "registry seeded"
        );
        Ok(())
    }

    /// Insert or update a device.
    ///
    /// Fails with `UnknownProfile` when the assigned profile does not exist.
    /// Emits `ConfigChanged` when the profile or display settings changed
    /// (or the device is new); an identical re-upsert emits nothing.
    pub fn upsert_device(&self, device: Device) -> Result<Device, ContractError> {
        let event = {
            let mut state = self.state.write().expect("registry lock poisoned");
            if !state.profiles.contains_key(&device.profile) {
                return Err(ContractError::UnknownProfile {
                    profile_id: device.profile.clone(),
                });
            }

            let previous = state.devices.insert(device.id.clone(), device.clone());
            match previous {
                None => Some(CoordinationEvent::ConfigChanged {
                    device_id: device.id.clone(),
                    profile_changed: false,
                }),
                Some(old) if old.profile != device.profile => {
                    Some(CoordinationEvent::ConfigChanged {
                        device_id: device.id.clone(),
                        profile_changed: true,
                    })
                }
                Some(old) if old.display != device.display => {
                    Some(CoordinationEvent::ConfigChanged {
                        device_id: device.id.clone(),
                        profile_changed: false,
                    })
                }
                Some(_) => None,
            }
        };

        if let Some(event) = event {
            self.emit(event);
        }
        Ok(device)
    }

    /// Fetch a device by id.
    pub fn get_device(&self, id: &str) -> Result<Device, ContractError> {
        let state = self.state.read().expect("registry lock poisoned");
        state
            .devices
            .get(id)
            .cloned()
            .ok_or_else(|| ContractError::unknown_device(id))
    }

    /// All configured devices, ordered by id.
    pub fn list_devices(&self) -> Vec<Device> {
        let state = self.state.read().expect("registry lock poisoned");
        let mut devices: Vec<_> = state.devices.values().cloned().collect();
        devices.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        devices
    }

    /// Remove a device. Emits `DeviceRemoved` so observed state and dispatch
    /// workers are torn down by the reconciliation loop.
    pub fn remove_device(&self, id: &str) -> Result<Device, ContractError> {
        let removed = {
            let mut state = self.state.write().expect("registry lock poisoned");
            state
                .devices
                .remove(id)
                .ok_or_else(|| ContractError::unknown_device(id))?
        };
        self.emit(CoordinationEvent::DeviceRemoved {
            device_id: removed.id.clone(),
        });
        Ok(removed)
    }

    /// Assign a different profile to a device.
    ///
    /// No-op (and no event) when the device already runs the profile.
    pub fn set_device_profile(&self, id: &str, profile: &str) -> Result<Device, ContractError> {
        let (device, changed) = {
            let mut state = self.state.write().expect("registry lock poisoned");
            if !state.profiles.contains_key(profile) {
                return Err(ContractError::UnknownProfile {
                    profile_id: profile.to_string(),
                });
            }
            let device = state
                .devices
                .get_mut(id)
                .ok_or_else(|| ContractError::unknown_device(id))?;
            let changed = device.profile != profile;
            device.profile = profile.to_string();
            (device.clone(), changed)
        };

        if changed {
            self.emit(CoordinationEvent::ConfigChanged {
                device_id: device.id.clone(),
                profile_changed: true,
            });
        }
        Ok(device)
    }

    /// Insert or update a profile.
    ///
    /// A content change emits `ConfigChanged` for every device running the
    /// profile, so they pick up the new query on the next refresh.
    pub fn upsert_profile(&self, profile: Profile) -> Profile {
        let affected = {
            let mut state = self.state.write().expect("registry lock poisoned");
            let previous = state.profiles.insert(profile.id.clone(), profile.clone());
            match previous {
                Some(old) if old != profile => state
                    .devices
                    .values()
                    .filter(|device| device.profile == profile.id)
                    .map(|device| device.id.clone())
                    .collect(),
                _ => Vec::new(),
            }
        };

        for device_id in affected {
            self.emit(CoordinationEvent::ConfigChanged {
                device_id,
                profile_changed: false,
            });
        }
        profile
    }

    /// Fetch a profile by id.
    pub fn get_profile(&self, id: &str) -> Result<Profile, ContractError> {
        let state = self.state.read().expect("registry lock poisoned");
        state
            .profiles
            .get(id)
            .cloned()
            .ok_or_else(|| ContractError::UnknownProfile {
                profile_id: id.to_string(),
            })
    }

    /// All configured profiles, ordered by id.
    pub fn list_profiles(&self) -> Vec<Profile> {
        let state = self.state.read().expect("registry lock poisoned");
        let mut profiles: Vec<_> = state.profiles.values().cloned().collect();
        profiles.sort_by(|a, b| a.id.cmp(&b.id));
        profiles
    }

    /// Delete a profile.
    ///
    /// Fails with `ProfileInUse` while any device still references it.
    pub fn delete_profile(&self, id: &str) -> Result<(), ContractError> {
        let mut state = self.state.write().expect("registry lock poisoned");
        if !state.profiles.contains_key(id) {
            return Err(ContractError::UnknownProfile {
                profile_id: id.to_string(),
            });
        }

        let referenced_by: Vec<String> = state
            .devices
            .values()
            .filter(|device| device.profile == id)
            .map(|device| device.id.to_string())
            .collect();
        if !referenced_by.is_empty() {
            return Err(ContractError::ProfileInUse {
                profile_id: id.to_string(),
                referenced_by,
            });
        }

        state.profiles.remove(id);
        Ok(())
    }

    fn emit(&self, event: CoordinationEvent) {
        if let Err(e) = self.events.try_send(event) {
            warn!(error = %e, "coordination event dropped");
        }
    }
}
