//! # Registry
//!
//! Desired-state store for the tablet fleet.
//!
//! Responsibilities:
//! - Own `Device` and `Profile` records (source of truth for desired state)
//! - Enforce the profile referential constraint at mutation time
//! - Emit `ConfigChanged` / `DeviceRemoved` events for the reconciliation loop
//! - Hold the observed `DeviceStatus` records (`StatusStore`), created lazily
//!   and locked per device

mod registry;
mod status_store;

pub use registry::DeviceRegistry;
pub use status_store::StatusStore;
