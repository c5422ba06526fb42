//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## State Model
//! - Desired state (`Device`, `Profile`) is owned by the registry
//! - Observed state (`DeviceStatus`) is reported by tablets and never written by callers directly
//! - `last_seen` uses the tablet-reported timestamp (UTC), falling back to receive time

mod blueprint;
mod command;
mod device;
mod device_id;
mod error;
mod event;
mod status;
mod transport;

pub use blueprint::*;
pub use command::*;
pub use device::*;
pub use device_id::DeviceId;
pub use error::*;
pub use event::CoordinationEvent;
pub use status::*;
pub use transport::{CommandTransport, LocalCommandTransport};
