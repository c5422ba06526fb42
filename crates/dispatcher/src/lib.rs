//! # Dispatcher
//!
//! Outbound command path: resolves a device's address, serializes commands
//! per device through a dedicated worker, and delivers them over a
//! `CommandTransport` with bounded timeout and retry.
//!
//! A failed dispatch is surfaced to the caller and may nudge the liveness
//! sweep; it never writes connectivity itself.

mod dispatcher;
mod handle;
mod http;
mod metrics;
mod mock;

pub use dispatcher::{CommandDispatcher, HubContext};
pub use handle::{DeviceHandle, DispatchJob};
pub use http::HttpTransport;
pub use metrics::{DispatchMetrics, DispatchSnapshot};
pub use mock::{MockCall, MockTransport};
