//! CommandTransport trait - outbound command channel abstraction
//!
//! Decouples the dispatcher from the concrete wire protocol so tests can
//! substitute an in-memory transport.

use crate::{Command, ContractError, DeviceConfig, DeviceId};

/// Outbound command channel to one tablet address.
///
/// A single send is one idempotent request; retries and timeouts are the
/// dispatcher's responsibility, not the transport's.
#[trait_variant::make(CommandTransport: Send)]
pub trait LocalCommandTransport {
    /// Deliver `command` to the control endpoint at `address`.
    ///
    /// `config` is present only for `RefreshConfig`; `device_id` is carried
    /// for error context and logging.
    ///
    /// # Errors
    /// Returns `Unreachable` when the endpoint cannot be reached or rejects
    /// the request.
    async fn send(
        &self,
        device_id: &DeviceId,
        address: &str,
        command: &Command,
        config: Option<&DeviceConfig>,
    ) -> Result<(), ContractError>;
}
