//! Mock command transport
//!
//! In-memory transport for tests without tablets on the network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Semaphore;

use contracts::{Command, CommandTransport, ContractError, DeviceConfig, DeviceId};

/// One recorded transport call.
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    pub device_id: DeviceId,
    pub address: String,
    pub command: Command,
    pub config: Option<DeviceConfig>,
}

const FAIL_ALWAYS: u64 = u64::MAX;

/// Scriptable in-memory transport.
///
/// Records every call; can fail the first N sends, fail forever, sleep per
/// send, or block on a gate the test releases.
pub struct MockTransport {
    calls: Mutex<Vec<MockCall>>,
    failures_remaining: AtomicU64,
    delay: Option<Duration>,
    address_delays: Mutex<HashMap<String, Duration>>,
    gate: Option<Arc<Semaphore>>,
}

impl MockTransport {
    /// Transport that accepts every command.
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failures_remaining: AtomicU64::new(0),
            delay: None,
            address_delays: Mutex::new(HashMap::new()),
            gate: None,
        }
    }

    /// Fail the first `n` sends with `Unreachable`, then accept.
    pub fn failing_times(self, n: u64) -> Self {
        self.failures_remaining.store(n, Ordering::Relaxed);
        self
    }

    /// Fail every send with `Unreachable`.
    pub fn always_failing(self) -> Self {
        self.failures_remaining.store(FAIL_ALWAYS, Ordering::Relaxed);
        self
    }

    /// Sleep this long inside every send (drives timeout tests).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Sleep this long inside sends to one address only (drives per-device
    /// isolation tests).
    pub fn with_address_delay(self, address: &str, delay: Duration) -> Self {
        self.address_delays
            .lock()
            .expect("mock address delays poisoned")
            .insert(address.to_string(), delay);
        self
    }

    /// Transport whose sends block until the returned semaphore gets a
    /// permit (drives queue/busy tests deterministically).
    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let transport = Self {
            calls: Mutex::new(Vec::new()),
            failures_remaining: AtomicU64::new(0),
            delay: None,
            address_delays: Mutex::new(HashMap::new()),
            gate: Some(Arc::clone(&gate)),
        };
        (transport, gate)
    }

    /// All calls seen so far, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().expect("mock call log poisoned").clone()
    }

    /// Calls for one device, in order.
    pub fn calls_for(&self, device_id: &str) -> Vec<MockCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.device_id == device_id)
            .collect()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandTransport for MockTransport {
    async fn send(
        &self,
        device_id: &DeviceId,
        address: &str,
        command: &Command,
        config: Option<&DeviceConfig>,
    ) -> Result<(), ContractError> {
        self.calls
            .lock()
            .expect("mock call log poisoned")
            .push(MockCall {
                device_id: device_id.clone(),
                address: address.to_string(),
                command: command.clone(),
                config: config.cloned(),
            });

        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|_| ContractError::unreachable(device_id.as_str(), "gate closed"))?;
            permit.forget();
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let address_delay = {
            let delays = self
                .address_delays
                .lock()
                .expect("mock address delays poisoned");
            delays.get(address).copied()
        };
        if let Some(delay) = address_delay {
            tokio::time::sleep(delay).await;
        }

        let remaining = self.failures_remaining.load(Ordering::Relaxed);
        if remaining == FAIL_ALWAYS {
            return Err(ContractError::unreachable(
                device_id.as_str(),
                "mock transport refusing connections",
            ));
        }
        if remaining > 0 {
            self.failures_remaining.fetch_sub(1, Ordering::Relaxed);
            return Err(ContractError::unreachable(
                device_id.as_str(),
                "mock transient failure",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_calls_in_order() {
        let transport = MockTransport::new();
        let id: DeviceId = "kitchen".into();

        transport
            .send(&id, "10.0.0.5:8080", &Command::NextImage, None)
            .await
            .unwrap();
        transport
            .send(&id, "10.0.0.5:8080", &Command::RefreshConfig, None)
            .await
            .unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].command, Command::NextImage);
        assert_eq!(calls[1].command, Command::RefreshConfig);
    }

    #[tokio::test]
    async fn test_failing_times_then_recovers() {
        let transport = MockTransport::new().failing_times(1);
        let id: DeviceId = "kitchen".into();

        assert!(transport
            .send(&id, "a", &Command::NextImage, None)
            .await
            .is_err());
        assert!(transport
            .send(&id, "a", &Command::NextImage, None)
            .await
            .is_ok());
    }
}
