//! HTTP command transport
//!
//! One control endpoint per command on the tablet: `POST /next`,
//! `POST /configure` (full `DeviceConfig` body), `POST /set_profile`
//! (`{"profile": id}` body).

use reqwest::Client;
use tracing::{debug, instrument};

use contracts::{Command, CommandTransport, ContractError, DeviceConfig, DeviceId};

/// Transport that delivers commands over HTTP.
///
/// Timeouts are enforced by the dispatch worker around each attempt, so the
/// client itself carries none.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Control URL for a command against a configured address.
    ///
    /// Accepts bare `host:port` (scheme defaults to http) or a full URL.
    fn command_url(address: &str, command: &Command) -> String {
        let base = address.trim_end_matches('/');
        if base.starts_with("http://") || base.starts_with("https://") {
            format!("{}/{}", base, command.endpoint())
        } else {
            format!("http://{}/{}", base, command.endpoint())
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandTransport for HttpTransport {
    #[instrument(
        name = "http_transport_send",
        skip(self, command, config),
        fields(device = %device_id, command = command.name())
    )]
    async fn send(
        &self,
        device_id: &DeviceId,
        address: &str,
        command: &Command,
        config: Option<&DeviceConfig>,
    ) -> Result<(), ContractError> {
        let url = Self::command_url(address, command);
        let request = self.client.post(&url);
        let request = match (command, config) {
            (Command::RefreshConfig, Some(device_config)) => request.json(device_config),
            (Command::SetProfile { profile }, _) => {
                request.json(&serde_json::json!({ "profile": profile }))
            }
            _ => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| ContractError::unreachable(device_id.as_str(), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ContractError::unreachable(
                device_id.as_str(),
                format!("device returned {status}"),
            ));
        }

        debug!(url = %url, "command delivered");
        Ok(())
    }
}
