use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::{CommandSink, DispatchAck, ShockCommand};
use crate::config::DispatchConfig;
use crate::errors::DispatchError;

/// HTTP client for the OpenShock control endpoint.
pub struct OpenShockClient {
    client: reqwest::Client,
    api_url: String,
    api_token: String,
}

impl OpenShockClient {
    pub fn new(config: &DispatchConfig) -> Result<Self, DispatchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent(concat!("voxshockd/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DispatchError::Request(e.to_string()))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_token: config.api_token.clone(),
        })
    }
}

#[async_trait]
impl CommandSink for OpenShockClient {
    async fn send(&self, command: &ShockCommand) -> Result<DispatchAck, DispatchError> {
        let payload = json!({
            "shocks": [{
                "id": command.control_id,
                "type": "Shock",
                "intensity": command.intensity,
                "duration": command.duration_ms,
            }],
            "customName": "VoiceControl",
        });

        debug!(intensity = command.intensity, duration_ms = command.duration_ms, "Sending control request");

        let response = self
            .client
            .post(&self.api_url)
            .header("OpenShockToken", &self.api_token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| DispatchError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Http {
                status: status.as_u16(),
                body,
            });
        }

        Ok(DispatchAck {
            status: status.as_u16(),
        })
    }
}
