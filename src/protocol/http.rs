// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! REST client for the hub's HTTP interface.

use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::HubConfig;
use crate::error::{DecodeError, Error, TransportError};

/// HTTP client for the hub's REST API.
///
/// All requests target resources below `/api/{username}`. A non-2xx status is
/// reported as [`TransportError::Status`] and a body that does not match the
/// expected shape as [`DecodeError::Json`].
///
/// # Examples
///
/// ```no_run
/// use deconz_lib::config::HubConfig;
/// use deconz_lib::protocol::HubClient;
///
/// # async fn example() -> deconz_lib::Result<()> {
/// let client = HubClient::new(&HubConfig::new("192.168.1.20", "0A1B2C3D4E"))?;
/// let lights: serde_json::Value = client.get_json("lights").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HubClient {
    config: HubConfig,
    client: Client,
}

impl HubClient {
    /// Creates a client for the configured hub.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidAddress`] if the host is empty or
    /// looks like a URL rather than a host name, and [`TransportError::Http`]
    /// if the HTTP client cannot be created.
    pub fn new(config: &HubConfig) -> Result<Self, TransportError> {
        let host = config.host();
        if host.is_empty() || host.contains(['/', ' ']) {
            return Err(TransportError::InvalidAddress(host.to_string()));
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(TransportError::Http)?;

        Ok(Self {
            config: config.clone(),
            client,
        })
    }

    /// Returns the REST base URL of the hub.
    #[must_use]
    pub fn base_url(&self) -> String {
        self.config.base_url()
    }

    /// Fetches `GET /api/{username}/{path}` and decodes the JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the request fails or the status is not
    /// 2xx, and [`Error::Decode`] if the body is not the expected JSON. The
    /// hub answers some failures (e.g. an unknown API key) with 200 and an
    /// error list; those become [`DecodeError::UnexpectedFormat`].
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.config.api_url(path);

        tracing::debug!(url = %url, "Sending HTTP GET");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(TransportError::Http)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                url,
            }
            .into());
        }

        let body = response.text().await.map_err(TransportError::Http)?;

        tracing::debug!(bytes = body.len(), "Received HTTP response");

        let value: serde_json::Value = serde_json::from_str(&body).map_err(DecodeError::Json)?;
        if let Some(description) = api_error(&value) {
            tracing::warn!(url = %url, description, "Hub returned an error list");
            return Err(DecodeError::UnexpectedFormat(format!("hub error: {description}")).into());
        }

        serde_json::from_value(value).map_err(|e| DecodeError::Json(e).into())
    }

    /// Sends `PUT /api/{username}/{path}` with a JSON body.
    ///
    /// Returns the response status whatever its value; interpreting it is left
    /// to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Http`] if no response was received.
    pub async fn put_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::StatusCode, TransportError> {
        let url = self.config.api_url(path);

        tracing::debug!(url = %url, "Sending HTTP PUT");

        let response = self
            .client
            .put(&url)
            .json(body)
            .send()
            .await
            .map_err(TransportError::Http)?;

        let status = response.status();
        tracing::debug!(status = status.as_u16(), "Received HTTP response");

        Ok(status)
    }
}

/// Extracts the first description from a `[{"error": {...}}]` answer.
fn api_error(value: &serde_json::Value) -> Option<&str> {
    value
        .as_array()?
        .iter()
        .find_map(|entry| entry.get("error")?.get("description")?.as_str())
}
