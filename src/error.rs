// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `deconz_lib` library.
//!
//! Failures are grouped by where they happen: talking to the hub
//! ([`TransportError`]), understanding what it sent back ([`DecodeError`]),
//! looking up a device that the registry does not know, and state-change
//! requests the hub refused ([`CommandError`]).

use thiserror::Error;

use crate::device::{DeviceKind, UniqueId};

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// The request or connection could not be completed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A response or event body did not have the expected shape.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// No device with this unique id is known to the registry.
    #[error("{kind} {unique_id} not found")]
    NotFound {
        /// The registry that was searched.
        kind: DeviceKind,
        /// The unique id that was looked up.
        unique_id: UniqueId,
    },

    /// A state-change request failed.
    #[error("command error: {0}")]
    Command(#[from] CommandError),
}

impl Error {
    /// Creates a not-found error for the given registry and id.
    #[must_use]
    pub fn not_found(kind: DeviceKind, unique_id: impl Into<UniqueId>) -> Self {
        Self::NotFound {
            kind,
            unique_id: unique_id.into(),
        }
    }

    /// Returns `true` if this is a [`Error::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Errors raised while reaching the hub over HTTP or WebSocket.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed before a response was received.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The hub answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The requested URL.
        url: String,
    },

    /// The event channel could not be opened or failed while reading.
    #[error("websocket error: {0}")]
    WebSocket(String),

    /// The event channel stayed silent past the liveness window.
    #[error("no traffic on event channel for {0} ms")]
    IdleTimeout(u64),

    /// Invalid hub address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The reconnection policy gave up.
    #[error("event channel reconnection abandoned after {attempts} attempts")]
    ReconnectExhausted {
        /// Number of consecutive failed attempts.
        attempts: u32,
    },
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(err.to_string())
    }
}

/// Errors raised while decoding hub payloads.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload parsed but did not have the expected shape.
    #[error("unexpected payload format: {0}")]
    UnexpectedFormat(String),
}

/// Errors raised by state-change requests.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The hub refused the request.
    #[error("hub rejected state change with HTTP {status}")]
    Rejected {
        /// The HTTP status code returned by the hub.
        status: u16,
    },

    /// The request never reached the hub.
    #[error("state change request failed: {0}")]
    Transport(#[source] TransportError),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = Error::not_found(DeviceKind::Sensor, "00:11:22:33-01");
        assert_eq!(err.to_string(), "sensor 00:11:22:33-01 not found");
        assert!(err.is_not_found());
    }

    #[test]
    fn status_error_display() {
        let err = TransportError::Status {
            status: 503,
            url: "http://hub/api/key/lights".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 503 from http://hub/api/key/lights");
    }

    #[test]
    fn command_rejected_display() {
        let err = CommandError::Rejected { status: 500 };
        assert_eq!(
            err.to_string(),
            "hub rejected state change with HTTP 500"
        );
    }

    #[test]
    fn error_from_decode_error() {
        let decode_err = DecodeError::UnexpectedFormat("array".to_string());
        let err: Error = decode_err.into();
        assert!(matches!(
            err,
            Error::Decode(DecodeError::UnexpectedFormat(_))
        ));
        assert!(!err.is_not_found());
    }

    #[test]
    fn reconnect_exhausted_display() {
        let err = TransportError::ReconnectExhausted { attempts: 5 };
        assert_eq!(
            err.to_string(),
            "event channel reconnection abandoned after 5 attempts"
        );
    }
}
