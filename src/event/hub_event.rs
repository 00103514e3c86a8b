// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event channel message types.

use serde::{Deserialize, Serialize};

use crate::device::{DeviceKind, UniqueId};
use crate::error::DecodeError;
use crate::state::DeviceState;

/// Kind of change announced by an event (`e` field).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// A resource was added.
    Added,
    /// A resource changed.
    Changed,
    /// A resource was deleted.
    Deleted,
    /// A scene was recalled.
    #[serde(rename = "scene-called")]
    SceneCalled,
    /// Any other value, or no `e` field.
    #[default]
    #[serde(other)]
    Unknown,
}

/// One message received on the event channel.
///
/// # Examples
///
/// ```
/// use deconz_lib::event::{EventKind, HubEvent};
///
/// let event = HubEvent::from_json(r#"{
///     "e": "changed", "id": "5", "r": "sensors", "t": "event",
///     "uniqueid": "00:15:8d:00:02:aa:bb:cc-01-0402",
///     "state": {"temperature": 2110}
/// }"#).unwrap();
///
/// assert_eq!(event.event, EventKind::Changed);
/// assert_eq!(event.state.unwrap().get_i64("temperature"), Some(2110));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HubEvent {
    /// Change kind (`e`).
    #[serde(rename = "e", default)]
    pub event: EventKind,
    /// Hub-local id of the resource (`id`). Informational only.
    #[serde(default)]
    pub id: Option<String>,
    /// Resource collection (`r`), e.g. `sensors` or `lights`.
    #[serde(rename = "r", default)]
    pub resource: Option<String>,
    /// State carried by the event, if any.
    #[serde(default)]
    pub state: Option<DeviceState>,
    /// Message type (`t`), normally `event`.
    #[serde(rename = "t", default)]
    pub message_type: Option<String>,
    /// Hub-stable id of the device (`uniqueid`).
    #[serde(rename = "uniqueid", default)]
    pub unique_id: Option<UniqueId>,
}

impl HubEvent {
    /// Decodes an event envelope from a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Json`] if the text is not a JSON object of the
    /// expected shape.
    pub fn from_json(text: &str) -> Result<Self, DecodeError> {
        serde_json::from_str(text).map_err(DecodeError::Json)
    }
}

/// Why an event did not change any device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The event carries no `uniqueid`.
    NoUniqueId,
    /// The event carries no `state` object.
    NoState,
    /// The unique id is in neither registry.
    UnknownDevice,
}

/// What applying an event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// The state of a known device was replaced.
    Updated {
        /// Registry holding the device.
        kind: DeviceKind,
        /// The device.
        unique_id: UniqueId,
    },
    /// Nothing was changed and no hook was notified.
    Ignored(IgnoreReason),
}

impl EventOutcome {
    /// Returns `true` if a device state was replaced.
    #[must_use]
    pub fn is_updated(&self) -> bool {
        matches!(self, Self::Updated { .. })
    }
}
