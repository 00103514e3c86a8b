// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sensor records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::state::DeviceState;

use super::{DeviceKind, DeviceRecord, HubId, UniqueId};

/// A sensor as enumerated by `GET /api/{username}/sensors`.
///
/// Descriptive fields are refreshed only by re-running inventory. The
/// `state` field is replaced by event stream messages.
///
/// # Examples
///
/// ```
/// use deconz_lib::device::Sensor;
///
/// let sensor: Sensor = serde_json::from_str(r#"{
///     "name": "Hallway",
///     "type": "ZHATemperature",
///     "uniqueid": "00:15:8d:00:02:aa:bb:cc-01-0402",
///     "state": {"temperature": 2050}
/// }"#).unwrap();
///
/// assert_eq!(sensor.state.get_i64("temperature"), Some(2050));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sensor {
    /// Hub-local id, taken from the inventory map key.
    #[serde(skip)]
    id: String,
    /// Hub that enumerated this sensor.
    #[serde(skip)]
    hub: Option<HubId>,
    /// Sensor configuration (battery, offsets, `on`, `reachable`, ...).
    #[serde(default)]
    pub config: Map<String, Value>,
    /// Entity tag of the hub's resource.
    #[serde(default)]
    pub etag: Option<String>,
    /// Manufacturer name.
    #[serde(rename = "manufacturername", default)]
    pub manufacturer_name: String,
    /// Model identifier.
    #[serde(rename = "modelid", default)]
    pub model_id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Current runtime state.
    #[serde(default)]
    pub state: DeviceState,
    /// Firmware version.
    #[serde(rename = "swversion", default)]
    pub software_version: Option<String>,
    /// Sensor type, e.g. `ZHATemperature` or `ZHAPresence`.
    #[serde(rename = "type", default)]
    pub sensor_type: String,
    /// Hub-stable unique id.
    #[serde(rename = "uniqueid")]
    pub unique_id: UniqueId,
}

impl Sensor {
    /// Creates a sensor with the given unique id and empty attributes.
    #[must_use]
    pub fn new(unique_id: impl Into<UniqueId>) -> Self {
        Self {
            id: String::new(),
            hub: None,
            config: Map::new(),
            etag: None,
            manufacturer_name: String::new(),
            model_id: String::new(),
            name: String::new(),
            state: DeviceState::new(),
            software_version: None,
            sensor_type: String::new(),
            unique_id: unique_id.into(),
        }
    }

    /// Returns the hub-local id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl PartialEq for Sensor {
    // Hub association is not part of identity.
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.config == other.config
            && self.etag == other.etag
            && self.manufacturer_name == other.manufacturer_name
            && self.model_id == other.model_id
            && self.name == other.name
            && self.state == other.state
            && self.software_version == other.software_version
            && self.sensor_type == other.sensor_type
            && self.unique_id == other.unique_id
    }
}

impl DeviceRecord for Sensor {
    const KIND: DeviceKind = DeviceKind::Sensor;

    fn unique_id(&self) -> &UniqueId {
        &self.unique_id
    }

    fn local_id(&self) -> &str {
        &self.id
    }

    fn hub_id(&self) -> Option<HubId> {
        self.hub
    }

    fn state(&self) -> &DeviceState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut DeviceState {
        &mut self.state
    }

    fn attach(&mut self, local_id: String, hub: HubId) {
        self.id = local_id;
        self.hub = Some(hub);
    }
}
