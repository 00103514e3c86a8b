// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Light records.

use serde::{Deserialize, Serialize};

use crate::state::DeviceState;

use super::{DeviceKind, DeviceRecord, HubId, UniqueId};

/// A light as enumerated by `GET /api/{username}/lights`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Light {
    #[serde(skip)]
    id: String,
    #[serde(skip)]
    hub: Option<HubId>,
    /// Entity tag of the hub's resource.
    #[serde(default)]
    pub etag: Option<String>,
    /// Whether the light supports colour.
    #[serde(rename = "hascolor", default)]
    pub has_color: bool,
    /// Manufacturer name.
    #[serde(rename = "manufacturername", default)]
    pub manufacturer_name: String,
    /// Model identifier.
    #[serde(rename = "modelid", default)]
    pub model_id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Current runtime state (`on`, `bri`, `reachable`, ...).
    #[serde(default)]
    pub state: DeviceState,
    /// Firmware version.
    #[serde(rename = "swversion", default)]
    pub software_version: Option<String>,
    /// Light type, e.g. `Dimmable light` or `Extended color light`.
    #[serde(rename = "type", default)]
    pub light_type: String,
    /// Hub-stable unique id.
    #[serde(rename = "uniqueid")]
    pub unique_id: UniqueId,
}

impl Light {
    /// Creates a light with the given unique id and empty attributes.
    #[must_use]
    pub fn new(unique_id: impl Into<UniqueId>) -> Self {
        Self {
            id: String::new(),
            hub: None,
            etag: None,
            has_color: false,
            manufacturer_name: String::new(),
            model_id: String::new(),
            name: String::new(),
            state: DeviceState::new(),
            software_version: None,
            light_type: String::new(),
            unique_id: unique_id.into(),
        }
    }

    /// Returns the hub-local id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns `true` if the cached state says the light is on.
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.state.on().unwrap_or(false)
    }
}

impl PartialEq for Light {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.etag == other.etag
            && self.has_color == other.has_color
            && self.manufacturer_name == other.manufacturer_name
            && self.model_id == other.model_id
            && self.name == other.name
            && self.state == other.state
            && self.software_version == other.software_version
            && self.light_type == other.light_type
            && self.unique_id == other.unique_id
    }
}

impl DeviceRecord for Light {
    const KIND: DeviceKind = DeviceKind::Light;

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
