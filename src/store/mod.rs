// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory device store.
//!
//! The [`DeviceStore`] holds one [`Registry`] per [`DeviceKind`]. It is shared
//! by the inventory path, the event stream reader and the command path, all
//! of which may touch it concurrently.
//!
//! # Examples
//!
//! ```
//! use deconz_lib::device::{DeviceKind, Sensor};
//! use deconz_lib::state::DeviceState;
//! use deconz_lib::store::{DeviceStore, Upsert};
//!
//! let store = DeviceStore::new();
//! assert_eq!(store.sensors().upsert(Sensor::new("AA:BB")), Upsert::Inserted);
//!
//! let mut state = DeviceState::new();
//! state.set("temperature", 210);
//! store.update_state(DeviceKind::Sensor, "AA:BB", state).unwrap();
//!
//! let sensor = store.sensors().get("AA:BB").unwrap();
//! assert_eq!(sensor.state.get_i64("temperature"), Some(210));
//! ```

mod registry;

pub use registry::{Registry, Upsert};

use serde_json::Value;

use crate::device::{DeviceKind, Light, Sensor};
use crate::error::Result;
use crate::state::DeviceState;

/// The sensor and light registries.
#[derive(Debug, Default)]
pub struct DeviceStore {
    sensors: Registry<Sensor>,
    lights: Registry<Light>,
}

impl DeviceStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the sensor registry.
    #[must_use]
    pub fn sensors(&self) -> &Registry<Sensor> {
        &self.sensors
    }

    /// Returns the light registry.
    #[must_use]
    pub fn lights(&self) -> &Registry<Light> {
        &self.lights
    }

    /// Replaces the state of a device in the given registry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) if the id is unknown.
    pub fn update_state(&self, kind: DeviceKind, unique_id: &str, state: DeviceState) -> Result<()> {
        match kind {
            DeviceKind::Sensor => self.sensors.update_state(unique_id, state),
            DeviceKind::Light => self.lights.update_state(unique_id, state),
        }
    }

    /// Writes one state attribute of a device in the given registry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) if the id is unknown.
    pub fn set_state_value(
        &self,
        kind: DeviceKind,
        unique_id: &str,
        key: &str,
        value: Value,
    ) -> Result<()> {
        match kind {
            DeviceKind::Sensor => self.sensors.set_state_value(unique_id, key, value),
            DeviceKind::Light => self.lights.set_state_value(unique_id, key, value),
        }
    }

    /// Returns `true` if the given registry knows this id.
    #[must_use]
    pub fn contains(&self, kind: DeviceKind, unique_id: &str) -> bool {
        match kind {
            DeviceKind::Sensor => self.sensors.contains(unique_id),
            DeviceKind::Light => self.lights.contains(unique_id),
        }
    }

    /// Returns the number of devices in the given registry.
    #[must_use]
    pub fn len(&self, kind: DeviceKind) -> usize {
        match kind {
            DeviceKind::Sensor => self.sensors.len(),
            DeviceKind::Light => self.lights.len(),
        }
    }

    /// Returns which registry holds this id, checking sensors first.
    #[must_use]
    pub fn kind_of(&self, unique_id: &str) -> Option<DeviceKind> {
        DeviceKind::ALL
            .into_iter()
            .find(|kind| self.contains(*kind, unique_id))
    }
}
