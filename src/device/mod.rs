// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device records exposed by the hub.
//!
//! The hub enumerates two kinds of devices, [`Sensor`]s and [`Light`]s.
//! Both share the same shape: descriptive attributes that only change when
//! inventory is re-run, and a [`DeviceState`] mapping that changes with every
//! event. The [`DeviceRecord`] trait captures that common shape so the
//! registry can store either kind.

mod hub_id;
mod light;
mod sensor;
mod unique_id;

use std::fmt;

pub use hub_id::HubId;
pub use light::Light;
pub use sensor::Sensor;
pub use unique_id::UniqueId;

use crate::state::DeviceState;

/// The two device registries kept by the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    /// Sensors (`/sensors`).
    Sensor,
    /// Lights (`/lights`).
    Light,
}

impl DeviceKind {
    /// Both kinds, in event routing order.
    pub const ALL: [DeviceKind; 2] = [DeviceKind::Sensor, DeviceKind::Light];

    /// Returns the REST collection name for this kind.
    #[must_use]
    pub fn collection(self) -> &'static str {
        match self {
            Self::Sensor => "sensors",
            Self::Light => "lights",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor => f.write_str("sensor"),
            Self::Light => f.write_str("light"),
        }
    }
}

/// Common behaviour of [`Sensor`] and [`Light`] records.
pub trait DeviceRecord: Clone + Send + Sync + 'static {
    /// The registry this record type lives in.
    const KIND: DeviceKind;

    /// Returns the hub-stable unique id.
    fn unique_id(&self) -> &UniqueId;

    /// Returns the hub-local id (empty until attached).
    fn local_id(&self) -> &str;

    /// Returns the hub that enumerated this record, if any.
    fn hub_id(&self) -> Option<HubId>;

    /// Returns the current runtime state.
    fn state(&self) -> &DeviceState;

    /// Returns the runtime state for in-place modification.
    fn state_mut(&mut self) -> &mut DeviceState;

    /// Binds the record to its hub-local id and owning hub.
    fn attach(&mut self, local_id: String, hub: HubId);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_names() {
        assert_eq!(DeviceKind::Sensor.collection(), "sensors");
        assert_eq!(DeviceKind::Light.collection(), "lights");
    }

    #[test]
    fn routing_order_checks_sensors_first() {
        assert_eq!(DeviceKind::ALL[0], DeviceKind::Sensor);
    }

    #[test]
    fn kind_display() {
        assert_eq!(DeviceKind::Light.to_string(), "light");
    }
}
