// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Observer hook storage.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::Hub;
use crate::device::{DeviceKind, Light, Sensor, UniqueId};
use crate::state::DeviceState;

use super::dispatcher::Job;

/// Hook invoked when a sensor is seen for the first time.
pub type SensorDiscoveredHook = Arc<dyn Fn(&Hub, &UniqueId, &Sensor) + Send + Sync>;

/// Hook invoked when a light is seen for the first time.
pub type LightDiscoveredHook = Arc<dyn Fn(&Hub, &UniqueId, &Light) + Send + Sync>;

/// Hook invoked when the event stream replaces a device's state.
pub type StateChangedHook = Arc<dyn Fn(&Hub, &UniqueId, &DeviceState) + Send + Sync>;

/// Something observers may want to hear about.
#[derive(Debug, Clone)]
pub enum Notification {
    /// A sensor unique id was inserted into the registry.
    SensorDiscovered(Sensor),
    /// A light unique id was inserted into the registry.
    LightDiscovered(Light),
    /// The event stream replaced a device's state.
    StateChanged {
        /// Registry the device lives in.
        kind: DeviceKind,
        /// The device.
        unique_id: UniqueId,
        /// The new state.
        state: DeviceState,
    },
}

/// The four optional observer hooks of a hub.
///
/// Each slot holds at most one hook; registering a hook replaces the previous
/// one. Hooks are wrapped in `Arc` so a queued invocation keeps its hook
/// alive even if the slot is cleared meanwhile.
#[derive(Default)]
pub struct ObserverRegistry {
    sensor_discovered: RwLock<Option<SensorDiscoveredHook>>,
    light_discovered: RwLock<Option<LightDiscoveredHook>>,
    sensor_state_changed: RwLock<Option<StateChangedHook>>,
    light_state_changed: RwLock<Option<StateChangedHook>>,
}

impl ObserverRegistry {
    /// Creates a registry with no hook.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Sets the sensor-discovered hook. Returns `true` if one was replaced.
    pub fn set_sensor_discovered<F>(&self, hook: F) -> bool
    where
        F: Fn(&Hub, &UniqueId, &Sensor) + Send + Sync + 'static,
    {
        self.sensor_discovered
            .write()
            .replace(Arc::new(hook))
            .is_some()
    }

    /// Sets the light-discovered hook. Returns `true` if one was replaced.
    pub fn set_light_discovered<F>(&self, hook: F) -> bool
    where
        F: Fn(&Hub, &UniqueId, &Light) + Send + Sync + 'static,
    {
        self.light_discovered
            .write()
            .replace(Arc::new(hook))
            .is_some()
    }

    /// Sets the sensor-state-changed hook. Returns `true` if one was replaced.
    pub fn set_sensor_state_changed<F>(&self, hook: F) -> bool
    where
        F: Fn(&Hub, &UniqueId, &DeviceState) + Send + Sync + 'static,
    {
        self.sensor_state_changed
            .write()
            .replace(Arc::new(hook))
            .is_some()
    }

    /// Sets the light-state-changed hook. Returns `true` if one was replaced.
    pub fn set_light_state_changed<F>(&self, hook: F) -> bool
    where
        F: Fn(&Hub, &UniqueId, &DeviceState) + Send + Sync + 'static,
    {
        self.light_state_changed
            .write()
            .replace(Arc::new(hook))
            .is_some()
    }

    /// Removes every hook.
    pub fn clear(&self) {
        self.sensor_discovered.write().take();
        self.light_discovered.write().take();
        self.sensor_state_changed.write().take();
        self.light_state_changed.write().take();
    }

    /// Returns the number of registered hooks (0-4).
    #[must_use]
    pub fn hook_count(&self) -> usize {
        usize::from(self.sensor_discovered.read().is_some())
            + usize::from(self.light_discovered.read().is_some())
            + usize::from(self.sensor_state_changed.read().is_some())
            + usize::from(self.light_state_changed.read().is_some())
    }

    /// Returns `true` if no hook is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hook_count() == 0
    }

    // =========================================================================
    // Binding
    // =========================================================================

    /// Binds a notification to the matching hook.
    ///
    /// Returns `None` when no hook is registered for this notification, in
    /// which case nothing needs to be queued.
    pub(crate) fn bind(&self, hub: &Hub, notification: Notification) -> Option<Job> {
        let hub = hub.clone();
        match notification {
            Notification::SensorDiscovered(sensor) => {
                let hook = self.sensor_discovered.read().clone()?;
                Some(Box::new(move || hook(&hub, &sensor.unique_id, &sensor)))
            }
            Notification::LightDiscovered(light) => {
                let hook = self.light_discovered.read().clone()?;
                Some(Box::new(move || hook(&hub, &light.unique_id, &light)))
            }
            Notification::StateChanged {
                kind,
                unique_id,
                state,
            } => {
                let hook = match kind {
                    DeviceKind::Sensor => self.sensor_state_changed.read().clone(),
                    DeviceKind::Light => self.light_state_changed.read().clone(),
                }?;
                Some(Box::new(move || hook(&hub, &unique_id, &state)))
            }
        }
    }
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("hook_count", &self.hook_count())
            .finish()
    }
}
