// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device runtime state.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Runtime state of a sensor or light.
///
/// The hub reports state as an open JSON object whose keys depend on the
/// device type (`on`, `bri`, `temperature`, `presence`, `lastupdated`, ...).
/// `DeviceState` keeps that object as-is and offers typed accessors for the
/// common keys.
///
/// # Examples
///
/// ```
/// use deconz_lib::state::DeviceState;
///
/// let mut state = DeviceState::new();
/// state.set("on", true);
/// state.set("bri", 128);
///
/// assert_eq!(state.on(), Some(true));
/// assert_eq!(state.brightness(), Some(128));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceState(Map<String, Value>);

impl DeviceState {
    /// Creates a new empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the raw value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Sets a single attribute, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Returns `true` if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns the number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no attribute is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over all attributes in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Returns a boolean attribute.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// Returns an integer attribute.
    #[must_use]
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    /// Returns a string attribute.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    // ========== Well-known keys ==========

    /// Light power state (`on`).
    #[must_use]
    pub fn on(&self) -> Option<bool> {
        self.get_bool("on")
    }

    /// Light brightness (`bri`, 0-255).
    ///
    /// Returns `None` if the value is missing or outside 0-255.
    #[must_use]
    pub fn brightness(&self) -> Option<u8> {
        self.get_i64("bri").and_then(|bri| u8::try_from(bri).ok())
    }

    /// Whether the hub can currently reach the device (`reachable`).
    #[must_use]
    pub fn reachable(&self) -> Option<bool> {
        self.get_bool("reachable")
    }

    /// Timestamp of the last sensor update as reported by the hub (`lastupdated`).
    #[must_use]
    pub fn last_updated(&self) -> Option<&str> {
        self.get_str("lastupdated")
    }

    /// Returns the underlying JSON object.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the state and returns the underlying JSON object.
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for DeviceState {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for DeviceState {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
