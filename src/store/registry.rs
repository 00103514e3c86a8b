// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Concurrency-safe registry of one device kind.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::Value;

use crate::device::{DeviceRecord, UniqueId};
use crate::error::{Error, Result};
use crate::state::DeviceState;

/// Outcome of [`Registry::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// The unique id was seen for the first time.
    Inserted,
    /// An existing record was overwritten.
    Merged,
}

/// Registry of devices of one kind, keyed by [`UniqueId`].
///
/// All access goes through a single `parking_lot::RwLock`. Writers replace
/// state while holding the write lock and readers clone records while
/// holding the read lock, so a reader never observes a half-written state.
/// Records are never removed.
#[derive(Debug)]
pub struct Registry<T> {
    devices: RwLock<HashMap<UniqueId, T>>,
}

impl<T: DeviceRecord> Registry<T> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            devices: RwLock::new(HashMap::new()),
        }
    }

    /// Inserts a record, or overwrites the record with the same unique id.
    ///
    /// On merge, descriptive fields, local id and state all take the
    /// incoming values.
    pub fn upsert(&self, record: T) -> Upsert {
        let mut devices = self.devices.write();
        match devices.get_mut(record.unique_id()) {
            Some(existing) => {
                *existing = record;
                Upsert::Merged
            }
            None => {
                devices.insert(record.unique_id().clone(), record);
                Upsert::Inserted
            }
        }
    }

    /// Atomically replaces the state of an existing record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the unique id is unknown.
    pub fn update_state(&self, unique_id: &str, state: DeviceState) -> Result<()> {
        let mut devices = self.devices.write();
        let device = devices
            .get_mut(unique_id)
            .ok_or_else(|| Error::not_found(T::KIND, unique_id))?;
        *device.state_mut() = state;
        Ok(())
    }

    /// Writes a single state attribute of an existing record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the unique id is unknown.
    pub fn set_state_value(&self, unique_id: &str, key: &str, value: Value) -> Result<()> {
        let mut devices = self.devices.write();
        let device = devices
            .get_mut(unique_id)
            .ok_or_else(|| Error::not_found(T::KIND, unique_id))?;
        device.state_mut().set(key, value);
        Ok(())
    }

    /// Returns a copy of the record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the unique id is unknown.
    pub fn get(&self, unique_id: &str) -> Result<T> {
        self.devices
            .read()
            .get(unique_id)
            .cloned()
            .ok_or_else(|| Error::not_found(T::KIND, unique_id))
    }

    /// Returns a snapshot of every record.
    #[must_use]
    pub fn list(&self) -> Vec<T> {
        self.devices.read().values().cloned().collect()
    }

    /// Returns the unique ids of every record.
    #[must_use]
    pub fn unique_ids(&self) -> Vec<UniqueId> {
        self.devices.read().keys().cloned().collect()
    }

    /// Returns `true` if a record with this unique id exists.
    #[must_use]
    pub fn contains(&self, unique_id: &str) -> bool {
        self.devices.read().contains_key(unique_id)
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.read().len()
    }

    /// Returns `true` if the registry holds no record.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.read().is_empty()
    }
}

impl<T: DeviceRecord> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::device::{DeviceKind, HubId, Sensor};

    fn sensor(unique_id: &str, name: &str, temperature: i64) -> Sensor {
        let mut sensor = Sensor::new(unique_id);
        sensor.name = name.to_string();
        sensor.state.set("temperature", temperature);
        sensor
    }

    #[test]
    fn upsert_reports_insert_then_merge() {
        let registry = Registry::new();
        assert_eq!(registry.upsert(sensor("AA", "one", 1)), Upsert::Inserted);
        assert_eq!(registry.upsert(sensor("AA", "one", 1)), Upsert::Merged);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn size_equals_distinct_ids() {
        let registry = Registry::new();
        let ids = ["A", "B", "A", "C", "B", "A"];
        for id in ids {
            registry.upsert(sensor(id, id, 0));
        }
        assert_eq!(registry.len(), 3);

        let mut seen = registry.unique_ids();
        seen.sort();
        assert_eq!(
            seen,
            vec![UniqueId::from("A"), UniqueId::from("B"), UniqueId::from("C")]
        );
    }

    #[test]
    fn merge_takes_incoming_fields() {
        let registry = Registry::new();
        let hub = HubId::new();

        let mut first = sensor("AA", "Old name", 1);
        first.attach("1".to_string(), hub);
        registry.upsert(first);

        let mut second = sensor("AA", "New name", 2);
        second.model_id = "lumi.weather".to_string();
        second.attach("4".to_string(), hub);
        registry.upsert(second);

        let stored = registry.get("AA").unwrap();
        assert_eq!(stored.name, "New name");
        assert_eq!(stored.model_id, "lumi.weather");
        assert_eq!(stored.id(), "4");
        assert_eq!(stored.state.get_i64("temperature"), Some(2));
    }

    #[test]
    fn update_state_leaves_descriptive_fields() {
        let registry = Registry::new();
        let mut original = sensor("AA", "Hallway", 205);
        original.sensor_type = "ZHATemperature".to_string();
        registry.upsert(original.clone());

        let mut state = DeviceState::new();
        state.set("temperature", 210);
        registry.update_state("AA", state.clone()).unwrap();

        let stored = registry.get("AA").unwrap();
        assert_eq!(stored.state, state);
        assert_eq!(stored.name, original.name);
        assert_eq!(stored.sensor_type, original.sensor_type);
    }

    #[test]
    fn update_state_unknown_id_is_not_found() {
        let registry: Registry<Sensor> = Registry::new();
        let err = registry
            .update_state("missing", DeviceState::new())
            .unwrap_err();

        assert!(matches!(
            err,
            Error::NotFound { kind: DeviceKind::Sensor, .. }
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn set_state_value_keeps_other_keys() {
        let registry = Registry::new();
        registry.upsert(sensor("AA", "x", 10));

        registry
            .set_state_value("AA", "lowbattery", Value::Bool(true))
            .unwrap();

        let stored = registry.get("AA").unwrap();
        assert_eq!(stored.state.get_i64("temperature"), Some(10));
        assert_eq!(stored.state.get_bool("lowbattery"), Some(true));
    }

    #[test]
    fn get_unknown_is_not_found() {
        let registry: Registry<Sensor> = Registry::new();
        assert!(registry.get("nope").unwrap_err().is_not_found());
        assert!(!registry.contains("nope"));
    }

    #[test]
    fn concurrent_readers_never_see_torn_state() {
        let registry = Arc::new(Registry::new());
        let mut initial = Sensor::new("AA");
        initial.state.set("a", 0);
        initial.state.set("b", 0);
        registry.upsert(initial);

        let writer = {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                for i in 0..2_000_i64 {
                    let state: DeviceState =
                        [("a", Value::from(i)), ("b", Value::from(i))].into_iter().collect();
                    registry.update_state("AA", state).unwrap();
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for _ in 0..2_000 {
                        for device in registry.list() {
                            assert_eq!(device.state.get_i64("a"), device.state.get_i64("b"));
                        }
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
