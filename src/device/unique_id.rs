// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hub-stable device identifier.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Globally stable identifier of a device (the hub's `uniqueid` field).
///
/// This is the only key used to correlate inventory entries with event
/// stream messages. The hub-local `id` is reassigned across hub restarts
/// and never serves that purpose.
///
/// # Examples
///
/// ```
/// use deconz_lib::device::UniqueId;
///
/// let id = UniqueId::from("00:15:8d:00:01:23:45:67-01-0402");
/// assert_eq!(id.as_str(), "00:15:8d:00:01:23:45:67-01-0402");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UniqueId(String);

impl UniqueId {
    /// Creates a unique id from any string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the id is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for UniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UniqueId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for UniqueId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&UniqueId> for UniqueId {
    fn from(id: &UniqueId) -> Self {
        id.clone()
    }
}

impl AsRef<str> for UniqueId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for UniqueId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn lookup_by_str() {
        let mut map = HashMap::new();
        map.insert(UniqueId::from("AA:BB"), 1);
        assert_eq!(map.get("AA:BB"), Some(&1));
    }

    #[test]
    fn deserializes_from_plain_string() {
        let id: UniqueId = serde_json::from_str("\"AA:BB-01\"").unwrap();
        assert_eq!(id, UniqueId::from("AA:BB-01"));
        assert_eq!(id.to_string(), "AA:BB-01");
    }
}
