// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hub connection identifier.

use std::fmt;

use uuid::Uuid;

/// Identifier of a [`Hub`](crate::Hub) connection context.
///
/// Device records keep the `HubId` of the hub that enumerated them instead
/// of a pointer to the hub itself. The association is non-owning and plays
/// no part in record equality.
///
/// # Examples
///
/// ```
/// use deconz_lib::device::HubId;
///
/// let id = HubId::new();
/// assert_ne!(id, HubId::new());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct HubId(Uuid);

impl HubId {
    /// Creates a new random hub identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for HubId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HubId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let simple = self.0.simple().to_string();
        f.debug_tuple("HubId").field(&&simple[..8]).finish()
    }
}

impl fmt::Display for HubId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for HubId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}
