// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device runtime state.
//!
//! [`DeviceState`] is the only high-churn part of a device record. It is
//! replaced as a whole by event stream messages and written one key at a
//! time by successful commands.

mod device_state;

pub use device_state::DeviceState;
