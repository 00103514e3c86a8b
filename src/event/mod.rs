// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event stream: asynchronous state-change notifications from the hub.
//!
//! The hub pushes one JSON envelope per change over a WebSocket. Each
//! envelope is decoded into a [`HubEvent`] and routed by unique id: sensors
//! first, then lights. Events for devices the registry does not know are
//! dropped silently. The reader task is controlled through an
//! [`EventStreamHandle`] and reconnects according to the hub's
//! [`ReconnectionPolicy`](crate::config::ReconnectionPolicy).

mod hub_event;
mod stream;

pub use hub_event::{EventKind, EventOutcome, HubEvent, IgnoreReason};
pub use stream::{EventStreamHandle, StreamState};

pub(crate) use stream::spawn;
