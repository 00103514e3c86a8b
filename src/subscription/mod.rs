// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Observer hooks and their dispatch.
//!
//! A hub exposes four optional hooks:
//!
//! - sensor discovered: first sight of a sensor unique id during inventory
//! - light discovered: first sight of a light unique id during inventory
//! - sensor state changed: an event replaced a sensor's state
//! - light state changed: an event replaced a light's state
//!
//! Hooks are stored in an [`ObserverRegistry`] and run by a [`Dispatcher`],
//! a bounded pool of workers, so a slow hook never stalls inventory refresh
//! or the event stream reader.
//!
//! # Usage
//!
//! ```no_run
//! use deconz_lib::Hub;
//! use deconz_lib::config::HubConfig;
//!
//! # async fn example() -> deconz_lib::Result<()> {
//! let hub = Hub::new(HubConfig::new("192.168.1.20", "0A1B2C3D4E"))?;
//!
//! hub.on_sensor_state_changed(|_hub, unique_id, state| {
//!     println!("{unique_id}: {state:?}");
//! });
//! # Ok(())
//! # }
//! ```
//!
//! Hooks run on Tokio's blocking pool. A hook that wants to issue commands
//! can spawn them with `tokio::spawn` or block on them with
//! `tokio::runtime::Handle::current().block_on`.

mod callback;
mod dispatcher;

pub use callback::{
    LightDiscoveredHook, Notification, ObserverRegistry, SensorDiscoveredHook, StateChangedHook,
};
pub use dispatcher::Dispatcher;
