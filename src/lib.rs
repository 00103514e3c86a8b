// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `deCONZ` Lib - A Rust library to track the sensors and lights of a
//! `deCONZ` Zigbee hub.
//!
//! The hub is reached through its REST API for inventory and state changes,
//! and through its WebSocket event channel for live updates.
//!
//! # Supported Features
//!
//! - **Inventory**: Enumerate sensors and lights, keyed by their unique id
//! - **Live updates**: Apply event channel messages to the cached state
//! - **Observers**: Hooks for discovered devices and state changes
//! - **Commands**: Change a state attribute, switch lights, set brightness
//!
//! # Quick Start
//!
//! ## One-shot Inventory
//!
//! ```no_run
//! use deconz_lib::{Hub, HubConfig};
//!
//! #[tokio::main]
//! async fn main() -> deconz_lib::Result<()> {
//!     let hub = Hub::new(HubConfig::new("192.168.1.20", "0A1B2C3D4E"))?;
//!
//!     hub.refresh_all().await?;
//!
//!     for sensor in hub.sensors() {
//!         println!("{} ({}): {:?}", sensor.name, sensor.unique_id, sensor.state);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Live Updates with Hooks
//!
//! ```no_run
//! use deconz_lib::{Hub, HubConfig, ReconnectionPolicy};
//!
//! #[tokio::main]
//! async fn main() -> deconz_lib::Result<()> {
//!     let config = HubConfig::new("192.168.1.20", "0A1B2C3D4E")
//!         .with_websocket_port(8088)
//!         .with_reconnection(ReconnectionPolicy::new().with_max_retries(20));
//!     let hub = Hub::new(config)?;
//!
//!     hub.on_sensor_discovered(|_hub, unique_id, sensor| {
//!         println!("New sensor {unique_id}: {}", sensor.name);
//!     });
//!
//!     hub.on_sensor_state_changed(|_hub, unique_id, state| {
//!         println!("{unique_id} -> {state:?}");
//!     });
//!
//!     // Enumerate first, then follow the event channel
//!     let stream = hub.scan().await?;
//!
//!     tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
//!     stream.shutdown();
//!     stream.join().await
//! }
//! ```
//!
//! ## Commands
//!
//! ```no_run
//! use deconz_lib::{DeviceKind, Hub};
//!
//! # async fn example(hub: Hub) -> deconz_lib::Result<()> {
//! hub.set_power("00:17:88:01:02:03:04:05-0b", true).await?;
//! hub.set_brightness("00:17:88:01:02:03:04:05-0b", 128).await?;
//! hub.set_state(DeviceKind::Light, "00:17:88:01:02:03:04:05-0b", "ct", 300).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod event;
mod hub;
pub mod protocol;
pub mod state;
pub mod store;
pub mod subscription;

pub use config::{HubConfig, ReconnectionPolicy};
pub use device::{DeviceKind, DeviceRecord, HubId, Light, Sensor, UniqueId};
pub use error::{CommandError, DecodeError, Error, Result, TransportError};
pub use event::{EventKind, EventOutcome, EventStreamHandle, HubEvent, IgnoreReason, StreamState};
pub use hub::{Hub, RefreshSummary};
pub use state::DeviceState;
pub use store::{DeviceStore, Registry, Upsert};
pub use subscription::{Dispatcher, Notification, ObserverRegistry};
