// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wire protocols spoken with the hub.
//!
//! - [`HubClient`]: request/response REST API used for inventory and commands
//! - [`EventChannel`]: the persistent WebSocket carrying change notifications

mod http;
mod websocket;

pub use http::HubClient;
pub use websocket::{ChannelFrame, EventChannel};
