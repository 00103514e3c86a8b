// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The hub connection context.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::config::HubConfig;
use crate::device::{DeviceKind, DeviceRecord, HubId, Light, Sensor, UniqueId};
use crate::error::{CommandError, Result};
use crate::event::{self, EventOutcome, EventStreamHandle, HubEvent, IgnoreReason};
use crate::protocol::HubClient;
use crate::state::DeviceState;
use crate::store::{DeviceStore, Registry, Upsert};
use crate::subscription::{Dispatcher, Notification, ObserverRegistry};

/// Result of one inventory refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSummary {
    /// Registry that was refreshed.
    pub kind: DeviceKind,
    /// Number of devices returned by the hub.
    pub seen: usize,
    /// Number of unique ids seen for the first time.
    pub discovered: usize,
    /// Number of entries left out because they could not be decoded or
    /// carried no unique id.
    pub skipped: usize,
}

/// A connection to one deCONZ hub.
///
/// `Hub` owns the device store, the observer hooks and the REST client. It is
/// cheap to clone; all clones share the same state.
///
/// # Data flow
///
/// 1. [`refresh_all`](Self::refresh_all) enumerates sensors and lights and
///    fills the store. First sight of a unique id fires a discovered hook.
/// 2. [`start_event_stream`](Self::start_event_stream) reads change events;
///    each event for a known device replaces its state and fires a
///    state-changed hook.
/// 3. [`set_state`](Self::set_state) and friends write through the hub and
///    update the cached state on success.
///
/// # Examples
///
/// ```no_run
/// use deconz_lib::Hub;
/// use deconz_lib::config::HubConfig;
///
/// #[tokio::main]
/// async fn main() -> deconz_lib::Result<()> {
///     let hub = Hub::new(HubConfig::new("192.168.1.20", "0A1B2C3D4E"))?;
///
///     hub.on_light_state_changed(|_hub, unique_id, state| {
///         println!("{unique_id} is now {:?}", state.on());
///     });
///
///     let stream = hub.scan().await?;
///
///     for light in hub.lights() {
///         hub.set_power(light.unique_id.as_str(), true).await?;
///     }
///
///     stream.join().await
/// }
/// ```
#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

struct HubInner {
    id: HubId,
    config: HubConfig,
    client: HubClient,
    store: DeviceStore,
    observers: ObserverRegistry,
    dispatcher: Dispatcher,
}

impl Hub {
    /// Creates a hub connection context. No request is made yet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`](crate::Error::Transport) if the HTTP
    /// client cannot be created.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime (observer workers are
    /// spawned here).
    pub fn new(config: HubConfig) -> Result<Self> {
        let client = HubClient::new(&config)?;
        let dispatcher = Dispatcher::new(config.dispatch_capacity(), config.dispatch_workers());

        Ok(Self {
            inner: Arc::new(HubInner {
                id: HubId::new(),
                config,
                client,
                store: DeviceStore::new(),
                observers: ObserverRegistry::new(),
                dispatcher,
            }),
        })
    }

    /// Returns the identifier that device records use to refer to this hub.
    #[must_use]
    pub fn id(&self) -> HubId {
        self.inner.id
    }

    /// Returns the hub configuration.
    #[must_use]
    pub fn config(&self) -> &HubConfig {
        &self.inner.config
    }

    /// Returns the device store.
    #[must_use]
    pub fn store(&self) -> &DeviceStore {
        &self.inner.store
    }

    /// Returns the observer hooks.
    #[must_use]
    pub fn observers(&self) -> &ObserverRegistry {
        &self.inner.observers
    }

    /// Returns the observer dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    // =========================================================================
    // Observer hooks
    // =========================================================================

    /// Sets the hook fired when a sensor unique id is first enumerated.
    pub fn on_sensor_discovered<F>(&self, hook: F)
    where
        F: Fn(&Hub, &UniqueId, &Sensor) + Send + Sync + 'static,
    {
        self.inner.observers.set_sensor_discovered(hook);
    }

    /// Sets the hook fired when a light unique id is first enumerated.
    pub fn on_light_discovered<F>(&self, hook: F)
    where
        F: Fn(&Hub, &UniqueId, &Light) + Send + Sync + 'static,
    {
        self.inner.observers.set_light_discovered(hook);
    }

    /// Sets the hook fired when an event replaces a sensor's state.
    pub fn on_sensor_state_changed<F>(&self, hook: F)
    where
        F: Fn(&Hub, &UniqueId, &DeviceState) + Send + Sync + 'static,
    {
        self.inner.observers.set_sensor_state_changed(hook);
    }

    /// Sets the hook fired when an event replaces a light's state.
    pub fn on_light_state_changed<F>(&self, hook: F)
    where
        F: Fn(&Hub, &UniqueId, &DeviceState) + Send + Sync + 'static,
    {
        self.inner.observers.set_light_state_changed(hook);
    }

    /// Removes every observer hook. Invocations already queued still run.
    pub fn clear_observers(&self) {
        self.inner.observers.clear();
    }

    /// Queues the hook for `notification`, waiting while the dispatch queue
    /// is full.
    async fn notify(&self, notification: Notification) {
        if let Some(job) = self.inner.observers.bind(self, notification) {
            self.inner.dispatcher.submit(job).await;
        }
    }

    // =========================================================================
    // Inventory
    // =========================================================================

    /// Enumerates one device kind and merges the result into the store.
    ///
    /// Safe to call repeatedly; devices missing from a later enumeration stay
    /// in the store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`](crate::Error::Transport) if the request
    /// fails or the hub answers with a non-2xx status, and
    /// [`Error::Decode`](crate::Error::Decode) if the body is not a JSON
    /// object. The store is untouched on error.
    ///
    /// A single entry that does not decode, or has no unique id, is logged
    /// and counted in [`RefreshSummary::skipped`]; the other entries are
    /// still merged.
    pub async fn refresh(&self, kind: DeviceKind) -> Result<RefreshSummary> {
        match kind {
            DeviceKind::Sensor => {
                self.refresh_registry(self.store().sensors(), Notification::SensorDiscovered)
                    .await
            }
            DeviceKind::Light => {
                self.refresh_registry(self.store().lights(), Notification::LightDiscovered)
                    .await
            }
        }
    }

    /// Enumerates sensors.
    ///
    /// # Errors
    ///
    /// See [`refresh`](Self::refresh).
    pub async fn refresh_sensors(&self) -> Result<RefreshSummary> {
        self.refresh(DeviceKind::Sensor).await
    }

    /// Enumerates lights.
    ///
    /// # Errors
    ///
    /// See [`refresh`](Self::refresh).
    pub async fn refresh_lights(&self) -> Result<RefreshSummary> {
        self.refresh(DeviceKind::Light).await
    }

    /// Enumerates sensors, then lights.
    ///
    /// # Errors
    ///
    /// Stops at the first failing refresh; see [`refresh`](Self::refresh).
    pub async fn refresh_all(&self) -> Result<Vec<RefreshSummary>> {
        let mut summaries = Vec::with_capacity(DeviceKind::ALL.len());
        for kind in DeviceKind::ALL {
            summaries.push(self.refresh(kind).await?);
        }
        Ok(summaries)
    }

    async fn refresh_registry<T>(
        &self,
        registry: &Registry<T>,
        discovered: fn(T) -> Notification,
    ) -> Result<RefreshSummary>
    where
        T: DeviceRecord + DeserializeOwned,
    {
        let kind = T::KIND;
        let inventory: BTreeMap<String, Value> =
            self.inner.client.get_json(kind.collection()).await?;

        let mut summary = RefreshSummary {
            kind,
            seen: inventory.len(),
            discovered: 0,
            skipped: 0,
        };

        for (local_id, entry) in inventory {
            let mut record = match serde_json::from_value::<T>(entry) {
                Ok(record) if !record.unique_id().is_empty() => record,
                Ok(_) => {
                    tracing::warn!(%kind, %local_id, "Skipping inventory entry without unique id");
                    summary.skipped += 1;
                    continue;
                }
                Err(e) => {
                    tracing::warn!(
                        %kind,
                        %local_id,
                        error = %e,
                        "Skipping undecodable inventory entry"
                    );
                    summary.skipped += 1;
                    continue;
                }
            };

            record.attach(local_id, self.id());
            if registry.upsert(record.clone()) == Upsert::Inserted {
                tracing::debug!(%kind, unique_id = %record.unique_id(), "Device discovered");
                summary.discovered += 1;
                self.notify(discovered(record)).await;
            }
        }

        tracing::info!(
            %kind,
            seen = summary.seen,
            discovered = summary.discovered,
            skipped = summary.skipped,
            "Inventory refreshed"
        );

        Ok(summary)
    }

    /// Enumerates sensors and lights, then starts the event stream.
    ///
    /// # Errors
    ///
    /// See [`refresh`](Self::refresh). The event stream is only started once
    /// both enumerations succeeded.
    pub async fn scan(&self) -> Result<EventStreamHandle> {
        self.refresh_all().await?;
        Ok(self.start_event_stream())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Returns a snapshot of all known sensors.
    #[must_use]
    pub fn sensors(&self) -> Vec<Sensor> {
        self.store().sensors().list()
    }

    /// Returns a snapshot of all known lights.
    #[must_use]
    pub fn lights(&self) -> Vec<Light> {
        self.store().lights().list()
    }

    /// Returns the sensor with this unique id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) if it is unknown.
    pub fn sensor(&self, unique_id: &str) -> Result<Sensor> {
        self.store().sensors().get(unique_id)
    }

    /// Returns the light with this unique id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) if it is unknown.
    pub fn light(&self, unique_id: &str) -> Result<Light> {
        self.store().lights().get(unique_id)
    }

    // =========================================================================
    // Event stream
    // =========================================================================

    /// Starts the event stream reader.
    ///
    /// Call after the first inventory refresh: events for devices the store
    /// does not know yet are dropped.
    ///
    /// State-changed hooks are queued on the [`Dispatcher`] before the next
    /// frame is read. While the queue is full, reading pauses until a worker
    /// frees room.
    #[must_use]
    pub fn start_event_stream(&self) -> EventStreamHandle {
        self.start_event_stream_with(CancellationToken::new())
    }

    /// Starts the event stream reader, stopped when `cancel` is cancelled.
    #[must_use]
    pub fn start_event_stream_with(&self, cancel: CancellationToken) -> EventStreamHandle {
        event::spawn(self.clone(), cancel)
    }

    /// Decodes one event channel message and applies it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`](crate::Error::Decode) if the message is not
    /// a valid event envelope. Nothing is changed in that case.
    pub async fn handle_message(&self, text: &str) -> Result<EventOutcome> {
        let event = HubEvent::from_json(text)?;
        Ok(self.apply_event(event).await)
    }

    /// Applies a decoded event.
    ///
    /// If the unique id belongs to a known sensor (checked first) or light,
    /// that device's state is replaced by the event's state and the matching
    /// state-changed hook is notified. Otherwise nothing happens.
    pub async fn apply_event(&self, event: HubEvent) -> EventOutcome {
        let Some(unique_id) = event.unique_id else {
            return EventOutcome::Ignored(IgnoreReason::NoUniqueId);
        };

        let Some(kind) = self.store().kind_of(unique_id.as_str()) else {
            tracing::trace!(unique_id = %unique_id, "Event for unknown device dropped");
            return EventOutcome::Ignored(IgnoreReason::UnknownDevice);
        };

        let Some(state) = event.state else {
            return EventOutcome::Ignored(IgnoreReason::NoState);
        };

        // Records are never removed, so the id found above is still there
        if self
            .store()
            .update_state(kind, unique_id.as_str(), state.clone())
            .is_err()
        {
            return EventOutcome::Ignored(IgnoreReason::UnknownDevice);
        }

        tracing::debug!(%kind, unique_id = %unique_id, "Device state replaced");

        self.notify(Notification::StateChanged {
            kind,
            unique_id: unique_id.clone(),
            state,
        })
        .await;

        EventOutcome::Updated { kind, unique_id }
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Changes one state attribute of a device.
    ///
    /// Sends `PUT /api/{username}/{lights|sensors}/{id}/state` with
    /// `{key: value}`. On a 2xx answer the same key is written into the
    /// cached state; otherwise the cache is left as it was. No state-changed
    /// hook fires for this write.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) for an unknown
    /// device, [`CommandError::Rejected`] for a non-2xx answer and
    /// [`CommandError::Transport`] if the hub could not be reached.
    pub async fn set_state(
        &self,
        kind: DeviceKind,
        unique_id: &str,
        key: &str,
        value: impl Into<Value>,
    ) -> Result<()> {
        let value = value.into();
        let local_id = match kind {
            DeviceKind::Sensor => self.sensor(unique_id)?.id().to_string(),
            DeviceKind::Light => self.light(unique_id)?.id().to_string(),
        };

        let path = format!(
            "{}/{}/state",
            kind.collection(),
            urlencoding::encode(&local_id)
        );
        let mut body = serde_json::Map::new();
        body.insert(key.to_string(), value.clone());

        let status = self
            .inner
            .client
            .put_json(&path, &body)
            .await
            .map_err(CommandError::Transport)?;

        if !status.is_success() {
            tracing::warn!(%kind, unique_id, key, status = status.as_u16(), "State change rejected");
            return Err(CommandError::Rejected {
                status: status.as_u16(),
            }
            .into());
        }

        self.store().set_state_value(kind, unique_id, key, value)?;
        tracing::debug!(%kind, unique_id, key, "State change applied");
        Ok(())
    }

    /// Turns a light on or off.
    ///
    /// # Errors
    ///
    /// See [`set_state`](Self::set_state).
    pub async fn set_power(&self, unique_id: &str, on: bool) -> Result<()> {
        self.set_state(DeviceKind::Light, unique_id, "on", on).await
    }

    /// Sets a light's brightness (0-255).
    ///
    /// # Errors
    ///
    /// See [`set_state`](Self::set_state).
    pub async fn set_brightness(&self, unique_id: &str, brightness: u8) -> Result<()> {
        self.set_state(DeviceKind::Light, unique_id, "bri", brightness)
            .await
    }
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("id", &self.inner.id)
            .field("host", &self.inner.config.host())
            .field("sensors", &self.inner.store.sensors().len())
            .field("lights", &self.inner.store.lights().len())
            .finish_non_exhaustive()
    }
}
