// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hub connection configuration.
//!
//! The library reads no configuration files or environment variables.
//! Callers build a [`HubConfig`] with the hub address and API key, and
//! optionally tune timeouts, reconnection and observer dispatch.

use std::time::Duration;

/// Configuration for a deCONZ hub connection.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use deconz_lib::config::{HubConfig, ReconnectionPolicy};
///
/// // Minimal configuration
/// let config = HubConfig::new("192.168.1.20", "0A1B2C3D4E");
///
/// // With all options
/// let config = HubConfig::new("192.168.1.20", "0A1B2C3D4E")
///     .with_http_port(8080)
///     .with_websocket_port(8088)
///     .with_timeout(Duration::from_secs(5))
///     .with_idle_timeout(Duration::from_secs(30))
///     .with_reconnection(ReconnectionPolicy::new().with_max_retries(3))
///     .with_dispatch_capacity(64)
///     .with_dispatch_workers(2);
///
/// assert_eq!(config.base_url(), "http://192.168.1.20:8080");
/// assert_eq!(config.websocket_url(), "ws://192.168.1.20:8088/");
/// ```
#[derive(Debug, Clone)]
pub struct HubConfig {
    host: String,
    username: String,
    http_port: u16,
    websocket_port: u16,
    timeout: Duration,
    idle_timeout: Duration,
    reconnection: ReconnectionPolicy,
    dispatch_capacity: usize,
    dispatch_workers: usize,
}

impl HubConfig {
    /// Default REST port.
    pub const DEFAULT_HTTP_PORT: u16 = 80;
    /// Default event channel port.
    pub const DEFAULT_WEBSOCKET_PORT: u16 = 443;
    /// Default REST request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
    /// Default silence window before the event channel is pinged.
    pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);
    /// Default observer queue capacity.
    pub const DEFAULT_DISPATCH_CAPACITY: usize = 256;
    /// Default number of observer workers.
    pub const DEFAULT_DISPATCH_WORKERS: usize = 4;

    /// Creates a configuration for the hub at `host`, authenticated with the
    /// API key `username`.
    #[must_use]
    pub fn new(host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            http_port: Self::DEFAULT_HTTP_PORT,
            websocket_port: Self::DEFAULT_WEBSOCKET_PORT,
            timeout: Self::DEFAULT_TIMEOUT,
            idle_timeout: Self::DEFAULT_IDLE_TIMEOUT,
            reconnection: ReconnectionPolicy::default(),
            dispatch_capacity: Self::DEFAULT_DISPATCH_CAPACITY,
            dispatch_workers: Self::DEFAULT_DISPATCH_WORKERS,
        }
    }

    /// Sets the REST port.
    #[must_use]
    pub fn with_http_port(mut self, port: u16) -> Self {
        self.http_port = port;
        self
    }

    /// Sets the event channel port.
    #[must_use]
    pub fn with_websocket_port(mut self, port: u16) -> Self {
        self.websocket_port = port;
        self
    }

    /// Sets the REST request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the event channel liveness window.
    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Sets the event channel reconnection policy.
    #[must_use]
    pub fn with_reconnection(mut self, policy: ReconnectionPolicy) -> Self {
        self.reconnection = policy;
        self
    }

    /// Sets how many observer notifications may be queued.
    ///
    /// Values below 1 are raised to 1.
    #[must_use]
    pub fn with_dispatch_capacity(mut self, capacity: usize) -> Self {
        self.dispatch_capacity = capacity.max(1);
        self
    }

    /// Sets how many observer hooks may run at once.
    ///
    /// Values below 1 are raised to 1.
    #[must_use]
    pub fn with_dispatch_workers(mut self, workers: usize) -> Self {
        self.dispatch_workers = workers.max(1);
        self
    }

    /// Returns the hub host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the API key.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the REST port.
    #[must_use]
    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    /// Returns the event channel port.
    #[must_use]
    pub fn websocket_port(&self) -> u16 {
        self.websocket_port
    }

    /// Returns the REST request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the event channel liveness window.
    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Returns the reconnection policy.
    #[must_use]
    pub fn reconnection(&self) -> &ReconnectionPolicy {
        &self.reconnection
    }

    /// Returns the observer queue capacity.
    #[must_use]
    pub fn dispatch_capacity(&self) -> usize {
        self.dispatch_capacity
    }

    /// Returns the number of observer workers.
    #[must_use]
    pub fn dispatch_workers(&self) -> usize {
        self.dispatch_workers
    }

    /// Builds the REST base URL.
    #[must_use]
    pub fn base_url(&self) -> String {
        if self.http_port == Self::DEFAULT_HTTP_PORT {
            format!("http://{}", self.host)
        } else {
            format!("http://{}:{}", self.host, self.http_port)
        }
    }

    /// Builds the URL of an API resource below `/api/{username}`.
    ///
    /// # Examples
    ///
    /// ```
    /// use deconz_lib::config::HubConfig;
    ///
    /// let config = HubConfig::new("hub.local", "KEY");
    /// assert_eq!(config.api_url("lights/3/state"), "http://hub.local/api/KEY/lights/3/state");
    /// ```
    #[must_use]
    pub fn api_url(&self, path: &str) -> String {
        format!(
            "{}/api/{}/{}",
            self.base_url(),
            urlencoding::encode(&self.username),
            path.trim_start_matches('/')
        )
    }

    /// Builds the event channel URL.
    #[must_use]
    pub fn websocket_url(&self) -> String {
        format!("ws://{}:{}/", self.host, self.websocket_port)
    }
}

/// How the event stream reader retries after losing the event channel.
///
/// The wait before retry `n` (0-based) is `initial_delay * multiplier^n`,
/// never more than `max_delay`. Consecutive failures are counted from the
/// last successful connection. After `max_retries` of them the reader stops
/// with [`TransportError::ReconnectExhausted`](crate::error::TransportError::ReconnectExhausted);
/// a disabled policy stops it on the first failure instead.
///
/// ```
/// use std::time::Duration;
/// use deconz_lib::config::ReconnectionPolicy;
///
/// let policy = ReconnectionPolicy::new()
///     .with_max_retries(4)
///     .with_initial_delay(Duration::from_millis(250))
///     .with_max_delay(Duration::from_secs(1));
///
/// assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(500));
/// assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(1));
/// assert!(!policy.should_retry(4));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectionPolicy {
    enabled: bool,
    max_retries: Option<u32>,
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
}

impl ReconnectionPolicy {
    /// Retry up to 10 times, from 1 s doubling up to 60 s.
    #[must_use]
    pub fn new() -> Self {
        Self {
            enabled: true,
            max_retries: Some(10),
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
        }
    }

    /// Never reconnect; the first failure ends the reader.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new()
        }
    }

    /// Gives up after `max_retries` consecutive failed retries.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Never gives up.
    #[must_use]
    pub fn with_infinite_retries(mut self) -> Self {
        self.max_retries = None;
        self
    }

    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the growth factor between two retries. Values below 1 are
    /// raised to 1.
    #[must_use]
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = if multiplier.is_nan() { 1.0 } else { multiplier.max(1.0) };
        self
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn max_retries(&self) -> Option<u32> {
        self.max_retries
    }

    #[must_use]
    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    #[must_use]
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    #[must_use]
    pub fn backoff_multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Wait before retry number `attempt` (0-based).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let factor = self.multiplier.powi(exponent);

        // Overflow and infinity both land on the ceiling
        Duration::try_from_secs_f64(self.initial_delay.as_secs_f64() * factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Whether retry number `attempt` (0-based) is allowed.
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> bool {
        if !self.enabled {
            return false;
        }
        match self.max_retries {
            Some(limit) => attempt < limit,
            None => true,
        }
    }
}

impl Default for ReconnectionPolicy {
    fn default() -> Self {
        Self::new()
    }
}
