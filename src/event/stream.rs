// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event stream reader task.

use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::Hub;
use crate::error::{Error, TransportError};
use crate::protocol::{ChannelFrame, EventChannel};

/// Lifecycle of the event stream reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Opening the event channel.
    Connecting,
    /// Reading events.
    Connected,
    /// Waiting before the next connection attempt.
    Reconnecting {
        /// 1-based retry number.
        attempt: u32,
        /// Delay before the retry.
        delay: Duration,
    },
    /// The reader has exited.
    Stopped,
}

/// Handle to a running event stream reader.
///
/// The reader runs until [`shutdown`](Self::shutdown) is called or the
/// reconnection policy gives up. Dropping the handle does not stop it.
///
/// # Examples
///
/// ```no_run
/// use deconz_lib::Hub;
/// use deconz_lib::config::HubConfig;
///
/// # async fn example() -> deconz_lib::Result<()> {
/// let hub = Hub::new(HubConfig::new("192.168.1.20", "0A1B2C3D4E"))?;
/// hub.refresh_all().await?;
///
/// let stream = hub.start_event_stream();
/// // ... later
/// stream.shutdown();
/// stream.join().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct EventStreamHandle {
    cancel: CancellationToken,
    state: watch::Receiver<StreamState>,
    task: JoinHandle<Result<(), Error>>,
}

impl EventStreamHandle {
    /// Asks the reader to stop. The connection is closed promptly.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Returns the token that stops the reader when cancelled.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Returns the current reader state.
    #[must_use]
    pub fn state(&self) -> StreamState {
        *self.state.borrow()
    }

    /// Returns a receiver notified on every reader state change.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<StreamState> {
        self.state.clone()
    }

    /// Returns `true` once the reader task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the reader to exit.
    ///
    /// # Errors
    ///
    /// Returns the error that ended the reader: the last transport error when
    /// reconnection is disabled, or [`TransportError::ReconnectExhausted`].
    pub async fn join(self) -> Result<(), Error> {
        match self.task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Ok(()),
        }
    }
}

/// Spawns the reader task for `hub`.
pub(crate) fn spawn(hub: Hub, cancel: CancellationToken) -> EventStreamHandle {
    let (state_tx, state_rx) = watch::channel(StreamState::Connecting);
    let task = tokio::spawn(run(hub, cancel.clone(), state_tx));

    EventStreamHandle {
        cancel,
        state: state_rx,
        task,
    }
}

/// Main loop: connect, read, and on failure back off and reconnect.
async fn run(
    hub: Hub,
    cancel: CancellationToken,
    state_tx: watch::Sender<StreamState>,
) -> Result<(), Error> {
    let url = hub.config().websocket_url();
    let policy = hub.config().reconnection().clone();
    let mut attempt: u32 = 0;

    let result = loop {
        state_tx.send_replace(StreamState::Connecting);

        let error = match connect_and_read(
            &hub,
            &url,
            &cancel,
            &state_tx,
            &mut attempt,
            policy.max_delay(),
        )
        .await
        {
            Ok(()) => break Ok(()),
            Err(e) => e,
        };

        tracing::warn!(error = %error, attempt, "Event channel failed");

        if !policy.is_enabled() {
            break Err(error.into());
        }

        if !policy.should_retry(attempt) {
            tracing::error!(
                attempts = attempt,
                "Event channel reconnection limit reached, giving up"
            );
            break Err(TransportError::ReconnectExhausted { attempts: attempt }.into());
        }

        let delay = policy.delay_for_attempt(attempt);
        attempt += 1;
        state_tx.send_replace(StreamState::Reconnecting { attempt, delay });
        tracing::info!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            attempt,
            "Waiting before reconnect"
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => break Ok(()),
            () = tokio::time::sleep(delay) => {}
        }
    };

    state_tx.send_replace(StreamState::Stopped);
    tracing::debug!("Event stream reader exiting");
    result
}

/// Runs one connection until it fails or the reader is cancelled.
///
/// Returns `Ok(())` only on cancellation. A close by the hub counts as a
/// failure so that it goes through the backoff.
///
/// The failure count in `attempt` is cleared only once the connection proved
/// stable: it delivered an event, or it stayed up for `stable_after`. A hub
/// that accepts and drops connections in a loop keeps backing off.
async fn connect_and_read(
    hub: &Hub,
    url: &str,
    cancel: &CancellationToken,
    state_tx: &watch::Sender<StreamState>,
    attempt: &mut u32,
    stable_after: Duration,
) -> Result<(), TransportError> {
    let channel = tokio::select! {
        biased;
        () = cancel.cancelled() => return Ok(()),
        channel = EventChannel::connect(url, hub.config().idle_timeout()) => channel?,
    };

    state_tx.send_replace(StreamState::Connected);
    let connected_at = Instant::now();
    let mut received = false;

    let result = read_frames(hub, channel, cancel, &mut received).await;

    if received || connected_at.elapsed() >= stable_after {
        if *attempt > 0 {
            tracing::debug!(attempt = *attempt, "Event channel stable, failure count cleared");
        }
        *attempt = 0;
    }

    result
}

/// Reads frames until the channel fails, the hub closes it, or `cancel`
/// fires. Sets `received` on the first text frame.
async fn read_frames(
    hub: &Hub,
    mut channel: EventChannel,
    cancel: &CancellationToken,
    received: &mut bool,
) -> Result<(), TransportError> {
    loop {
        let frame = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                channel.close().await;
                return Ok(());
            }
            frame = channel.next_frame() => frame?,
        };

        match frame {
            ChannelFrame::Text(text) => {
                *received = true;
                match hub.handle_message(&text).await {
                    Ok(outcome) => tracing::trace!(?outcome, "Event processed"),
                    Err(e) => tracing::warn!(error = %e, "Skipping undecodable event"),
                }
            }
            ChannelFrame::Closed => {
                return Err(TransportError::WebSocket(
                    "connection closed by hub".to_string(),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HubConfig, ReconnectionPolicy};

    fn unreachable_hub(policy: ReconnectionPolicy) -> Hub {
        // Port 1 on loopback refuses connections immediately
        let config = HubConfig::new("127.0.0.1", "KEY")
            .with_websocket_port(1)
            .with_reconnection(policy);
        Hub::new(config).unwrap()
    }

    #[tokio::test]
    async fn disabled_policy_stops_on_first_failure() {
        let hub = unreachable_hub(ReconnectionPolicy::disabled());
        let handle = spawn(hub, CancellationToken::new());

        let err = handle.join().await.unwrap_err();
        assert!(matches!(err, Error::Transport(TransportError::WebSocket(_))));
    }

    #[tokio::test]
    async fn retries_until_policy_is_exhausted() {
        let policy = ReconnectionPolicy::new()
            .with_max_retries(2)
            .with_initial_delay(Duration::from_millis(10))
            .with_max_delay(Duration::from_millis(20));
        let hub = unreachable_hub(policy);
        let handle = spawn(hub, CancellationToken::new());
        let state = handle.watch_state();

        let err = handle.join().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Transport(TransportError::ReconnectExhausted { attempts: 2 })
        ));
        assert_eq!(*state.borrow(), StreamState::Stopped);
    }

    #[tokio::test]
    async fn shutdown_during_backoff_ends_cleanly() {
        let policy = ReconnectionPolicy::new()
            .with_infinite_retries()
            .with_initial_delay(Duration::from_secs(3600));
        let hub = unreachable_hub(policy);
        let handle = spawn(hub, CancellationToken::new());
        let mut state = handle.watch_state();

        tokio::time::timeout(
            Duration::from_secs(5),
            state.wait_for(|s| matches!(s, StreamState::Reconnecting { .. })),
        )
        .await
        .unwrap()
        .unwrap();

        handle.shutdown();
        assert!(handle.join().await.is_ok());
    }
}
