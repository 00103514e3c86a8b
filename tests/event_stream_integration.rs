// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the event stream against a local WebSocket server.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use deconz_lib::{
    DeviceState, Error, Hub, HubConfig, Light, ReconnectionPolicy, Sensor, StreamState,
    TransportError, UniqueId,
};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

const WAIT: Duration = Duration::from_secs(5);

async fn listen() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

async fn accept(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (stream, _) = listener.accept().await.unwrap();
    tokio_tungstenite::accept_async(stream).await.unwrap()
}

async fn send_all(ws: &mut WebSocketStream<TcpStream>, frames: &[&str]) {
    for frame in frames {
        ws.send(Message::Text((*frame).to_string().into()))
            .await
            .unwrap();
    }
}

/// Reads until the client goes away, answering pings along the way.
async fn drain(mut ws: WebSocketStream<TcpStream>) {
    while let Some(Ok(_)) = ws.next().await {}
}

/// Accepts one connection, sends `frames`, then keeps it open.
fn serve_once(listener: TcpListener, frames: Vec<&'static str>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        send_all(&mut ws, &frames).await;
        drain(ws).await;
    })
}

fn hub_on(port: u16, policy: ReconnectionPolicy) -> Hub {
    let config = HubConfig::new("127.0.0.1", "KEY")
        .with_websocket_port(port)
        .with_reconnection(policy);
    Hub::new(config).unwrap()
}

fn fast_retries(max_retries: u32) -> ReconnectionPolicy {
    ReconnectionPolicy::new()
        .with_max_retries(max_retries)
        .with_initial_delay(Duration::from_millis(10))
        .with_max_delay(Duration::from_millis(50))
}

fn state_changes(hub: &Hub) -> mpsc::UnboundedReceiver<(UniqueId, DeviceState)> {
    let (tx, rx) = mpsc::unbounded_channel();
    let light_tx = tx.clone();
    hub.on_sensor_state_changed(move |_, id, state| {
        let _ = tx.send((id.clone(), state.clone()));
    });
    hub.on_light_state_changed(move |_, id, state| {
        let _ = light_tx.send((id.clone(), state.clone()));
    });
    rx
}

async fn next_change(
    rx: &mut mpsc::UnboundedReceiver<(UniqueId, DeviceState)>,
) -> (UniqueId, DeviceState) {
    tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap()
}

// ============================================================================
// Message handling
// ============================================================================

mod messages {
    use super::*;

    #[tokio::test]
    async fn malformed_message_is_skipped() {
        let (listener, port) = listen().await;
        let server = serve_once(
            listener,
            vec![
                "{\"uniqueid\": \"AA:BB\", \"state\": ",
                r#"{"e":"changed","r":"sensors","t":"event","uniqueid":"AA:BB","state":{"temperature":210}}"#,
            ],
        );

        let hub = hub_on(port, ReconnectionPolicy::disabled());
        let mut sensor = Sensor::new("AA:BB");
        sensor.state.set("temperature", 205);
        hub.store().sensors().upsert(sensor);
        let mut changes = state_changes(&hub);

        let stream = hub.start_event_stream();

        let (unique_id, state) = next_change(&mut changes).await;
        assert_eq!(unique_id.as_str(), "AA:BB");
        assert_eq!(state.get_i64("temperature"), Some(210));
        assert_eq!(
            hub.sensor("AA:BB").unwrap().state.get_i64("temperature"),
            Some(210)
        );

        stream.shutdown();
        assert!(stream.join().await.is_ok());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn unknown_device_is_dropped() {
        let (listener, port) = listen().await;
        let server = serve_once(
            listener,
            vec![
                r#"{"e":"changed","uniqueid":"NOBODY","state":{"on":true}}"#,
                r#"{"e":"changed","uniqueid":"L1","state":{"on":true,"bri":80}}"#,
            ],
        );

        let hub = hub_on(port, ReconnectionPolicy::disabled());
        hub.store().lights().upsert(Light::new("L1"));
        let mut changes = state_changes(&hub);

        let stream = hub.start_event_stream();

        let (unique_id, state) = next_change(&mut changes).await;
        assert_eq!(unique_id.as_str(), "L1");
        assert_eq!(state.brightness(), Some(80));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(changes.try_recv().is_err());
        assert!(hub.light("NOBODY").is_err());
        assert!(hub.sensor("NOBODY").is_err());
        assert_eq!(hub.lights().len(), 1);

        stream.shutdown();
        stream.join().await.unwrap();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn events_are_applied_in_arrival_order() {
        let (listener, port) = listen().await;
        let server = serve_once(
            listener,
            vec![
                r#"{"uniqueid":"L1","state":{"bri":1}}"#,
                r#"{"uniqueid":"L1","state":{"bri":2}}"#,
                r#"{"uniqueid":"L1","state":{"bri":3}}"#,
            ],
        );

        let hub = hub_on(port, ReconnectionPolicy::disabled());
        hub.store().lights().upsert(Light::new("L1"));
        let mut changes = state_changes(&hub);

        let stream = hub.start_event_stream();

        let mut seen = Vec::new();
        for _ in 0..3 {
            let (_, state) = next_change(&mut changes).await;
            seen.push(state.brightness());
        }
        seen.sort_unstable();
        assert_eq!(seen, vec![Some(1), Some(2), Some(3)]);
        assert_eq!(hub.light("L1").unwrap().state.brightness(), Some(3));

        stream.shutdown();
        stream.join().await.unwrap();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn binary_utf8_frames_are_read_as_text() {
        let (listener, port) = listen().await;
        let server = tokio::spawn(async move {
            let mut ws = accept(&listener).await;
            let payload = br#"{"uniqueid":"S1","state":{"presence":true}}"#.to_vec();
            ws.send(Message::Binary(payload.into())).await.unwrap();
            drain(ws).await;
        });

        let hub = hub_on(port, ReconnectionPolicy::disabled());
        hub.store().sensors().upsert(Sensor::new("S1"));
        let mut changes = state_changes(&hub);

        let stream = hub.start_event_stream();

        let (_, state) = next_change(&mut changes).await;
        assert_eq!(state.get_bool("presence"), Some(true));

        stream.shutdown();
        stream.join().await.unwrap();
        server.await.unwrap();
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn shutdown_while_connected() {
        let (listener, port) = listen().await;
        let server = serve_once(listener, Vec::new());

        let hub = hub_on(port, ReconnectionPolicy::new());
        let stream = hub.start_event_stream();
        let mut state = stream.watch_state();

        tokio::time::timeout(WAIT, state.wait_for(|s| *s == StreamState::Connected))
            .await
            .unwrap()
            .unwrap();

        stream.shutdown();
        assert!(stream.join().await.is_ok());
        assert_eq!(*state.borrow(), StreamState::Stopped);

        // The server side sees the connection go away
        tokio::time::timeout(WAIT, server).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn external_token_stops_the_reader() {
        let (listener, port) = listen().await;
        let server = serve_once(listener, Vec::new());

        let hub = hub_on(port, ReconnectionPolicy::new());
        let token = tokio_util::sync::CancellationToken::new();
        let stream = hub.start_event_stream_with(token.child_token());
        let mut state = stream.watch_state();

        tokio::time::timeout(WAIT, state.wait_for(|s| *s == StreamState::Connected))
            .await
            .unwrap()
            .unwrap();

        token.cancel();
        tokio::time::timeout(WAIT, stream.join())
            .await
            .unwrap()
            .unwrap();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn reconnects_after_hub_closes() {
        let (listener, port) = listen().await;
        let server = tokio::spawn(async move {
            let mut first = accept(&listener).await;
            first.close(None).await.unwrap();
            drop(first);

            let mut second = accept(&listener).await;
            send_all(&mut second, &[r#"{"uniqueid":"L1","state":{"on":true}}"#]).await;
            drain(second).await;
        });

        let hub = hub_on(port, fast_retries(3));
        hub.store().lights().upsert(Light::new("L1"));
        let mut changes = state_changes(&hub);

        let stream = hub.start_event_stream();

        let (unique_id, state) = next_change(&mut changes).await;
        assert_eq!(unique_id.as_str(), "L1");
        assert_eq!(state.on(), Some(true));
        assert_eq!(stream.state(), StreamState::Connected);

        stream.shutdown();
        stream.join().await.unwrap();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn flapping_hub_still_exhausts_retries() {
        let (listener, port) = listen().await;
        let accepted = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&accepted);
        let server = tokio::spawn(async move {
            loop {
                let mut ws = accept(&listener).await;
                counter.fetch_add(1, Ordering::SeqCst);
                let _ = ws.close(None).await;
            }
        });

        // Ceiling well above a local accept/close cycle, so no connection
        // counts as stable
        let policy = ReconnectionPolicy::new()
            .with_max_retries(2)
            .with_initial_delay(Duration::from_millis(10))
            .with_max_delay(Duration::from_secs(2));
        let hub = hub_on(port, policy);
        let stream = hub.start_event_stream();

        let err = tokio::time::timeout(WAIT, stream.join())
            .await
            .unwrap()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Transport(TransportError::ReconnectExhausted { attempts: 2 })
        ));
        assert_eq!(accepted.load(Ordering::SeqCst), 3);
        server.abort();
    }

    #[tokio::test]
    async fn delivered_event_clears_failure_count() {
        let (listener, port) = listen().await;
        let accepted = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&accepted);
        let server = tokio::spawn(async move {
            // Each of the first four connections delivers one event, then drops
            for _ in 0..4 {
                let mut ws = accept(&listener).await;
                counter.fetch_add(1, Ordering::SeqCst);
                send_all(&mut ws, &[r#"{"uniqueid":"L1","state":{"on":true}}"#]).await;
                let _ = ws.close(None).await;
            }
            let ws = accept(&listener).await;
            counter.fetch_add(1, Ordering::SeqCst);
            drain(ws).await;
        });

        // A single allowed retry: four drops in a row are only survivable
        // if every delivered event clears the count
        let policy = ReconnectionPolicy::new()
            .with_max_retries(1)
            .with_initial_delay(Duration::from_millis(10))
            .with_max_delay(Duration::from_secs(2));
        let hub = hub_on(port, policy);
        hub.store().lights().upsert(Light::new("L1"));
        let stream = hub.start_event_stream();

        tokio::time::timeout(WAIT, async {
            while accepted.load(Ordering::SeqCst) < 5 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        assert!(!stream.is_finished());
        assert_eq!(hub.light("L1").unwrap().state.on(), Some(true));

        stream.shutdown();
        stream.join().await.unwrap();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn gives_up_when_hub_stays_away() {
        let (listener, port) = listen().await;
        let server = tokio::spawn(async move {
            let mut ws = accept(&listener).await;
            ws.close(None).await.unwrap();
            // Dropping the listener makes every reconnect attempt fail
        });

        let hub = hub_on(port, fast_retries(2));
        let stream = hub.start_event_stream();

        let err = tokio::time::timeout(WAIT, stream.join())
            .await
            .unwrap()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Transport(TransportError::ReconnectExhausted { attempts: 2 })
        ));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn silent_hub_fails_liveness_check() {
        let (listener, port) = listen().await;
        let server = tokio::spawn(async move {
            // Accept, then never read so pings stay unanswered
            let ws = accept(&listener).await;
            tokio::time::sleep(Duration::from_secs(3)).await;
            drop(ws);
        });

        let config = HubConfig::new("127.0.0.1", "KEY")
            .with_websocket_port(port)
            .with_idle_timeout(Duration::from_millis(100))
            .with_reconnection(ReconnectionPolicy::disabled());
        let hub = Hub::new(config).unwrap();
        let stream = hub.start_event_stream();

        let err = tokio::time::timeout(WAIT, stream.join())
            .await
            .unwrap()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Transport(TransportError::IdleTimeout(100))
        ));
        server.abort();
    }
}
