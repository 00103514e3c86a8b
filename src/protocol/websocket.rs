// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! WebSocket event channel.

use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::TransportError;

/// A frame read from the event channel that the caller has to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelFrame {
    /// A text payload (one event envelope).
    Text(String),
    /// The hub closed the connection or the stream ended.
    Closed,
}

/// One live connection to the hub's event channel.
///
/// Control frames are handled internally. When no frame arrives for
/// `idle_timeout`, a ping is sent; if the following window also passes
/// without any frame, the connection is reported dead with
/// [`TransportError::IdleTimeout`]. The ping itself must be written within
/// `idle_timeout` too.
#[derive(Debug)]
pub struct EventChannel {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    idle_timeout: Duration,
}

impl EventChannel {
    /// Opens the event channel at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::WebSocket`] if the handshake fails.
    pub async fn connect(url: &str, idle_timeout: Duration) -> Result<Self, TransportError> {
        tracing::info!(url = %url, "Connecting to event channel");

        let (stream, _response) = tokio_tungstenite::connect_async(url).await?;

        tracing::info!("Event channel connected");

        Ok(Self {
            stream,
            idle_timeout,
        })
    }

    /// Waits for the next text frame.
    ///
    /// Cancel-safe: dropping the future loses no text frame.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::WebSocket`] on socket failure and
    /// [`TransportError::IdleTimeout`] when the ping cannot be written or
    /// goes unanswered.
    pub async fn next_frame(&mut self) -> Result<ChannelFrame, TransportError> {
        let mut pinged = false;

        loop {
            let Ok(next) = tokio::time::timeout(self.idle_timeout, self.stream.next()).await
            else {
                if pinged {
                    return Err(TransportError::IdleTimeout(as_millis(self.idle_timeout)));
                }
                tracing::debug!("Event channel idle, sending ping");
                send_within(
                    &mut self.stream,
                    Message::Ping(Default::default()),
                    self.idle_timeout,
                )
                .await?;
                pinged = true;
                continue;
            };

            match next {
                None => {
                    tracing::info!("Event channel stream ended");
                    return Ok(ChannelFrame::Closed);
                }
                Some(Err(e)) => return Err(e.into()),
                Some(Ok(Message::Text(text))) => {
                    return Ok(ChannelFrame::Text(text.as_str().to_owned()));
                }
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Ok(ChannelFrame::Text(text)),
                    Err(_) => {
                        tracing::debug!(len = bytes.len(), "Ignoring non UTF-8 binary frame");
                        pinged = false;
                    }
                },
                Some(Ok(Message::Close(frame))) => {
                    match frame {
                        Some(cf) => tracing::info!(
                            code = %cf.code,
                            reason = %cf.reason,
                            "Event channel close frame received"
                        ),
                        None => tracing::info!("Event channel close frame received"),
                    }
                    return Ok(ChannelFrame::Closed);
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {
                    // tungstenite answers pings itself
                    pinged = false;
                }
            }
        }
    }

    /// Sends a close frame and shuts the connection down.
    ///
    /// Gives up after `idle_timeout` if the peer stops reading.
    pub async fn close(mut self) {
        match tokio::time::timeout(self.idle_timeout, self.stream.close(None)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!(error = %e, "Event channel close failed"),
            Err(_) => tracing::debug!("Event channel close timed out"),
        }
    }
}

/// Writes one frame, failing with [`TransportError::IdleTimeout`] if the
/// sink does not accept it within `limit`.
async fn send_within<S>(
    sink: &mut S,
    message: Message,
    limit: Duration,
) -> Result<(), TransportError>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    match tokio::time::timeout(limit, sink.send(message)).await {
        Ok(sent) => Ok(sent?),
        Err(_) => {
            tracing::debug!("Event channel write stalled");
            Err(TransportError::IdleTimeout(as_millis(limit)))
        }
    }
}

fn as_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
