//! WebSocket depth stream reader.
//!
//! A spawned task that connects to the diff-depth stream, decodes
//! frames, and pushes `depthUpdate` events into the shared queue. Frames
//! of any other kind are dropped silently; undecodable frames are logged
//! and skipped. A transport failure cancels the shared token so the
//! synchronizer shuts down with it.

use crate::config::UpdateSpeed;
use crate::constants::endpoints;
use crate::error::{FeedError, Result};
use aether_core::{BufferedEvent, DepthEvent, EventQueue};
use futures_util::StreamExt;
use serde_json::Value;
use std::sync::Arc;
use std::sync::OnceLock;
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Builds the diff-depth stream URL for a lowercase symbol.
pub fn stream_url(symbol: &str, speed: UpdateSpeed) -> String {
    format!(
        "{}/{}@depth{}",
        endpoints::WS_BASE,
        symbol,
        speed.stream_suffix()
    )
}

/// Spawns the reader task.
///
/// The task runs until the token is cancelled or the transport fails;
/// on failure it cancels the token itself so the rest of the feed stops.
pub fn spawn_depth_reader(
    url: String,
    queue: Arc<EventQueue>,
    cancel: CancellationToken,
) -> JoinHandle<Result<()>> {
    tokio::spawn(async move {
        let result = run_depth_reader(&url, &queue, &cancel).await;
        if let Err(ref err) = result {
            warn!(%err, "depth reader terminated");
            cancel.cancel();
        }
        result
    })
}

async fn run_depth_reader(
    url: &str,
    queue: &EventQueue,
    cancel: &CancellationToken,
) -> Result<()> {
    let (mut stream, _response) = connect_async(url).await?;
    info!(%url, "depth stream connected");

    let mut received: u64 = 0;
    loop {
        let frame = tokio::select! {
            () = cancel.cancelled() => break,
            frame = stream.next() => frame,
        };

        match frame {
            Some(Ok(Message::Text(text))) => {
                enqueue_depth_event(&text, queue, &mut received);
            }
            // tungstenite queues the pong reply itself
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
            Some(Ok(Message::Close(frame))) => {
                warn!(?frame, "depth stream closed by server");
                return Err(FeedError::WebSocket(
                    tokio_tungstenite::tungstenite::Error::ConnectionClosed,
                ));
            }
            Some(Ok(_)) => {}
            Some(Err(err)) => {
                warn!(%err, "depth stream read error");
                return Err(err.into());
            }
            None => {
                warn!("depth stream ended");
                return Err(FeedError::WebSocket(
                    tokio_tungstenite::tungstenite::Error::ConnectionClosed,
                ));
            }
        }
    }

    let _ = stream.close(None).await;
    info!(received, "depth reader stopped");
    Ok(())
}

fn enqueue_depth_event(text: &str, queue: &EventQueue, received: &mut u64) {
    let recv_ts_us = monotonic_micros();

    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(err) => {
            warn!(%err, "dropping undecodable frame");
            return;
        }
    };
    if value.get("e").and_then(Value::as_str) != Some("depthUpdate") {
        return;
    }
    let event: DepthEvent = match serde_json::from_value(value) {
        Ok(event) => event,
        Err(err) => {
            warn!(%err, "dropping malformed depthUpdate");
            return;
        }
    };

    queue.push(BufferedEvent {
        event,
        raw: text.to_string(),
        recv_ts_us,
    });
    *received += 1;
    if *received % 10_000 == 0 {
        debug!(received = *received, "depth events received");
    }
}

fn monotonic_micros() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START.get_or_init(Instant::now).elapsed().as_micros() as u64
}
