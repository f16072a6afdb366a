//! Snapshot/stream synchronizer.
//!
//! Implements the Binance diff-depth reconciliation protocol: buffer
//! stream events, fetch a REST snapshot at least as new as the first
//! buffered event, discard events the snapshot already reflects, verify
//! the first survivor straddles `lastUpdateId + 1`, apply the backlog,
//! then follow the live stream. Every applied event (and the snapshot
//! itself) is republished into the ring when one is attached.

use crate::config::FeedConfig;
use crate::error::{FeedError, Result};
use crate::rest::SnapshotClient;
use aether_core::ring::{MSG_DEPTH_UPDATE, MSG_SNAPSHOT};
use aether_core::{
    format_fixed, ApplyOutcome, BufferedEvent, DepthSnapshot, EventQueue, OrderBook, Ring,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Backoff schedule for ring publish retries, in milliseconds.
const PUBLISH_RETRY_DELAYS_MS: [u64; 3] = [10, 20, 30];

/// Depth shown in periodic top-of-book logs.
const LOG_DEPTH: usize = 5;

/// Tunables for the synchronization protocol.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Events to gather before reading the first `U` (phase 1).
    pub min_events: usize,
    /// Grace period once at least one event is buffered (phase 1).
    pub initial_grace: Duration,
    /// Overall phase-1 timeout.
    pub initial_timeout: Duration,
    /// Phase-1 polling cadence.
    pub poll_interval: Duration,
    /// Sleep between snapshot attempts (phase 2).
    pub snapshot_retry_delay: Duration,
    /// Consecutive snapshot failures tolerated before giving up.
    pub max_snapshot_attempts: u32,
    /// Depth levels requested from the snapshot endpoint.
    pub snapshot_depth_limit: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            min_events: 5,
            initial_grace: Duration::from_millis(100),
            initial_timeout: Duration::from_millis(500),
            poll_interval: Duration::from_millis(50),
            snapshot_retry_delay: Duration::from_secs(1),
            max_snapshot_attempts: 120,
            snapshot_depth_limit: crate::constants::defaults::SNAPSHOT_DEPTH_LIMIT,
        }
    }
}

/// Phase 3: drops buffered events the snapshot already reflects and
/// verifies the first survivor covers `last_update_id + 1`.
///
/// An empty result is valid: the feed proceeds with the snapshot only.
pub fn select_backlog(
    mut events: Vec<BufferedEvent>,
    last_update_id: u64,
) -> Result<Vec<BufferedEvent>> {
    let stale = events
        .iter()
        .take_while(|ev| ev.event.final_update_id <= last_update_id)
        .count();
    events.drain(..stale);

    if let Some(first) = events.first() {
        let first_u = first.event.first_update_id;
        let final_u = first.event.final_update_id;
        if !(first_u <= last_update_id + 1 && last_update_id + 1 <= final_u) {
            return Err(FeedError::CoverageGap {
                last_update_id,
                first_u,
                final_u,
            });
        }
    }
    Ok(events)
}

/// Orchestrates the sync protocol and the live loop.
pub struct Synchronizer {
    config: FeedConfig,
    sync_config: SyncConfig,
    queue: Arc<EventQueue>,
    rest: SnapshotClient,
    ring: Option<Ring>,
    cancel: CancellationToken,
}

impl Synchronizer {
    /// Creates a synchronizer with default protocol tunables.
    pub fn new(
        config: FeedConfig,
        queue: Arc<EventQueue>,
        rest: SnapshotClient,
        ring: Option<Ring>,
        cancel: CancellationToken,
    ) -> Self {
        Self::with_sync_config(config, SyncConfig::default(), queue, rest, ring, cancel)
    }

    /// Creates a synchronizer with explicit protocol tunables.
    pub fn with_sync_config(
        config: FeedConfig,
        sync_config: SyncConfig,
        queue: Arc<EventQueue>,
        rest: SnapshotClient,
        ring: Option<Ring>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            sync_config,
            queue,
            rest,
            ring,
            cancel,
        }
    }

    /// Runs the protocol to completion.
    ///
    /// Returns `Ok(())` on an external stop; sequence errors and an
    /// exhausted snapshot budget are returned for the binary to map to
    /// exit codes. The ring is unmapped when the synchronizer drops.
    pub async fn run(mut self) -> Result<()> {
        // Phase 1: initial buffering
        let Some(first_u) = self.wait_for_initial_buffer().await else {
            return Ok(());
        };
        info!(first_u, "first buffered event recorded");

        // Phase 2: snapshot at least as new as the first buffered event
        let Some((snapshot, snapshot_body)) = self.fetch_fresh_snapshot(first_u).await? else {
            return Ok(());
        };

        // Phase 3: backlog selection
        let buffered = self.queue.drain_all();
        debug!(buffered = buffered.len(), "drained buffered events");
        let backlog = select_backlog(buffered, snapshot.last_update_id)?;
        if backlog.is_empty() {
            info!("no buffered events newer than snapshot, proceeding with snapshot only");
        }

        // Phase 4: book construction
        let mut book = OrderBook::new();
        book.set_from_snapshot(&snapshot)?;
        info!(
            symbol = %self.config.symbol,
            last_update_id = book.last_update_id(),
            levels = book.total_levels(),
            "book built from snapshot"
        );
        log_depth(&book);
        self.publish_frame(MSG_SNAPSHOT, snapshot_body.as_bytes())
            .await;

        // Phase 5: backlog apply
        let applied = self.apply_backlog(&mut book, &backlog).await?;
        info!(
            applied,
            last_update_id = book.last_update_id(),
            "backlog applied"
        );
        log_depth(&book);

        // Phase 6: live loop
        self.live_loop(&mut book).await
    }

    /// Polls the queue until enough events are buffered to read a
    /// trustworthy first `U`. Returns `None` on cancellation.
    async fn wait_for_initial_buffer(&self) -> Option<u64> {
        debug!("waiting for initial depth events");
        let started = Instant::now();

        loop {
            if self.cancel.is_cancelled() {
                return None;
            }

            let buffered = self.queue.len();
            if buffered >= self.sync_config.min_events {
                if let Some(first_u) = self.queue.peek_first_u() {
                    return Some(first_u);
                }
            }
            // with at least one event in hand, a short grace period is
            // enough; past the overall timeout, take whatever arrived
            if buffered > 0
                && (started.elapsed() >= self.sync_config.initial_grace
                    || started.elapsed() >= self.sync_config.initial_timeout)
            {
                if let Some(first_u) = self.queue.peek_first_u() {
                    return Some(first_u);
                }
            }

            tokio::time::sleep(self.sync_config.poll_interval).await;
        }
    }

    /// Fetches snapshots until one is at least as new as `first_u`.
    ///
    /// Transport and decode failures are retried with a fixed delay up
    /// to the configured budget; a snapshot that is merely too old
    /// retries indefinitely. Returns `Ok(None)` on cancellation.
    async fn fetch_fresh_snapshot(
        &self,
        first_u: u64,
    ) -> Result<Option<(DepthSnapshot, String)>> {
        let symbol = self.config.rest_symbol();
        let mut failures: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                return Ok(None);
            }

            match self
                .rest
                .fetch_depth(&symbol, self.sync_config.snapshot_depth_limit)
                .await
            {
                Ok((snapshot, body)) => {
                    failures = 0;
                    if snapshot.last_update_id >= first_u {
                        info!(
                            last_update_id = snapshot.last_update_id,
                            "snapshot accepted"
                        );
                        return Ok(Some((snapshot, body)));
                    }
                    info!(
                        last_update_id = snapshot.last_update_id,
                        first_u, "snapshot older than first buffered event, retrying"
                    );
                }
                Err(err) => {
                    failures += 1;
                    if failures >= self.sync_config.max_snapshot_attempts {
                        warn!(%err, failures, "snapshot retry budget exhausted");
                        return Err(FeedError::SnapshotUnavailable { attempts: failures });
                    }
                    warn!(%err, failures, "snapshot fetch failed, retrying");
                }
            }

            tokio::select! {
                () = self.cancel.cancelled() => return Ok(None),
                () = tokio::time::sleep(self.sync_config.snapshot_retry_delay) => {}
            }
        }
    }

    /// Phase 5: applies the selected backlog in order, publishing each
    /// applied event's raw JSON.
    async fn apply_backlog(
        &mut self,
        book: &mut OrderBook,
        backlog: &[BufferedEvent],
    ) -> Result<usize> {
        let mut applied = 0;
        for buffered in backlog {
            match book.apply_event(&buffered.event) {
                Ok(ApplyOutcome::Applied) => {
                    applied += 1;
                    self.publish_frame(MSG_DEPTH_UPDATE, buffered.raw.as_bytes())
                        .await;
                }
                Ok(ApplyOutcome::Ignored) => {}
                Ok(ApplyOutcome::Gap) => {
                    return Err(FeedError::BacklogGap {
                        last_update_id: book.last_update_id(),
                        first_u: buffered.event.first_update_id,
                        final_u: buffered.event.final_update_id,
                    });
                }
                Err(err) => {
                    warn!(%err, "dropping malformed buffered event");
                }
            }
        }
        Ok(applied)
    }

    /// Phase 6: follows the live stream until a stop or a gap.
    async fn live_loop(&mut self, book: &mut OrderBook) -> Result<()> {
        info!("entering live processing");
        let mut live_applied: u64 = 0;

        loop {
            let buffered = tokio::select! {
                () = self.cancel.cancelled() => break,
                buffered = self.queue.pop() => buffered,
            };

            match book.apply_event(&buffered.event) {
                Ok(ApplyOutcome::Applied) => {
                    self.publish_frame(MSG_DEPTH_UPDATE, buffered.raw.as_bytes())
                        .await;
                    live_applied += 1;
                    if live_applied % 1_000 == 0 {
                        log_depth(book);
                    }
                    if live_applied % 10_000 == 0 {
                        info!(
                            live_applied,
                            last_update_id = book.last_update_id(),
                            levels = book.total_levels(),
                            "live stream progress"
                        );
                    }
                }
                Ok(ApplyOutcome::Ignored) => {}
                Ok(ApplyOutcome::Gap) => {
                    return Err(FeedError::LiveGap {
                        last_update_id: book.last_update_id(),
                        first_u: buffered.event.first_update_id,
                        final_u: buffered.event.final_update_id,
                    });
                }
                Err(err) => {
                    warn!(%err, "dropping malformed live event");
                }
            }
        }

        info!(live_applied, "live processing stopped");
        Ok(())
    }

    /// Publishes one frame with the bounded retry schedule. The ring is
    /// best-effort transport: after the last attempt the frame is
    /// dropped with a warning and the book advances regardless.
    async fn publish_frame(&mut self, msg_type: u8, payload: &[u8]) {
        let Some(ring) = self.ring.as_mut() else {
            return;
        };

        let mut last_err = None;
        for delay_ms in PUBLISH_RETRY_DELAYS_MS {
            match ring.publish(msg_type, payload) {
                Ok(()) => return,
                Err(err) => {
                    last_err = Some(err);
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
            }
        }
        if let Some(err) = last_err {
            warn!(%err, msg_type, "ring publish failed after retries, dropping frame");
        }
    }
}

fn log_depth(book: &OrderBook) {
    let fmt_side = |levels: Vec<(i64, i64)>| -> Vec<String> {
        levels
            .into_iter()
            .map(|(price, size)| format!("{}@{}", format_fixed(size), format_fixed(price)))
            .collect()
    };
    debug!(
        last_update_id = book.last_update_id(),
        bids = ?fmt_side(book.top_bids(LOG_DEPTH)),
        asks = ?fmt_side(book.top_asks(LOG_DEPTH)),
        "book top"
    );
}
