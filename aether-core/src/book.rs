//! L2 order book with diff-application under Binance sequence rules.

use crate::error::BookError;
use crate::events::{DepthEvent, DepthSnapshot};
use crate::fixed::{parse_fixed, Px, Sz};
use std::collections::BTreeMap;

/// Outcome of applying a depth event to the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The event was applied and `last_update_id` advanced.
    Applied,
    /// The event was wholly older than the book; nothing changed.
    Ignored,
    /// The event starts past `last_update_id + 1`; the caller must
    /// resynchronize. Nothing changed.
    Gap,
}

/// Price-indexed two-sided ladder.
///
/// Bids iterate in descending price order, asks ascending. Levels with
/// zero size are never stored. `last_update_id` is monotone
/// non-decreasing across successful [`OrderBook::apply_event`] calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderBook {
    bids: BTreeMap<Px, Sz>,
    asks: BTreeMap<Px, Sz>,
    last_update_id: u64,
}

impl OrderBook {
    /// Creates an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets the book from a REST snapshot.
    ///
    /// Clears both sides, sets `last_update_id` and inserts every level
    /// with a positive size; zero-size snapshot levels are dropped
    /// silently. Fails with [`BookError::MalformedSnapshot`] when a level
    /// string does not decode, in which case the book is left unchanged.
    pub fn set_from_snapshot(&mut self, snapshot: &DepthSnapshot) -> Result<(), BookError> {
        let bids = parse_levels(&snapshot.bids).map_err(BookError::malformed_snapshot)?;
        let asks = parse_levels(&snapshot.asks).map_err(BookError::malformed_snapshot)?;

        self.bids.clear();
        self.asks.clear();
        self.last_update_id = snapshot.last_update_id;

        for (price, size) in bids {
            if size > 0 {
                self.bids.insert(price, size);
            }
        }
        for (price, size) in asks {
            if size > 0 {
                self.asks.insert(price, size);
            }
        }
        Ok(())
    }

    /// Applies a single diff event under the sequence rules.
    ///
    /// - `u < last_update_id`: stale, returns [`ApplyOutcome::Ignored`].
    /// - `U > last_update_id + 1`: sequence gap, returns
    ///   [`ApplyOutcome::Gap`].
    /// - otherwise all bid and ask changes are applied (size 0 deletes
    ///   the level) and `last_update_id` becomes `u`.
    ///
    /// Application is atomic per event: every level string is parsed
    /// before the first mutation, so [`BookError::MalformedEvent`] leaves
    /// the book exactly as it was.
    pub fn apply_event(&mut self, event: &DepthEvent) -> Result<ApplyOutcome, BookError> {
        if event.final_update_id < self.last_update_id {
            return Ok(ApplyOutcome::Ignored);
        }
        if event.first_update_id > self.last_update_id + 1 {
            return Ok(ApplyOutcome::Gap);
        }

        let bids = parse_levels(&event.bids).map_err(BookError::malformed_event)?;
        let asks = parse_levels(&event.asks).map_err(BookError::malformed_event)?;

        for (price, size) in bids {
            if size == 0 {
                self.bids.remove(&price);
            } else {
                self.bids.insert(price, size);
            }
        }
        for (price, size) in asks {
            if size == 0 {
                self.asks.remove(&price);
            } else {
                self.asks.insert(price, size);
            }
        }

        self.last_update_id = event.final_update_id;
        Ok(ApplyOutcome::Applied)
    }

    /// Best (highest) bid, when present.
    pub fn best_bid(&self) -> Option<(Px, Sz)> {
        self.bids.last_key_value().map(|(p, s)| (*p, *s))
    }

    /// Best (lowest) ask, when present.
    pub fn best_ask(&self) -> Option<(Px, Sz)> {
        self.asks.first_key_value().map(|(p, s)| (*p, *s))
    }

    /// Update id the book currently reflects.
    pub fn last_update_id(&self) -> u64 {
        self.last_update_id
    }

    /// Total number of price levels across both sides.
    pub fn total_levels(&self) -> usize {
        self.bids.len() + self.asks.len()
    }

    /// Top `n` bids, best first.
    pub fn top_bids(&self, n: usize) -> Vec<(Px, Sz)> {
        self.bids.iter().rev().take(n).map(|(p, s)| (*p, *s)).collect()
    }

    /// Top `n` asks, best first.
    pub fn top_asks(&self, n: usize) -> Vec<(Px, Sz)> {
        self.asks.iter().take(n).map(|(p, s)| (*p, *s)).collect()
    }
}

fn parse_levels(levels: &[[String; 2]]) -> Result<Vec<(Px, Sz)>, String> {
    levels
        .iter()
        .map(|level| {
            let price = parse_fixed(&level[0])
                .ok_or_else(|| format!("undecodable price {:?}", level[0]))?;
            let size = parse_fixed(&level[1])
                .ok_or_else(|| format!("undecodable size {:?}", level[1]))?;
            Ok((price, size))
        })
        .collect()
}
