//! Binance diff-depth feed.
//!
//! Wires the core machinery to the exchange: a WebSocket reader pushes
//! `depthUpdate` events into the queue, the synchronizer reconciles them
//! with a REST snapshot into a consistent local book and republishes the
//! raw frames into the shared-memory ring.

#![warn(clippy::all)]

pub mod config;
pub mod constants;
pub mod error;
pub mod rest;
pub mod sync;
pub mod ws;

pub use config::{FeedConfig, UpdateSpeed};
pub use error::{FeedError, Result};
pub use sync::{select_backlog, SyncConfig, Synchronizer};
