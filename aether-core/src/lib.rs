//! Core machinery for the aether depth feed.
//!
//! This crate holds everything that is independent of the exchange
//! transport: the fixed-point price/size representation, the L2
//! [`OrderBook`] with its diff-application state machine, the
//! [`EventQueue`] handoff buffer between the WebSocket reader and the
//! synchronizer, and the single-producer shared-memory [`Ring`] with its
//! C ABI for out-of-process consumers.
//!
//! # Features
//!
//! - **Precision**: decimal strings are parsed through
//!   `rust_decimal::Decimal`, never `f64`.
//! - **Error handling**: typed errors with `thiserror`; no panics on
//!   recoverable paths.
//! - **Observability**: `tracing` instrumentation throughout.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]

pub mod book;
pub mod error;
pub mod events;
pub mod fixed;
pub mod logging;
pub mod queue;
pub mod ring;

pub use book::{ApplyOutcome, OrderBook};
pub use error::{BookError, Error, Result, RingError};
pub use events::{BufferedEvent, DepthEvent, DepthSnapshot};
pub use fixed::{format_fixed, parse_fixed, Px, Sz, FIXED_SCALE};
pub use queue::EventQueue;
pub use ring::Ring;
