//! Error types for the core crate.
//!
//! Each failure domain gets its own `thiserror` enum ([`BookError`] for
//! the order book, [`RingError`] for the shared-memory ring); the
//! crate-level [`Error`] aggregates them for callers that do not care
//! which subsystem failed.

use std::borrow::Cow;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error for the core crate.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Order book failure.
    #[error(transparent)]
    Book(#[from] BookError),

    /// Shared-memory ring failure.
    #[error(transparent)]
    Ring(#[from] RingError),

    /// JSON encoding or decoding failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Order book errors.
///
/// Both variants leave the book unchanged: level strings are parsed in
/// full before any side is mutated.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BookError {
    /// A depth event carried a price or size string that does not decode.
    #[error("malformed depth event: {0}")]
    MalformedEvent(String),

    /// A snapshot was missing required fields or carried undecodable levels.
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),
}

/// Shared-memory ring errors.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RingError {
    /// The backing file already exists (creation is exclusive).
    #[error("ring file already exists: {}", path.display())]
    AlreadyExists {
        /// Path of the existing file.
        path: PathBuf,
    },

    /// An argument was out of range (buffer too small, file truncated).
    #[error("invalid ring argument: {0}")]
    InvalidArg(Cow<'static, str>),

    /// The mapped file does not carry the ring magic.
    #[error("bad ring magic: found {found:#010x}")]
    BadMagic {
        /// Magic value found in the header.
        found: u32,
    },

    /// The mapped file carries an unsupported layout version.
    #[error("unsupported ring version {found} (expected {expected})")]
    VersionMismatch {
        /// Version found in the header.
        found: u16,
        /// Version this build understands.
        expected: u16,
    },

    /// The framed message cannot fit in the ring at any offset.
    #[error("payload of {len} bytes does not fit in ring of {buf_size} bytes")]
    PayloadTooLarge {
        /// Payload length in bytes.
        len: usize,
        /// Circular buffer capacity in bytes.
        buf_size: u64,
    },

    /// Filesystem or mapping failure.
    #[error("ring I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BookError {
    /// Creates a malformed-event error.
    pub fn malformed_event(msg: impl Into<String>) -> Self {
        Self::MalformedEvent(msg.into())
    }

    /// Creates a malformed-snapshot error.
    pub fn malformed_snapshot(msg: impl Into<String>) -> Self {
        Self::MalformedSnapshot(msg.into())
    }
}

impl RingError {
    /// Creates an invalid-argument error.
    /// Accepts both `&'static str` (zero allocation) and `String`.
    pub fn invalid_arg(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidArg(msg.into())
    }
}
