//! Feed-level errors and their process exit codes.

use thiserror::Error;

/// Result type alias for feed operations.
pub type Result<T> = std::result::Result<T, FeedError>;

/// Errors surfaced by the feed binary.
///
/// Sequence errors are fatal by design: recovery from a mid-session gap
/// is identical to a cold start, so the process exits with a distinct
/// code and leaves the restart to a supervisor.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FeedError {
    /// Command line was not usable.
    #[error("{0}")]
    Usage(String),

    /// The buffered events do not straddle `lastUpdateId + 1`.
    #[error(
        "buffered events do not cover snapshot lastUpdateId {last_update_id} + 1 \
         (first remaining event U={first_u} u={final_u})"
    )]
    CoverageGap {
        /// Snapshot update id.
        last_update_id: u64,
        /// First update id of the first remaining buffered event.
        first_u: u64,
        /// Final update id of the first remaining buffered event.
        final_u: u64,
    },

    /// A sequence gap surfaced while applying the buffered backlog.
    #[error(
        "sequence gap while applying backlog: event U={first_u} u={final_u} \
         against book at {last_update_id}"
    )]
    BacklogGap {
        /// Book position when the gap was hit.
        last_update_id: u64,
        /// First update id of the gapping event.
        first_u: u64,
        /// Final update id of the gapping event.
        final_u: u64,
    },

    /// A sequence gap surfaced in the live stream.
    #[error(
        "sequence gap in live stream: event U={first_u} u={final_u} \
         against book at {last_update_id}"
    )]
    LiveGap {
        /// Book position when the gap was hit.
        last_update_id: u64,
        /// First update id of the gapping event.
        first_u: u64,
        /// Final update id of the gapping event.
        final_u: u64,
    },

    /// The snapshot endpoint kept failing past the retry budget.
    #[error("depth snapshot unavailable after {attempts} failed attempts")]
    SnapshotUnavailable {
        /// Number of consecutive failed fetches.
        attempts: u32,
    },

    /// Snapshot transport or decode failure (retried in place).
    #[error("snapshot fetch: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint URL construction failure.
    #[error("invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),

    /// WebSocket transport failure.
    #[error("websocket: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Core subsystem failure.
    #[error(transparent)]
    Core(#[from] aether_core::Error),
}

impl FeedError {
    /// Process exit code for this error.
    ///
    /// 1 usage or transport-fatal, 2 coverage gap, 3 backlog gap, 4 live
    /// gap (distinct so a supervisor can trigger a resync).
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::CoverageGap { .. } => 2,
            Self::BacklogGap { .. } => 3,
            Self::LiveGap { .. } => 4,
            _ => 1,
        }
    }
}

impl From<aether_core::BookError> for FeedError {
    fn from(err: aether_core::BookError) -> Self {
        Self::Core(err.into())
    }
}
