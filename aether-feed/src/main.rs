//! Feed binary: SYMBOL [UPDATE_SPEED] [RING_PATH].
//!
//! Exit codes: 0 normal termination, 1 usage or transport-fatal error,
//! 2 coverage gap, 3 backlog gap, 4 live gap.

use aether_core::logging::{self, LogConfig};
use aether_core::{EventQueue, Ring, RingError};
use aether_feed::constants::defaults;
use aether_feed::rest::SnapshotClient;
use aether_feed::{ws, FeedConfig, Synchronizer};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

fn main() -> ExitCode {
    let config = match FeedConfig::from_args(std::env::args().skip(1)) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            eprintln!("usage: aether-feed SYMBOL [100ms] [RING_PATH]");
            return ExitCode::from(1);
        }
    };

    logging::init(&LogConfig::default());
    ExitCode::from(run(config) as u8)
}

#[tokio::main]
async fn run(config: FeedConfig) -> i32 {
    let queue = Arc::new(EventQueue::new());
    let cancel = CancellationToken::new();

    let ring = open_or_create_ring(&config.ring_path);

    let rest = match SnapshotClient::new() {
        Ok(rest) => rest,
        Err(err) => {
            error!(%err, "failed to build HTTP client");
            return 1;
        }
    };

    let reader = ws::spawn_depth_reader(
        ws::stream_url(&config.symbol, config.update_speed),
        Arc::clone(&queue),
        cancel.clone(),
    );

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            signal_cancel.cancel();
        }
    });

    let synchronizer = Synchronizer::new(config, queue, rest, ring, cancel.clone());
    let result = synchronizer.run().await;

    // stop the reader and collect its verdict before deciding the exit
    cancel.cancel();
    let reader_result = reader.await;

    match result {
        Ok(()) => match reader_result {
            Ok(Ok(())) => {
                info!("exiting");
                0
            }
            Ok(Err(err)) => {
                error!(%err, "depth reader failed");
                1
            }
            Err(err) => {
                error!(%err, "depth reader panicked");
                1
            }
        },
        Err(err) => {
            error!(%err, "synchronizer aborted");
            err.exit_code()
        }
    }
}

/// Attaches the ring: create it, reopen it when a previous run left the
/// file behind, or run ringless when neither works. A missing ring never
/// stops the feed; the book stays correct and consumers simply get no
/// data.
fn open_or_create_ring(path: &Path) -> Option<Ring> {
    match Ring::create(path, defaults::RING_BUF_BYTES) {
        Ok(ring) => Some(ring),
        Err(RingError::AlreadyExists { .. }) => match Ring::open(path) {
            Ok(ring) => {
                info!(path = %path.display(), "reopened existing ring");
                Some(ring)
            }
            Err(err) => {
                warn!(%err, "failed to reopen existing ring, continuing without ring");
                None
            }
        },
        Err(err) => {
            warn!(%err, "ring initialization failed, continuing without ring");
            None
        }
    }
}
