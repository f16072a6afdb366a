//! Exchange endpoints and feed defaults.

/// API endpoints.
pub mod endpoints {
    /// Public REST base URL.
    pub const REST_BASE: &str = "https://api.binance.com/api/v3";
    /// Order book (depth) endpoint.
    pub const DEPTH: &str = "/depth";
    /// WebSocket stream base URL.
    pub const WS_BASE: &str = "wss://stream.binance.com:9443/ws";
}

/// Feed defaults.
pub mod defaults {
    /// Default ring file path.
    pub const RING_PATH: &str = "/dev/shm/aether.byte.ring";
    /// Default ring circular-buffer size in bytes.
    pub const RING_BUF_BYTES: u64 = 1 << 20;
    /// Depth levels requested from the REST snapshot.
    pub const SNAPSHOT_DEPTH_LIMIT: u32 = 5000;
}
