//! Wire shapes for the Binance diff-depth stream and REST snapshot.

use serde::{Deserialize, Serialize};

/// One incremental depth update decoded from the WebSocket stream.
///
/// `U..=u` is the inclusive range of update ids this event accounts for.
/// Bid and ask changes stay as `[price, size]` string pairs until the
/// book applies them; a size of `"0"` deletes the level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepthEvent {
    /// First update id covered by this event.
    #[serde(rename = "U")]
    pub first_update_id: u64,

    /// Final update id covered by this event.
    #[serde(rename = "u")]
    pub final_update_id: u64,

    /// Bid level changes as `[price, size]` string pairs.
    #[serde(rename = "b", default)]
    pub bids: Vec<[String; 2]>,

    /// Ask level changes as `[price, size]` string pairs.
    #[serde(rename = "a", default)]
    pub asks: Vec<[String; 2]>,
}

/// A point-in-time REST depth snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepthSnapshot {
    /// Update id the snapshot reflects.
    #[serde(rename = "lastUpdateId")]
    pub last_update_id: u64,

    /// Full bid ladder as `[price, size]` string pairs.
    pub bids: Vec<[String; 2]>,

    /// Full ask ladder as `[price, size]` string pairs.
    pub asks: Vec<[String; 2]>,
}

/// A depth event paired with the bytes it was decoded from and the
/// reader's receive timestamp.
///
/// The raw text is republished into the ring untouched; the timestamp is
/// monotonic microseconds, kept for latency analysis and never used to
/// affect book state.
#[derive(Debug, Clone)]
pub struct BufferedEvent {
    /// The decoded event.
    pub event: DepthEvent,
    /// The JSON text exactly as received.
    pub raw: String,
    /// Monotonic receive timestamp in microseconds.
    pub recv_ts_us: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_depth_update() {
        let json = r#"{
            "e": "depthUpdate", "E": 123456789, "s": "BTCUSDT",
            "U": 157, "u": 160,
            "b": [["0.0024", "10"]],
            "a": [["0.0026", "100"], ["0.0027", "0"]]
        }"#;
        let ev: DepthEvent = serde_json::from_str(json).unwrap();
        assert_eq!(ev.first_update_id, 157);
        assert_eq!(ev.final_update_id, 160);
        assert_eq!(ev.bids.len(), 1);
        assert_eq!(ev.asks.len(), 2);
        assert_eq!(ev.asks[1], ["0.0027".to_string(), "0".to_string()]);
    }

    #[test]
    fn decodes_snapshot() {
        let json = r#"{
            "lastUpdateId": 1027024,
            "bids": [["4.00000000", "431.00000000"]],
            "asks": [["4.00000200", "12.00000000"]]
        }"#;
        let snap: DepthSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snap.last_update_id, 1_027_024);
        assert_eq!(snap.bids.len(), 1);
    }

    #[test]
    fn snapshot_requires_last_update_id() {
        let json = r#"{"bids": [], "asks": []}"#;
        assert!(serde_json::from_str::<DepthSnapshot>(json).is_err());
    }

    #[test]
    fn event_sides_default_to_empty() {
        let json = r#"{"U": 1, "u": 2}"#;
        let ev: DepthEvent = serde_json::from_str(json).unwrap();
        assert!(ev.bids.is_empty());
        assert!(ev.asks.is_empty());
    }
}
