//! Feed configuration parsed from the command line.

use crate::constants::defaults;
use crate::error::FeedError;
use std::path::PathBuf;

/// Depth stream update cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateSpeed {
    /// Exchange default cadence (1000 ms).
    #[default]
    Default,
    /// 100 ms cadence.
    Fast100Ms,
}

impl UpdateSpeed {
    /// Parses the optional UPDATE_SPEED argument. Only `100ms` selects
    /// the fast cadence; anything else falls back to the default.
    pub fn parse(arg: &str) -> Self {
        if arg == "100ms" {
            Self::Fast100Ms
        } else {
            Self::Default
        }
    }

    /// Stream-name suffix for this cadence.
    pub fn stream_suffix(self) -> &'static str {
        match self {
            Self::Default => "",
            Self::Fast100Ms => "@100ms",
        }
    }
}

/// Runtime configuration for the feed binary.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Trading symbol, lowercase as the stream side expects.
    pub symbol: String,
    /// Depth stream cadence.
    pub update_speed: UpdateSpeed,
    /// Path of the shared-memory ring file.
    pub ring_path: PathBuf,
}

impl FeedConfig {
    /// Builds a config from positional arguments
    /// (`SYMBOL [UPDATE_SPEED] [RING_PATH]`); extra arguments are
    /// ignored.
    pub fn from_args(mut args: impl Iterator<Item = String>) -> Result<Self, FeedError> {
        let symbol = args
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| FeedError::Usage("missing SYMBOL argument".into()))?;
        let update_speed = args
            .next()
            .map(|arg| UpdateSpeed::parse(&arg))
            .unwrap_or_default();
        let ring_path = args
            .next()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(defaults::RING_PATH));

        Ok(Self {
            symbol: symbol.to_lowercase(),
            update_speed,
            ring_path,
        })
    }

    /// Symbol in the uppercase form the REST API expects.
    pub fn rest_symbol(&self) -> String {
        self.symbol.to_uppercase()
    }
}
