//! Ambient tuning knobs for the stream driver.
//!
//! A small serializable struct with a sensible [`Default`], passed by
//! value/reference rather than read from a global.

use serde::{Deserialize, Serialize};

/// Default size of the hardware buffer ring.
pub const DEFAULT_BUFFER_COUNT: usize = 3;

/// Default refill-loop sleep interval, in milliseconds.
pub const DEFAULT_AUDIO_SLEEP_MS: u64 = 10;

/// Tuning knobs for a [`crate::stream::Stream`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Size of the hardware buffer ring (`N`).
    pub buffer_count: usize,
    /// Refill-loop sleep interval, in milliseconds.
    pub audio_sleep_ms: u64,
    /// Prefix used when naming the producer thread.
    pub thread_name_prefix: String,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            buffer_count: DEFAULT_BUFFER_COUNT,
            audio_sleep_ms: DEFAULT_AUDIO_SLEEP_MS,
            thread_name_prefix: "streamcore".to_string(),
        }
    }
}
