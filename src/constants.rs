//! Application-wide constants and default engine values

use std::time::Duration;

// Admission control
pub const DEFAULT_CONCURRENCY: usize = 50;
pub const MAX_CONCURRENCY_LIMIT: usize = 100_000;

// Channel and buffer constants
pub const OUTCOME_CHANNEL_CAPACITY: usize = 10_000;
pub const SNAPSHOT_CHANNEL_CAPACITY: usize = 10;

// Timing constants
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(1);
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

// Progress indication
pub const DEBUG_LOG_INTERVAL: u64 = 1_000;
