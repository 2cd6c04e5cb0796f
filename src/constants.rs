pub const SECONDS_PER_MINUTE: i64 = 60;
pub const MINUTES_PER_DAY: i64 = 24 * 60;
pub const SECONDS_PER_DAY: i64 = MINUTES_PER_DAY * SECONDS_PER_MINUTE;

pub const DEFAULT_WINDOW_DAYS: i64 = 15; // 31 days shown
pub const DEFAULT_INTERVAL_MINUTES: i64 = 20; // 73 slices
pub const MAX_WINDOW_DAYS: i64 = 36_525;

// Terminal session input poll
pub const TICK_RATE_MS: u64 = 250;
