/// Decimal places for stored currency amounts.
pub const CURRENCY_SCALE: u32 = 2;

/// Decimal places for per-share figures (cost basis per share, unit cost).
pub const PER_SHARE_SCALE: u32 = 6;

/// Decimal places for percentage figures (returns, drift percent).
pub const PERCENT_SCALE: u32 = 4;

/// Minimum holding period, in days, for a lot to qualify as long-term.
pub const LONG_TERM_DAYS: i64 = 365;

/// Quantities below this threshold are treated as zero.
pub const QUANTITY_THRESHOLD: &str = "0.00000001";
