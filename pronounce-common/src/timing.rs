//! Tick-based timing conversions for service-reported offsets
//!
//! The speech service reports every offset and duration as an integer count
//! of 100-nanosecond ticks (10,000,000 ticks per second). Reports returned to
//! clients express all timing in floating-point seconds.
//!
//! # Conversion Flow
//!
//! ```text
//! Service response (u64 ticks)
//!     ↓
//! ticks_to_seconds() → report field (f64 seconds)
//! ```
//!
//! # Examples
//!
//! ```rust
//! use pronounce_common::timing::*;
//!
//! assert_eq!(ticks_to_seconds(10_000_000), 1.0);
//! assert_eq!(ticks_to_seconds(12_345_678), 1.2345678);
//! ```

/// Tick rate of the speech service: 10,000,000 Hz (100 ns per tick)
pub const TICKS_PER_SECOND: u64 = 10_000_000;

/// Convert service ticks to seconds
///
/// Plain division by [`TICKS_PER_SECOND`]; no rounding is applied so the
/// value matches the raw tick count exactly where f64 can represent it.
pub fn ticks_to_seconds(ticks: u64) -> f64 {
    ticks as f64 / TICKS_PER_SECOND as f64
}
