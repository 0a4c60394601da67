#![forbid(unsafe_code)]

//! Conversions between presentation time (seconds) and index time
//! (integer-ish units of an index-local timescale).
//!
//! An index's native time base usually differs from the presentation time
//! base by a fixed offset:
//!
//! ```text
//! index_time = seconds * timescale + index_time_offset
//! ```
//!
//! where `index_time_offset = presentation_time_offset - period_start * timescale`.

/// Compute the index-time offset of an index from its declared
/// presentation-time offset and the start of the owning Period.
pub fn index_time_offset(presentation_time_offset: f64, period_start: f64, timescale: u64) -> f64 {
    presentation_time_offset - period_start * timescale as f64
}

/// Convert a presentation time in seconds into index time.
pub fn to_index_time(seconds: f64, timescale: u64, index_time_offset: f64) -> f64 {
    seconds * timescale as f64 + index_time_offset
}

/// Convert an index time back into presentation seconds.
pub fn from_index_time(scaled: f64, timescale: u64, index_time_offset: f64) -> f64 {
    (scaled - index_time_offset) / timescale as f64
}
