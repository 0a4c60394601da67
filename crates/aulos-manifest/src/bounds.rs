#![forbid(unsafe_code)]

//! Minimum/maximum currently-available positions of a presentation.
//!
//! Segment indices consult this before every read to prune timeline
//! history that fell out of the timeshift window. For dynamic content the
//! maximum bound (live edge) keeps advancing with wall-clock time between
//! manifest refreshes; the minimum bound trails it by the timeshift
//! depth.

use std::{
    sync::{Arc, Mutex},
    time::Instant,
};

#[derive(Clone, Copy, Debug)]
struct LastPosition {
    value: f64,
    observed_at: Instant,
}

/// Calculator shared by every RepresentationIndex of one Manifest.
#[derive(Clone, Debug)]
pub struct ManifestBoundsCalculator {
    is_dynamic: bool,
    time_shift_buffer_depth: Option<f64>,
    last_position: Arc<Mutex<Option<LastPosition>>>,
}

impl ManifestBoundsCalculator {
    pub fn new(is_dynamic: bool, time_shift_buffer_depth: Option<f64>) -> Self {
        Self {
            is_dynamic,
            time_shift_buffer_depth,
            last_position: Arc::new(Mutex::new(None)),
        }
    }

    /// Record the latest known position, in seconds, as observed `at`.
    pub fn set_last_position(&self, value: f64, at: Instant) {
        if let Ok(mut guard) = self.last_position.lock() {
            *guard = Some(LastPosition {
                value,
                observed_at: at,
            });
        }
    }

    pub fn last_position_is_known(&self) -> bool {
        self.last_position
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    /// Maximum currently-available position, in seconds.
    ///
    /// For dynamic content the recorded position is projected forward by
    /// the wall-clock time elapsed since it was observed. `None` while no
    /// position was recorded yet.
    pub fn maximum_bound(&self) -> Option<f64> {
        let last = (*self.last_position.lock().ok()?)?;
        if !self.is_dynamic {
            return Some(last.value);
        }
        let elapsed = last.observed_at.elapsed().as_secs_f64();
        Some(last.value + elapsed)
    }

    /// Minimum currently-available position, in seconds.
    ///
    /// Static content and content without a timeshift depth never expire:
    /// the minimum bound is 0. For dynamic windowed content this is the
    /// live edge minus the timeshift depth, or `None` while the live edge
    /// is still unknown.
    pub fn minimum_bound(&self) -> Option<f64> {
        if !self.is_dynamic {
            return Some(0.0);
        }
        let Some(depth) = self.time_shift_buffer_depth else {
            return Some(0.0);
        };
        let maximum = self.maximum_bound()?;
        Some((maximum - depth).max(0.0))
    }
}
