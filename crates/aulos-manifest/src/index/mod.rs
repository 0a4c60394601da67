#![forbid(unsafe_code)]

//! Segment-addressing strategies.
//!
//! A [`RepresentationIndex`] answers "which segments exist for this time
//! range" for one Representation. The three strategies:
//!
//! - [`TimelineIndex`]: segment grid declared by a (possibly refreshing)
//!   timeline in the manifest;
//! - [`LocalIndex`]: pre-computed segment list of an offline/local
//!   content;
//! - [`CompositeIndex`]: offsets and clips another index into a larger
//!   virtual timeline.

mod composite;
mod local;
mod timeline_index;

pub use composite::CompositeIndex;
pub use local::LocalIndex;
pub use timeline_index::TimelineIndex;

use tracing::warn;
use url::Url;

use crate::{
    bounds::ManifestBoundsCalculator,
    error::{FetchErrorKind, ManifestError, ManifestResult},
    segment::Segment,
    timeline::{resolved_repeat, SegmentTimeline, UNKNOWN_DURATION},
    tokens,
    types::ParsedIndex,
};

/// Manifest-level context handed down when constructing an index.
#[derive(Clone, Debug)]
pub struct IndexContext<'a> {
    pub bounds: ManifestBoundsCalculator,
    /// Start of the owning Period, in seconds.
    pub period_start: f64,
    /// End of the owning Period, in seconds, when known.
    pub period_end: Option<f64>,
    pub is_dynamic: bool,
    pub base_urls: &'a [Url],
}

/// Out-of-band segment descriptor pushed by non-declarative transports.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AddedSegment {
    pub time: f64,
    pub duration: f64,
    pub timescale: u64,
    pub count: Option<u64>,
}

#[derive(Clone, Debug)]
pub enum RepresentationIndex {
    Timeline(TimelineIndex),
    Local(LocalIndex),
    Composite(CompositeIndex),
}

impl RepresentationIndex {
    /// Build the right strategy out of parsed index arguments.
    pub fn from_parsed(parsed: ParsedIndex, ctx: &IndexContext<'_>) -> Self {
        match parsed {
            ParsedIndex::Timeline(args) => Self::Timeline(TimelineIndex::new(args, ctx)),
            ParsedIndex::Local(args) => Self::Local(LocalIndex::new(args)),
            ParsedIndex::Composite(args) => Self::Composite(CompositeIndex::new(args, ctx)),
        }
    }

    /// The initialization segment, if this Representation has one.
    pub fn get_init_segment(&self) -> Option<Segment> {
        match self {
            Self::Timeline(index) => index.get_init_segment(),
            Self::Local(index) => index.get_init_segment(),
            Self::Composite(index) => index.get_init_segment(),
        }
    }

    /// Every media segment whose interval intersects
    /// `[from, from + duration)`, both in presentation seconds.
    pub fn get_segments(&mut self, from: f64, duration: f64) -> Vec<Segment> {
        match self {
            Self::Timeline(index) => index.get_segments(from, duration),
            Self::Local(index) => index.get_segments(from, duration),
            Self::Composite(index) => index.get_segments(from, duration),
        }
    }

    /// Start, in presentation seconds, of the earliest available segment.
    /// `None` when the index is empty.
    pub fn get_first_position(&mut self) -> Option<f64> {
        match self {
            Self::Timeline(index) => index.get_first_position(),
            Self::Local(index) => index.get_first_position(),
            Self::Composite(index) => index.get_first_position(),
        }
    }

    /// End, in presentation seconds, of the latest available segment.
    /// `None` when the index is empty.
    pub fn get_last_position(&mut self) -> Option<f64> {
        match self {
            Self::Timeline(index) => index.get_last_position(),
            Self::Local(index) => index.get_last_position(),
            Self::Composite(index) => index.get_last_position(),
        }
    }

    /// Whether a previously handed-out segment can still be fetched.
    /// `None` when that cannot be decided yet.
    pub fn is_segment_still_available(&mut self, segment: &Segment) -> Option<bool> {
        match self {
            Self::Timeline(index) => index.is_segment_still_available(segment),
            Self::Local(index) => index.is_segment_still_available(segment),
            Self::Composite(index) => index.is_segment_still_available(segment),
        }
    }

    /// If `time` (in seconds) falls right before a declared gap in the
    /// segment grid, the start (in seconds) of the next range. `None` when
    /// no gap is close.
    pub fn check_discontinuity(&mut self, time: f64) -> Option<f64> {
        match self {
            Self::Timeline(index) => index.check_discontinuity(time),
            Self::Local(index) => index.check_discontinuity(time),
            Self::Composite(index) => index.check_discontinuity(time),
        }
    }

    /// Whether a fetch error on a segment of this index may just mean the
    /// index is out-of-sync with the server and a manifest refresh could
    /// resolve it.
    pub fn can_be_out_of_sync_error(&self, error: FetchErrorKind) -> bool {
        match self {
            Self::Timeline(index) => index.can_be_out_of_sync_error(error),
            Self::Local(index) => index.can_be_out_of_sync_error(error),
            Self::Composite(index) => index.can_be_out_of_sync_error(error),
        }
    }

    /// Whether no further segment will ever be added to this index.
    pub fn is_finished(&mut self) -> bool {
        match self {
            Self::Timeline(index) => index.is_finished(),
            Self::Local(index) => index.is_finished(),
            Self::Composite(index) => index.is_finished(),
        }
    }

    /// Replace this index wholesale with its freshly-parsed counterpart.
    ///
    /// Errors when the counterpart uses a different addressing strategy.
    pub fn replace(&mut self, new: &mut RepresentationIndex) -> ManifestResult<()> {
        match (self, new) {
            (Self::Timeline(old), Self::Timeline(new)) => {
                old.replace(new);
                Ok(())
            }
            (Self::Local(old), Self::Local(new)) => {
                old.replace(new);
                Ok(())
            }
            (Self::Composite(old), Self::Composite(new)) => old.replace(new),
            (old, new) => Err(incompatible(old, new)),
        }
    }

    /// Merge a freshly-parsed counterpart into this index, keeping history
    /// the refreshed version no longer declares.
    ///
    /// Errors when the counterpart uses a different addressing strategy or
    /// when the merge would hide a gap.
    pub fn update(&mut self, new: &mut RepresentationIndex) -> ManifestResult<()> {
        match (self, new) {
            (Self::Timeline(old), Self::Timeline(new)) => old.update(new),
            (Self::Local(old), Self::Local(new)) => {
                old.update(new);
                Ok(())
            }
            (Self::Composite(old), Self::Composite(new)) => old.update(new),
            (old, new) => Err(incompatible(old, new)),
        }
    }

    /// Inject segments learned out-of-band (push-based transports).
    ///
    /// Declarative indices ignore the injection with a warning.
    pub fn add_segments(&mut self, segments: &[AddedSegment]) {
        match self {
            Self::Timeline(_) | Self::Local(_) => {
                warn!("index: ignoring out-of-band segments on a declarative index");
            }
            Self::Composite(index) => index.add_segments(segments),
        }
    }

    /// Snapshot of the already-parsed timeline, for reuse when building
    /// the next version of the same index. `None` when the timeline was
    /// never read (parsing it here would defeat the shortcut).
    pub fn timeline_snapshot(&self) -> Option<SegmentTimeline> {
        match self {
            Self::Timeline(index) => index.timeline_snapshot(),
            Self::Local(_) => None,
            Self::Composite(index) => index.timeline_snapshot(),
        }
    }

    fn strategy_name(&self) -> &'static str {
        match self {
            Self::Timeline(_) => "timeline",
            Self::Local(_) => "local",
            Self::Composite(_) => "composite",
        }
    }
}

fn incompatible(old: &RepresentationIndex, new: &RepresentationIndex) -> ManifestError {
    ManifestError::IncompatibleIndex(format!(
        "cannot combine a {} index with a {} index",
        old.strategy_name(),
        new.strategy_name(),
    ))
}

/// Everything needed to materialize media segments out of a parsed
/// timeline.
pub(crate) struct TimelineContext<'a> {
    pub timeline: &'a SegmentTimeline,
    pub timescale: u64,
    pub index_time_offset: f64,
    pub media_urls: &'a [String],
    pub start_number: Option<u64>,
    pub scaled_period_end: Option<f64>,
}

/// Materialize every media segment of `ctx.timeline` whose interval
/// intersects `[scaled_from, scaled_to)` (both in index time).
pub(crate) fn segments_from_timeline(
    ctx: &TimelineContext<'_>,
    scaled_from: f64,
    scaled_to: f64,
) -> Vec<Segment> {
    let entries = ctx.timeline.entries();
    let mut segments = Vec::new();
    let mut current_number = ctx.start_number;

    for (i, entry) in entries.iter().enumerate() {
        let next = entries.get(i + 1);
        let repeat = resolved_repeat(entry, next, ctx.scaled_period_end);

        if entry.duration == UNKNOWN_DURATION {
            // Unbounded final entry: a single segment of unknown duration.
            if entry.start < scaled_to {
                segments.push(make_segment(ctx, entry.start, UNKNOWN_DURATION, current_number));
            }
            break;
        }
        if entry.duration <= 0.0 {
            continue;
        }

        let end = match repeat {
            Some(r) => entry.start + (r + 1) as f64 * entry.duration,
            None => f64::INFINITY,
        };
        if end > scaled_from && entry.start < scaled_to {
            // First repeat whose interval reaches into the queried range.
            let first = if scaled_from > entry.start {
                ((scaled_from - entry.start) / entry.duration).floor() as i64
            } else {
                0
            };
            let mut n = first;
            loop {
                if let Some(r) = repeat {
                    if n > r {
                        break;
                    }
                }
                let segment_time = entry.start + n as f64 * entry.duration;
                if segment_time >= scaled_to {
                    break;
                }
                if let Some(period_end) = ctx.scaled_period_end {
                    if segment_time > period_end {
                        return segments;
                    }
                }
                let number = current_number.map(|start| start + n as u64);
                segments.push(make_segment(ctx, segment_time, entry.duration, number));
                n += 1;
            }
        }
        if entry.start >= scaled_to {
            break;
        }
        if let Some(r) = repeat {
            current_number = current_number.map(|start| start + r as u64 + 1);
        } else {
            break;
        }
    }
    segments
}

fn make_segment(
    ctx: &TimelineContext<'_>,
    segment_time: f64,
    duration: f64,
    number: Option<u64>,
) -> Segment {
    let media_urls = ctx
        .media_urls
        .iter()
        .map(|url| tokens::substitute_tokens(url, Some(segment_time), number))
        .collect();
    Segment {
        id: format_time_id(segment_time),
        time: segment_time - ctx.index_time_offset,
        duration,
        timescale: ctx.timescale,
        is_init: false,
        range: None,
        index_range: None,
        media_urls,
        number,
        private_infos: None,
    }
}

fn format_time_id(time: f64) -> String {
    if time.fract() == 0.0 && time.abs() < i64::MAX as f64 {
        format!("{}", time as i64)
    } else {
        format!("{time}")
    }
}
