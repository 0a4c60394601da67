#![forbid(unsafe_code)]

//! Timeline-based segment addressing.
//!
//! The segment grid is declared by the manifest as a list of raw timeline
//! descriptors. Parsing the descriptors into a [`SegmentTimeline`] is
//! deferred until the first read, since a manifest typically carries many
//! more Representations than playback ever touches.

use crate::{
    bounds::ManifestBoundsCalculator,
    error::{FetchErrorKind, ManifestResult},
    index::{segments_from_timeline, IndexContext, TimelineContext},
    segment::Segment,
    time::{from_index_time, index_time_offset, to_index_time},
    timeline::{entry_end, RawTimelineItem, SegmentTimeline, UNKNOWN_DURATION},
    tokens,
    types::TimelineIndexArgs,
};

#[derive(Clone, Debug)]
struct InitSegmentInfo {
    urls: Vec<String>,
    range: Option<(u64, u64)>,
}

#[derive(Clone, Debug)]
pub struct TimelineIndex {
    timescale: u64,
    index_time_offset: f64,
    media_urls: Vec<String>,
    init: Option<InitSegmentInfo>,
    index_range: Option<(u64, u64)>,
    start_number: Option<u64>,
    is_dynamic: bool,
    scaled_period_start: f64,
    scaled_period_end: Option<f64>,
    bounds: ManifestBoundsCalculator,
    /// Raw descriptors, consumed at first read. `None` once parsed.
    raw_timeline: Option<Vec<RawTimelineItem>>,
    timeline: SegmentTimeline,
    /// One-shot construction shortcut, consumed (and severed) at first
    /// parse.
    previous_timeline: Option<SegmentTimeline>,
}

impl TimelineIndex {
    pub fn new(args: TimelineIndexArgs, ctx: &IndexContext<'_>) -> Self {
        let timescale = args.timescale.max(1);
        let presentation_time_offset = args.presentation_time_offset.unwrap_or(0.0);
        let offset = index_time_offset(presentation_time_offset, ctx.period_start, timescale);
        let media_urls = tokens::create_index_urls(ctx.base_urls, args.media_template.as_deref());
        let init = args.initialization.map(|init| InitSegmentInfo {
            urls: tokens::create_index_urls(ctx.base_urls, init.media_template.as_deref()),
            range: init.range,
        });
        Self {
            timescale,
            index_time_offset: offset,
            media_urls,
            init,
            index_range: args.index_range,
            start_number: args.start_number,
            is_dynamic: ctx.is_dynamic,
            scaled_period_start: to_index_time(ctx.period_start, timescale, offset),
            scaled_period_end: ctx
                .period_end
                .map(|end| to_index_time(end, timescale, offset)),
            bounds: ctx.bounds.clone(),
            raw_timeline: Some(args.raw_timeline),
            timeline: SegmentTimeline::default(),
            previous_timeline: args.previous_timeline,
        }
    }

    pub fn get_init_segment(&self) -> Option<Segment> {
        if self.init.is_none() && self.index_range.is_none() {
            return None;
        }
        let (urls, range) = match &self.init {
            Some(init) => (init.urls.clone(), init.range),
            None => (self.media_urls.clone(), None),
        };
        Some(Segment {
            id: "init".to_string(),
            time: 0.0,
            duration: 0.0,
            timescale: self.timescale,
            is_init: true,
            range,
            index_range: self.index_range,
            media_urls: urls,
            number: None,
            private_infos: None,
        })
    }

    pub fn get_segments(&mut self, from: f64, duration: f64) -> Vec<Segment> {
        self.refresh_timeline();
        let scaled_from = to_index_time(from, self.timescale, self.index_time_offset);
        let scaled_to = to_index_time(from + duration, self.timescale, self.index_time_offset);
        let ctx = TimelineContext {
            timeline: &self.timeline,
            timescale: self.timescale,
            index_time_offset: self.index_time_offset,
            media_urls: &self.media_urls,
            start_number: self.start_number,
            scaled_period_end: self.scaled_period_end,
        };
        segments_from_timeline(&ctx, scaled_from, scaled_to)
    }

    pub fn get_first_position(&mut self) -> Option<f64> {
        self.refresh_timeline();
        let first = self.timeline.first()?;
        Some(from_index_time(
            first.start,
            self.timescale,
            self.index_time_offset,
        ))
    }

    pub fn get_last_position(&mut self) -> Option<f64> {
        self.refresh_timeline();
        let end = self.timeline.end(self.scaled_period_end)?;
        if !end.is_finite() {
            return None;
        }
        Some(from_index_time(end, self.timescale, self.index_time_offset))
    }

    pub fn is_segment_still_available(&mut self, segment: &Segment) -> Option<bool> {
        if segment.is_init {
            return Some(true);
        }
        self.refresh_timeline();
        let ratio = self.timescale as f64 / segment.timescale.max(1) as f64;
        let scaled_time = segment.time * ratio + self.index_time_offset;
        let scaled_duration = segment.duration * ratio;
        self.timeline.is_still_available(scaled_time, scaled_duration)
    }

    /// Start, in seconds, of the range following a gap right after `time`
    /// (in seconds). `None` when `time` is not within one timescale unit
    /// of a gap.
    pub fn check_discontinuity(&mut self, time: f64) -> Option<f64> {
        self.refresh_timeline();
        let scaled_time = to_index_time(time, self.timescale, self.index_time_offset);
        if scaled_time <= 0.0 {
            return None;
        }
        let idx = self.timeline.index_of(scaled_time);
        let entries = self.timeline.entries();
        let entry = entries.get(idx)?;
        if entry.duration == UNKNOWN_DURATION || scaled_time < entry.start {
            return None;
        }
        let next = entries.get(idx + 1)?;
        let range_end = entry_end(entry, Some(next), self.scaled_period_end);
        if range_end < next.start && (range_end - scaled_time) < self.timescale as f64 {
            return Some(from_index_time(
                next.start,
                self.timescale,
                self.index_time_offset,
            ));
        }
        None
    }

    pub fn can_be_out_of_sync_error(&self, error: FetchErrorKind) -> bool {
        self.is_dynamic && error.is_not_found()
    }

    pub fn is_finished(&mut self) -> bool {
        if !self.is_dynamic {
            return true;
        }
        let Some(scaled_period_end) = self.scaled_period_end else {
            return false;
        };
        self.ensure_parsed();
        let Some(last) = self.timeline.last().copied() else {
            return false;
        };
        let end = entry_end(&last, None, self.scaled_period_end);
        // Timelines and declared Period ends routinely disagree by a hair;
        // tolerate up to 1/60th of a second.
        end + self.timescale as f64 / 60.0 >= scaled_period_end
    }

    pub fn replace(&mut self, new: &mut TimelineIndex) {
        std::mem::swap(self, new);
    }

    pub fn update(&mut self, new: &mut TimelineIndex) -> ManifestResult<()> {
        new.ensure_parsed();
        let new_timeline = std::mem::take(&mut new.timeline);
        self.ensure_parsed();
        self.timeline.update(new_timeline)?;
        self.is_dynamic = new.is_dynamic;
        self.scaled_period_start = new.scaled_period_start;
        self.scaled_period_end = new.scaled_period_end;
        self.bounds = new.bounds.clone();
        Ok(())
    }

    /// See [`crate::RepresentationIndex::timeline_snapshot`].
    pub fn timeline_snapshot(&self) -> Option<SegmentTimeline> {
        if self.raw_timeline.is_none() {
            Some(self.timeline.clone())
        } else {
            None
        }
    }

    fn ensure_parsed(&mut self) {
        if let Some(items) = self.raw_timeline.take() {
            self.timeline = match self.previous_timeline.take() {
                Some(previous) => {
                    SegmentTimeline::from_previous(&items, &previous, self.scaled_period_start).0
                }
                None => SegmentTimeline::from_raw_items(&items, self.scaled_period_start).0,
            };
        }
    }

    fn refresh_timeline(&mut self) {
        self.ensure_parsed();
        if let Some(minimum) = self.bounds.minimum_bound() {
            let scaled = to_index_time(minimum, self.timescale, self.index_time_offset);
            self.timeline.clear_up_to(scaled);
        }
    }
}
