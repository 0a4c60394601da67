#![forbid(unsafe_code)]

//! Composing index: splices another index into a larger virtual timeline.
//!
//! Every time-bearing call subtracts the splice offset before delegating
//! to the wrapped index and adds it back on results. Segments handed out
//! get annotated with provenance so the fetch stage knows which
//! underlying transport and content they belong to.

use crate::{
    error::{FetchErrorKind, ManifestResult},
    index::{AddedSegment, IndexContext, RepresentationIndex},
    segment::{BaseContentInfos, PrivateInfos, Segment},
    timeline::SegmentTimeline,
    types::CompositeIndexArgs,
};

#[derive(Clone, Debug)]
pub struct CompositeIndex {
    wrapped: Box<RepresentationIndex>,
    /// Splice offset, in seconds.
    time_offset: f64,
    /// Clip end inside the virtual timeline, in seconds.
    content_end: Option<f64>,
    transport: String,
    base_content: BaseContentInfos,
}

impl CompositeIndex {
    pub fn new(args: CompositeIndexArgs, ctx: &IndexContext<'_>) -> Self {
        // The wrapped index keeps operating in its original time base.
        let wrapped_ctx = IndexContext {
            bounds: ctx.bounds.clone(),
            period_start: ctx.period_start - args.time_offset,
            period_end: args.content_end.map(|end| end - args.time_offset),
            is_dynamic: ctx.is_dynamic,
            base_urls: ctx.base_urls,
        };
        Self {
            wrapped: Box::new(RepresentationIndex::from_parsed(*args.wrapped, &wrapped_ctx)),
            time_offset: args.time_offset,
            content_end: args.content_end,
            transport: args.transport,
            base_content: args.base_content,
        }
    }

    pub fn get_init_segment(&self) -> Option<Segment> {
        let mut segment = self.wrapped.get_init_segment()?;
        segment.private_infos = Some(self.private_infos());
        Some(segment)
    }

    pub fn get_segments(&mut self, from: f64, duration: f64) -> Vec<Segment> {
        let mut segments = self.wrapped.get_segments(from - self.time_offset, duration);
        for segment in &mut segments {
            segment.time += self.time_offset * segment.timescale as f64;
            segment.private_infos = Some(self.private_infos());
        }
        segments
    }

    pub fn get_first_position(&mut self) -> Option<f64> {
        Some(self.wrapped.get_first_position()? + self.time_offset)
    }

    pub fn get_last_position(&mut self) -> Option<f64> {
        Some(self.wrapped.get_last_position()? + self.time_offset)
    }

    pub fn is_segment_still_available(&mut self, segment: &Segment) -> Option<bool> {
        let mut unshifted = segment.clone();
        unshifted.time -= self.time_offset * segment.timescale as f64;
        self.wrapped.is_segment_still_available(&unshifted)
    }

    pub fn check_discontinuity(&mut self, time: f64) -> Option<f64> {
        let gap = self.wrapped.check_discontinuity(time - self.time_offset)?;
        Some(gap + self.time_offset)
    }

    pub fn can_be_out_of_sync_error(&self, error: FetchErrorKind) -> bool {
        self.wrapped.can_be_out_of_sync_error(error)
    }

    pub fn is_finished(&mut self) -> bool {
        self.wrapped.is_finished()
    }

    pub fn replace(&mut self, new: &mut CompositeIndex) -> ManifestResult<()> {
        self.wrapped.replace(&mut new.wrapped)
    }

    pub fn update(&mut self, new: &mut CompositeIndex) -> ManifestResult<()> {
        self.wrapped.update(&mut new.wrapped)
    }

    pub fn add_segments(&mut self, segments: &[AddedSegment]) {
        self.wrapped.add_segments(segments);
    }

    pub fn timeline_snapshot(&self) -> Option<SegmentTimeline> {
        self.wrapped.timeline_snapshot()
    }

    fn private_infos(&self) -> PrivateInfos {
        PrivateInfos {
            transport: self.transport.clone(),
            base_content: self.base_content.clone(),
            content_start: self.time_offset,
            content_end: self.content_end,
        }
    }
}
