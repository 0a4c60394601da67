#![forbid(unsafe_code)]

//! Segment addressing for locally-stored (offline) contents.
//!
//! The whole segment list is known up front; there are no URLs to build
//! since the segments are retrieved by the local loader, not over HTTP.

use crate::{
    error::FetchErrorKind,
    segment::Segment,
    types::{LocalIndexArgs, LocalSegmentDescriptor},
};

#[derive(Clone, Debug)]
pub struct LocalIndex {
    timescale: u64,
    segments: Vec<LocalSegmentDescriptor>,
    is_finished: bool,
}

impl LocalIndex {
    pub fn new(args: LocalIndexArgs) -> Self {
        Self {
            timescale: args.timescale.max(1),
            segments: args.segments,
            is_finished: args.is_finished,
        }
    }

    pub fn get_init_segment(&self) -> Option<Segment> {
        Some(Segment {
            id: "init".to_string(),
            time: 0.0,
            duration: 0.0,
            timescale: self.timescale,
            is_init: true,
            range: None,
            index_range: None,
            media_urls: vec![],
            number: None,
            private_infos: None,
        })
    }

    pub fn get_segments(&self, from: f64, duration: f64) -> Vec<Segment> {
        let scaled_from = from * self.timescale as f64;
        let scaled_to = (from + duration) * self.timescale as f64;
        self.segments
            .iter()
            .filter(|s| s.time + s.duration > scaled_from && s.time < scaled_to)
            .map(|s| self.make_segment(s))
            .collect()
    }

    pub fn get_first_position(&self) -> Option<f64> {
        let first = self.segments.first()?;
        Some(first.time / self.timescale as f64)
    }

    pub fn get_last_position(&self) -> Option<f64> {
        let last = self.segments.last()?;
        Some((last.time + last.duration) / self.timescale as f64)
    }

    pub fn is_segment_still_available(&self, segment: &Segment) -> Option<bool> {
        if segment.is_init {
            return Some(true);
        }
        let ratio = self.timescale as f64 / segment.timescale.max(1) as f64;
        let time = segment.time * ratio;
        Some(self.segments.iter().any(|s| s.time == time))
    }

    /// Local contents are stored contiguously.
    pub fn check_discontinuity(&self, _time: f64) -> Option<f64> {
        None
    }

    /// A local copy can never get back in sync with anything.
    pub fn can_be_out_of_sync_error(&self, _error: FetchErrorKind) -> bool {
        false
    }

    pub fn is_finished(&self) -> bool {
        self.is_finished
    }

    pub fn replace(&mut self, new: &mut LocalIndex) {
        std::mem::swap(self, new);
    }

    /// Keep known segments and append the ones a progressing download
    /// added past them.
    pub fn update(&mut self, new: &mut LocalIndex) {
        let known_end = self
            .segments
            .last()
            .map(|s| s.time + s.duration)
            .unwrap_or(f64::NEG_INFINITY);
        self.segments
            .extend(new.segments.iter().filter(|s| s.time >= known_end));
        self.is_finished = new.is_finished;
    }

    fn make_segment(&self, descriptor: &LocalSegmentDescriptor) -> Segment {
        Segment {
            id: format!("{}", descriptor.time),
            time: descriptor.time,
            duration: descriptor.duration,
            timescale: self.timescale,
            is_init: false,
            range: None,
            index_range: None,
            media_urls: vec![],
            number: None,
            private_infos: None,
        }
    }
}
