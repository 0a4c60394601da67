#![forbid(unsafe_code)]

//! Segment descriptors handed to the buffer layer.

/// Provenance attached by a composing (virtual-timeline) index so the
/// fetch/parse stage knows which underlying transport and content a
/// segment belongs to.
#[derive(Clone, Debug, PartialEq)]
pub struct PrivateInfos {
    /// Transport of the wrapped content (e.g. "dash", "smooth").
    pub transport: String,
    /// Identifies the wrapped content inside the virtual timeline.
    pub base_content: BaseContentInfos,
    /// Offset, in seconds, applied to the wrapped content.
    pub content_start: f64,
    /// Absolute end, in seconds, of the wrapped content inside the
    /// virtual timeline. `None` when unbounded.
    pub content_end: Option<f64>,
}

/// Identity of a wrapped content as seen by the composing index.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BaseContentInfos {
    pub manifest_id: Option<String>,
    pub period_id: Option<String>,
    pub adaptation_id: Option<String>,
    pub representation_id: Option<String>,
}

/// One addressable media segment.
///
/// `time` and `duration` are expressed in `timescale` units; divide by
/// `timescale` for seconds.
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    pub id: String,
    /// Start, in `timescale` units.
    pub time: f64,
    /// Duration, in `timescale` units. 0 for initialization segments.
    pub duration: f64,
    pub timescale: u64,
    /// Whether this is the initialization segment.
    pub is_init: bool,
    /// Byte range to request, when the segment is a sub-range of a
    /// larger resource.
    pub range: Option<(u64, u64)>,
    /// Byte range of a server-side segment index to fetch alongside an
    /// initialization segment.
    pub index_range: Option<(u64, u64)>,
    /// Materialized media URLs, in candidate order. Empty when the
    /// source declared no template.
    pub media_urls: Vec<String>,
    /// Sequence number, when the addressing scheme numbers segments.
    pub number: Option<u64>,
    /// Provenance set by a wrapping index, if any.
    pub private_infos: Option<PrivateInfos>,
}

impl Segment {
    /// Start in presentation seconds.
    pub fn start_seconds(&self) -> f64 {
        self.time / self.timescale as f64
    }

    /// Duration in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.duration / self.timescale as f64
    }

    /// End in presentation seconds.
    pub fn end_seconds(&self) -> f64 {
        (self.time + self.duration) / self.timescale as f64
    }
}
