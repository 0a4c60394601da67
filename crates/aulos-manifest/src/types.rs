#![forbid(unsafe_code)]

//! Generic parsed-manifest intermediate representation.
//!
//! Format-specific parsers (DASH, Smooth, local, metaplaylist, ...) are
//! external collaborators: they turn raw manifest bytes into these types,
//! which this crate consumes as-is to build the [`crate::Manifest`] tree.

use std::{sync::Arc, time::Instant};

use url::Url;

use crate::{
    bounds::ManifestBoundsCalculator,
    representation::Representation,
    timeline::{RawTimelineItem, SegmentTimeline},
};

/// A min/max position of the presentation, tagged with how it was obtained
/// and when.
#[derive(Clone, Copy, Debug)]
pub struct PositionBound {
    /// Position in seconds.
    pub value: f64,
    /// `true` when the value keeps progressing with wall-clock time
    /// (live edge), `false` for a discrete measurement.
    pub is_continuous: bool,
    /// When the value was computed.
    pub observed_at: Instant,
}

/// Root of the intermediate representation.
#[derive(Clone, Debug)]
pub struct ParsedManifest {
    /// Transport this manifest was parsed from (e.g. "dash", "smooth",
    /// "local", "metaplaylist").
    pub transport: String,
    /// Whether the manifest may still change and should be re-fetched.
    pub is_dynamic: bool,
    /// Whether the content is live (playback follows the live edge).
    pub is_live: bool,
    pub availability_start_time: Option<f64>,
    /// Refresh hint, in seconds, for dynamic manifests.
    pub lifetime: Option<f64>,
    /// Depth of the timeshift window, in seconds, for dynamic content.
    pub time_shift_buffer_depth: Option<f64>,
    pub suggested_presentation_delay: Option<f64>,
    pub minimum_time: Option<PositionBound>,
    pub maximum_time: Option<PositionBound>,
    /// Candidate URLs this manifest can be refreshed from.
    pub uris: Vec<Url>,
    pub periods: Vec<ParsedPeriod>,
}

/// One parsed Period. `adaptations` is empty (and ignored) when
/// `is_loaded` is `false`: the Period is then a placeholder to be
/// resolved later through `url`.
#[derive(Clone, Debug)]
pub struct ParsedPeriod {
    /// Id found in the source manifest, if any.
    pub id: Option<String>,
    /// Absolute start, in seconds.
    pub start: f64,
    /// Duration in seconds; `None` while the Period is the live edge.
    pub duration: Option<f64>,
    /// URL allowing to refresh or resolve only this Period.
    pub url: Option<Url>,
    pub is_loaded: bool,
    /// Id of the placeholder Period this one resolves, when it was
    /// fetched through a [`crate::PartialPeriod`] URL.
    pub partial_period_id: Option<String>,
    pub adaptations: Vec<ParsedAdaptation>,
}

#[derive(Clone, Debug)]
pub struct ParsedAdaptation {
    pub id: Option<String>,
    /// Raw media type string ("audio", "video", ...). Unknown values make
    /// the whole Adaptation an accumulated non-fatal warning.
    pub media_type: String,
    pub audio_description: bool,
    pub closed_caption: bool,
    pub representations: Vec<ParsedRepresentation>,
}

#[derive(Clone, Debug)]
pub struct ParsedRepresentation {
    pub id: Option<String>,
    /// Bitrate in bits per second.
    pub bitrate: u32,
    pub codecs: Option<String>,
    pub mime_type: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub content_protections: Vec<ContentProtection>,
    /// Base URLs the media templates resolve against, already flattened
    /// through manifest/period/adaptation inheritance by the parser.
    pub base_urls: Vec<Url>,
    pub index: ParsedIndex,
}

/// Content-protection descriptor attached to a Representation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentProtection {
    /// DRM system identifier (e.g. a UUID urn).
    pub system_id: String,
    /// Default key ids, hex-encoded.
    pub key_ids: Vec<String>,
}

/// Segment-addressing arguments, one variant per index strategy.
#[derive(Clone, Debug)]
pub enum ParsedIndex {
    Timeline(TimelineIndexArgs),
    Local(LocalIndexArgs),
    Composite(CompositeIndexArgs),
}

/// Arguments for a timeline-based index.
#[derive(Clone, Debug, Default)]
pub struct TimelineIndexArgs {
    pub timescale: u64,
    /// Offset between media time and presentation time, in `timescale`
    /// units.
    pub presentation_time_offset: Option<f64>,
    /// Media-segment URL template (may carry `$Time$`/`$Number$` tokens).
    pub media_template: Option<String>,
    pub initialization: Option<InitializationArgs>,
    /// Byte range of a segment index declared on the server.
    pub index_range: Option<(u64, u64)>,
    /// Number of the first segment, for `$Number$` addressing.
    pub start_number: Option<u64>,
    /// Raw segment descriptors, kept unparsed until first read.
    pub raw_timeline: Vec<RawTimelineItem>,
    /// Parsed timeline of the previous version of this same index, used
    /// once to speed up construction (see
    /// [`Representation::timeline_snapshot`]).
    pub previous_timeline: Option<SegmentTimeline>,
}

#[derive(Clone, Debug, Default)]
pub struct InitializationArgs {
    pub media_template: Option<String>,
    pub range: Option<(u64, u64)>,
}

/// Arguments for a pre-computed local/offline index.
#[derive(Clone, Debug)]
pub struct LocalIndexArgs {
    pub timescale: u64,
    /// Complete segment list, in `timescale` units, ordered by time.
    pub segments: Vec<LocalSegmentDescriptor>,
    /// Whether the local download finished (the list will not grow).
    pub is_finished: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalSegmentDescriptor {
    pub time: f64,
    pub duration: f64,
}

/// Arguments for a composing (virtual-timeline) index.
#[derive(Clone, Debug)]
pub struct CompositeIndexArgs {
    pub wrapped: Box<ParsedIndex>,
    /// Offset, in seconds, at which the wrapped content is spliced into
    /// the virtual timeline.
    pub time_offset: f64,
    /// Absolute end, in seconds, of the wrapped content inside the
    /// virtual timeline.
    pub content_end: Option<f64>,
    /// Transport of the wrapped content.
    pub transport: String,
    pub base_content: crate::segment::BaseContentInfos,
}

/// Context a Representation passes down to the filter predicate.
#[derive(Clone, Debug)]
pub struct RepresentationFilterContext {
    pub media_type: aulos_core::MediaType,
    pub adaptation_id: String,
}

/// Optional predicate excluding undesired Representations (e.g.
/// unsupported codecs). A rejection is deliberate filtering, not a
/// parsing defect: it contributes no warning.
pub type RepresentationFilter =
    Arc<dyn Fn(&Representation, &RepresentationFilterContext) -> bool + Send + Sync>;

/// Manifest-level context threaded through tree construction.
#[derive(Clone, Debug)]
pub(crate) struct BuildContext {
    pub bounds: ManifestBoundsCalculator,
    pub period_start: f64,
    pub period_end: Option<f64>,
    pub is_dynamic: bool,
}
