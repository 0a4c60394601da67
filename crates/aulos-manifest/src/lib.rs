#![forbid(unsafe_code)]

//! Manifest and segment-addressing core of an adaptive streaming client.
//!
//! The model is a tree: a [`Manifest`] owns chronological [`Period`]s,
//! each Period owns [`Adaptation`]s (tracks), each Adaptation owns
//! [`Representation`]s (qualities), and each Representation owns a
//! [`RepresentationIndex`] answering "which segments exist for this time
//! range".
//!
//! Format-specific parsing, networking and buffering are external
//! collaborators: parsers feed [`types::ParsedManifest`] snapshots in,
//! and manifest refreshes are folded into the existing tree with
//! [`Manifest::replace`] / [`Manifest::update`] so entities stay alive
//! across refreshes.

pub mod bounds;
pub mod error;
pub mod events;
pub mod index;
pub mod segment;
pub mod time;
pub mod timeline;
pub mod tokens;
pub mod types;

mod adaptation;
mod manifest;
mod period;
mod representation;

pub use adaptation::Adaptation;
pub use bounds::ManifestBoundsCalculator;
pub use error::{FetchErrorKind, ManifestError, ManifestResult, ParseWarning};
pub use events::{EventEmitter, ManifestEvent, UpdateReason};
pub use index::{AddedSegment, CompositeIndex, LocalIndex, RepresentationIndex, TimelineIndex};
pub use manifest::{Manifest, ManifestOptions};
pub use period::{update_period_in_place, LoadedPeriod, PartialPeriod, Period, UpdateType};
pub use representation::Representation;
pub use segment::{BaseContentInfos, PrivateInfos, Segment};
pub use timeline::{SegmentTimeline, TimelineEntry, UNKNOWN_DURATION};
pub use types::{ParsedManifest, PositionBound, RepresentationFilter};
