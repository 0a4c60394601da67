#![forbid(unsafe_code)]

use thiserror::Error;

/// Fatal manifest errors.
///
/// Anything here aborts the operation that raised it; recoverable parsing
/// issues go through [`ParseWarning`] instead.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// A Period lost every supported Adaptation of a required media type.
    #[error("Manifest parse error: {0}")]
    Parse(String),

    /// `replace`/`update` was called across incompatible index variants.
    /// This is a programming error on the caller's side, not bad data.
    #[error("Incompatible RepresentationIndex variants: {0}")]
    IncompatibleIndex(String),

    /// A refreshed timeline could not be merged into the retained one
    /// because a gap separates the retained end from the refreshed start.
    #[error("Cannot perform partial timeline update: not enough data")]
    TimelineUpdateGap,
}

pub type ManifestResult<T> = Result<T, ManifestError>;

/// Non-fatal parsing issues, accumulated on the entity that observed them
/// and aggregated upward (Representation -> Adaptation -> Period -> Manifest).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseWarning {
    #[error("Unsupported adaptation type: {0}")]
    UnsupportedAdaptationType(String),

    #[error("Timeline entry could not be resolved and was dropped")]
    UnresolvableTimelineEntry,

    #[error("Manifest warning: {0}")]
    Other(String),
}

/// Classification of a transport-layer fetch failure, as reported by the
/// (out of scope) network collaborator.
///
/// The core never fetches anything itself; it only consumes this to decide
/// whether a failed segment request may mean "the index is stale, refresh
/// the manifest" (see `can_be_out_of_sync_error`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// The resource was not found on the server (e.g. HTTP 404).
    NotFound,
    /// The request timed out.
    Timeout,
    /// Any other HTTP error status.
    Http(u16),
    /// Anything else (DNS failure, connection reset, ...).
    Other,
}

impl FetchErrorKind {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchErrorKind::NotFound | FetchErrorKind::Http(404))
    }
}
