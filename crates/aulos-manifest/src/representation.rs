#![forbid(unsafe_code)]

use aulos_core::IdGenerator;

use crate::{
    index::{IndexContext, RepresentationIndex},
    timeline::SegmentTimeline,
    types::{BuildContext, ContentProtection, ParsedRepresentation},
};

/// One quality of a track: a bitrate/codec variant plus the index
/// answering which segments exist for it.
#[derive(Clone, Debug)]
pub struct Representation {
    /// Id found in the source manifest, or generated when absent. Stable
    /// across refreshes of the same manifest.
    pub id: String,
    /// Bitrate in bits per second.
    pub bitrate: u32,
    pub codecs: Option<String>,
    pub mime_type: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub content_protections: Vec<ContentProtection>,
    pub index: RepresentationIndex,
}

impl Representation {
    pub(crate) fn new(
        parsed: ParsedRepresentation,
        ctx: &BuildContext,
        id_gen: &mut IdGenerator,
    ) -> Self {
        let id = parsed.id.unwrap_or_else(|| id_gen.generate());
        let index_ctx = IndexContext {
            bounds: ctx.bounds.clone(),
            period_start: ctx.period_start,
            period_end: ctx.period_end,
            is_dynamic: ctx.is_dynamic,
            base_urls: &parsed.base_urls,
        };
        let index = RepresentationIndex::from_parsed(parsed.index, &index_ctx);
        Self {
            id,
            bitrate: parsed.bitrate,
            codecs: parsed.codecs,
            mime_type: parsed.mime_type,
            width: parsed.width,
            height: parsed.height,
            content_protections: parsed.content_protections,
            index,
        }
    }

    /// `mime_type;codecs="..."` string, as consumed by media source APIs.
    pub fn mime_type_string(&self) -> String {
        format!(
            "{};codecs=\"{}\"",
            self.mime_type.as_deref().unwrap_or(""),
            self.codecs.as_deref().unwrap_or(""),
        )
    }

    /// Parsed-timeline snapshot for reuse when constructing the next
    /// version of this same Representation (see
    /// [`RepresentationIndex::timeline_snapshot`]).
    pub fn timeline_snapshot(&self) -> Option<SegmentTimeline> {
        self.index.timeline_snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bounds::ManifestBoundsCalculator,
        types::{ParsedIndex, TimelineIndexArgs},
    };

    fn build_ctx() -> BuildContext {
        BuildContext {
            bounds: ManifestBoundsCalculator::new(false, None),
            period_start: 0.0,
            period_end: None,
            is_dynamic: false,
        }
    }

    fn parsed(id: Option<&str>) -> ParsedRepresentation {
        ParsedRepresentation {
            id: id.map(str::to_string),
            bitrate: 1_500_000,
            codecs: Some("avc1.42E01E".to_string()),
            mime_type: Some("video/mp4".to_string()),
            width: Some(1280),
            height: Some(720),
            content_protections: vec![],
            base_urls: vec![],
            index: ParsedIndex::Timeline(TimelineIndexArgs::default()),
        }
    }

    #[test]
    fn keeps_the_manifest_supplied_id() {
        let mut gen = IdGenerator::new("representation-");
        let representation = Representation::new(parsed(Some("video-hi")), &build_ctx(), &mut gen);
        assert_eq!(representation.id, "video-hi");
    }

    #[test]
    fn generates_an_id_when_the_manifest_has_none() {
        let mut gen = IdGenerator::new("representation-");
        let first = Representation::new(parsed(None), &build_ctx(), &mut gen);
        let second = Representation::new(parsed(None), &build_ctx(), &mut gen);
        assert_eq!(first.id, "representation-0");
        assert_eq!(second.id, "representation-1");
    }

    #[test]
    fn builds_the_mime_type_string() {
        let mut gen = IdGenerator::new("representation-");
        let representation = Representation::new(parsed(None), &build_ctx(), &mut gen);
        assert_eq!(
            representation.mime_type_string(),
            "video/mp4;codecs=\"avc1.42E01E\""
        );
    }
}
