#![forbid(unsafe_code)]

use aulos_core::{IdGenerator, MediaType};

use crate::{
    representation::Representation,
    types::{
        BuildContext, ParsedAdaptation, RepresentationFilter, RepresentationFilterContext,
    },
};

/// A track: a set of interchangeable Representations of one media type.
#[derive(Clone, Debug)]
pub struct Adaptation {
    /// Id found in the source manifest, or generated when absent. Stable
    /// across refreshes of the same manifest.
    pub id: String,
    pub media_type: MediaType,
    /// Audio track describing the visual content for the visually
    /// impaired.
    pub audio_description: bool,
    /// Text track transcribing audio for the hard of hearing.
    pub closed_caption: bool,
    pub representations: Vec<Representation>,
}

impl Adaptation {
    pub(crate) fn new(
        parsed: ParsedAdaptation,
        media_type: MediaType,
        ctx: &BuildContext,
        filter: Option<&RepresentationFilter>,
        id_gen: &mut IdGenerator,
    ) -> Self {
        let id = parsed.id.unwrap_or_else(|| id_gen.generate());
        let mut representation_gen = id_gen.child(&id);
        let filter_ctx = RepresentationFilterContext {
            media_type,
            adaptation_id: id.clone(),
        };
        let representations = parsed
            .representations
            .into_iter()
            .map(|p| Representation::new(p, ctx, &mut representation_gen))
            .filter(|r| filter.map_or(true, |f| f(r, &filter_ctx)))
            .collect();
        Self {
            id,
            media_type,
            audio_description: parsed.audio_description,
            closed_caption: parsed.closed_caption,
            representations,
        }
    }

    pub fn representation(&self, id: &str) -> Option<&Representation> {
        self.representations.iter().find(|r| r.id == id)
    }

    /// Distinct bitrates on offer, ascending.
    pub fn available_bitrates(&self) -> Vec<u32> {
        let mut bitrates: Vec<u32> = self.representations.iter().map(|r| r.bitrate).collect();
        bitrates.sort_unstable();
        bitrates.dedup();
        bitrates
    }
}
