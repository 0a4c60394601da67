#![forbid(unsafe_code)]

//! Periods: consecutive time slices of a presentation.

use aulos_core::{IdGenerator, MediaType};
use tracing::{debug, warn};
use url::Url;

use crate::{
    adaptation::Adaptation,
    error::{ManifestError, ManifestResult, ParseWarning},
    types::{BuildContext, ParsedPeriod, RepresentationFilter},
};

/// How a fresh snapshot is folded into an existing entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateType {
    /// The snapshot restates everything: indices are replaced wholesale.
    Full,
    /// The snapshot only covers a recent window: indices are merged,
    /// keeping retained history.
    Partial,
}

/// A Period whose tracks are fully known.
#[derive(Clone, Debug)]
pub struct LoadedPeriod {
    pub id: String,
    /// Absolute start, in seconds.
    pub start: f64,
    /// Duration in seconds; `None` while this Period is the live edge.
    pub duration: Option<f64>,
    pub adaptations: Vec<Adaptation>,
    /// Id of the placeholder this Period resolved, when it was fetched
    /// through a [`PartialPeriod`] URL.
    pub partial_period_id: Option<String>,
    /// Non-fatal issues observed while building this Period.
    pub parsing_warnings: Vec<ParseWarning>,
}

/// A placeholder Period: only its position is known, its tracks must be
/// resolved later through `url`.
#[derive(Clone, Debug)]
pub struct PartialPeriod {
    pub id: String,
    pub start: f64,
    pub duration: Option<f64>,
    pub url: Option<Url>,
}

#[derive(Clone, Debug)]
pub enum Period {
    Loaded(LoadedPeriod),
    Partial(PartialPeriod),
}

impl Period {
    pub(crate) fn new(
        parsed: ParsedPeriod,
        ctx_bounds: &BuildContext,
        filter: Option<&RepresentationFilter>,
        id_gen: &mut IdGenerator,
    ) -> ManifestResult<Self> {
        let id = parsed.id.clone().unwrap_or_else(|| id_gen.generate());
        if !parsed.is_loaded {
            return Ok(Period::Partial(PartialPeriod {
                id,
                start: parsed.start,
                duration: parsed.duration,
                url: parsed.url,
            }));
        }

        let ctx = BuildContext {
            bounds: ctx_bounds.bounds.clone(),
            period_start: parsed.start,
            period_end: parsed.duration.map(|d| parsed.start + d),
            is_dynamic: ctx_bounds.is_dynamic,
        };
        let mut adaptation_gen = id_gen.child(&id);
        let mut adaptations = Vec::new();
        let mut parsing_warnings = Vec::new();
        let mut declared_required: Vec<MediaType> = Vec::new();
        for parsed_adaptation in parsed.adaptations {
            let media_type = match parsed_adaptation.media_type.parse::<MediaType>() {
                Ok(media_type) => {
                    if media_type.is_required() && !declared_required.contains(&media_type) {
                        declared_required.push(media_type);
                    }
                    media_type
                }
                Err(_) => {
                    warn!(
                        media_type = %parsed_adaptation.media_type,
                        "period: skipping adaptation of unsupported type"
                    );
                    parsing_warnings.push(ParseWarning::UnsupportedAdaptationType(
                        parsed_adaptation.media_type,
                    ));
                    continue;
                }
            };
            let adaptation = Adaptation::new(
                parsed_adaptation,
                media_type,
                &ctx,
                filter,
                &mut adaptation_gen,
            );
            if adaptation.representations.is_empty() {
                debug!(id = %adaptation.id, "period: dropping adaptation left empty by filtering");
                continue;
            }
            adaptations.push(adaptation);
        }

        // A media type the source declares must survive filtering; losing
        // every audio or every video adaptation makes the Period unusable.
        for media_type in declared_required {
            if !adaptations.iter().any(|a| a.media_type == media_type) {
                return Err(ManifestError::Parse(format!(
                    "no supported {media_type} adaptations"
                )));
            }
        }
        let has_audio = adaptations.iter().any(|a| a.media_type == MediaType::Audio);
        let has_video = adaptations.iter().any(|a| a.media_type == MediaType::Video);
        if !has_audio && !has_video {
            return Err(ManifestError::Parse(
                "no supported audio and video tracks".to_string(),
            ));
        }

        Ok(Period::Loaded(LoadedPeriod {
            id,
            start: parsed.start,
            duration: parsed.duration,
            adaptations,
            partial_period_id: parsed.partial_period_id,
            parsing_warnings,
        }))
    }

    pub fn id(&self) -> &str {
        match self {
            Period::Loaded(p) => &p.id,
            Period::Partial(p) => &p.id,
        }
    }

    pub fn start(&self) -> f64 {
        match self {
            Period::Loaded(p) => p.start,
            Period::Partial(p) => p.start,
        }
    }

    pub fn duration(&self) -> Option<f64> {
        match self {
            Period::Loaded(p) => p.duration,
            Period::Partial(p) => p.duration,
        }
    }

    /// Absolute end, in seconds. `None` while the duration is unknown.
    pub fn end(&self) -> Option<f64> {
        self.duration().map(|d| self.start() + d)
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Period::Loaded(_))
    }

    /// Whether `time` (in seconds) falls within this Period.
    pub fn contains_time(&self, time: f64) -> bool {
        time >= self.start() && self.end().map_or(true, |end| time < end)
    }

    pub fn adaptations(&self) -> &[Adaptation] {
        match self {
            Period::Loaded(p) => &p.adaptations,
            Period::Partial(_) => &[],
        }
    }

    pub fn adaptations_of_type(
        &self,
        media_type: MediaType,
    ) -> impl Iterator<Item = &Adaptation> {
        self.adaptations()
            .iter()
            .filter(move |a| a.media_type == media_type)
    }
}

/// Fold a freshly-built Period into an existing one, keeping the existing
/// entity alive for whoever holds onto it.
///
/// Adaptations and Representations are matched by id; entities the fresh
/// snapshot no longer declares are kept and logged. Index errors do not
/// abort the merge of sibling entities; the first one is reported once
/// everything else is folded.
pub fn update_period_in_place(
    old: &mut Period,
    new: &mut Period,
    update_type: UpdateType,
) -> ManifestResult<()> {
    let (old_loaded, new_loaded) = match (&mut *old, &mut *new) {
        (Period::Loaded(o), Period::Loaded(n)) => (o, n),
        (o, n) => {
            // Loadedness changed: take the fresh Period wholesale, keeping
            // the established id.
            debug!(id = o.id(), "period: loaded state changed, replacing wholesale");
            let was_partial = !o.is_loaded();
            let id = o.id().to_string();
            std::mem::swap(o, n);
            match o {
                Period::Loaded(p) => {
                    if was_partial && p.partial_period_id.is_none() {
                        p.partial_period_id = Some(id.clone());
                    }
                    p.id = id;
                }
                Period::Partial(p) => p.id = id,
            }
            return Ok(());
        }
    };

    old_loaded.start = new_loaded.start;
    old_loaded.duration = new_loaded.duration;
    if old_loaded.partial_period_id.is_none() {
        old_loaded.partial_period_id = new_loaded.partial_period_id.take();
    }
    old_loaded.parsing_warnings = new_loaded.parsing_warnings.clone();

    let mut first_error = None;
    for old_adaptation in &mut old_loaded.adaptations {
        let Some(new_adaptation) = new_loaded
            .adaptations
            .iter_mut()
            .find(|a| a.id == old_adaptation.id)
        else {
            warn!(id = %old_adaptation.id, "period: adaptation not found when merging");
            continue;
        };
        for old_representation in &mut old_adaptation.representations {
            let Some(new_representation) = new_adaptation
                .representations
                .iter_mut()
                .find(|r| r.id == old_representation.id)
            else {
                warn!(
                    id = %old_representation.id,
                    "period: representation not found when merging"
                );
                continue;
            };
            let merged = match update_type {
                UpdateType::Full => old_representation
                    .index
                    .replace(&mut new_representation.index),
                UpdateType::Partial => old_representation
                    .index
                    .update(&mut new_representation.index),
            };
            if let Err(error) = merged {
                warn!(id = %old_representation.id, %error, "period: could not merge index");
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
        }
    }
    match first_error {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
