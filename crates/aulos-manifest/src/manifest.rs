#![forbid(unsafe_code)]

//! The Manifest tree and its refresh reconciliation.

use std::collections::VecDeque;

use aulos_core::IdGenerator;
use tokio::sync::broadcast;
use tracing::{debug, info};
use url::Url;

use crate::{
    bounds::ManifestBoundsCalculator,
    error::{ManifestResult, ParseWarning},
    events::{EventEmitter, ManifestEvent, UpdateReason},
    period::{update_period_in_place, Period, UpdateType},
    types::{BuildContext, ParsedManifest, PositionBound, RepresentationFilter},
};

/// Options for building a [`Manifest`].
#[derive(Clone, Default)]
pub struct ManifestOptions {
    /// Predicate excluding undesired Representations up front.
    pub representation_filter: Option<RepresentationFilter>,
}

/// Root of the streaming-content model.
///
/// A Manifest is built once from a [`ParsedManifest`] snapshot and then
/// lives for the whole playback session: refreshes are folded into the
/// existing tree through [`Manifest::replace`] / [`Manifest::update`], so
/// entities stay valid for whoever works with them.
#[derive(Debug)]
pub struct Manifest {
    /// Generated id, stable for this Manifest's whole lifetime.
    pub id: String,
    /// Transport this manifest came from; never changed by refreshes.
    pub transport: String,
    pub is_dynamic: bool,
    pub is_live: bool,
    pub availability_start_time: Option<f64>,
    /// Refresh hint, in seconds, for dynamic manifests.
    pub lifetime: Option<f64>,
    pub suggested_presentation_delay: Option<f64>,
    pub minimum_time: Option<PositionBound>,
    pub maximum_time: Option<PositionBound>,
    /// Candidate refresh URLs, in preference order.
    pub uris: Vec<Url>,
    /// Chronologically ordered Periods.
    pub periods: Vec<Period>,
    /// Non-fatal issues from the last parse, aggregated over the tree.
    pub parsing_warnings: Vec<ParseWarning>,
    events: EventEmitter,
    bounds: ManifestBoundsCalculator,
}

impl Manifest {
    pub fn new(parsed: ParsedManifest, options: &ManifestOptions) -> ManifestResult<Self> {
        let bounds =
            ManifestBoundsCalculator::new(parsed.is_dynamic, parsed.time_shift_buffer_depth);
        if let Some(maximum) = parsed.maximum_time {
            bounds.set_last_position(maximum.value, maximum.observed_at);
        }

        let root_gen = IdGenerator::new("");
        let mut manifest_gen = root_gen.child("manifest");
        let id = manifest_gen.generate();
        let mut period_gen = root_gen.child("period");
        let ctx = BuildContext {
            bounds: bounds.clone(),
            period_start: 0.0,
            period_end: None,
            is_dynamic: parsed.is_dynamic,
        };

        let mut periods = Vec::with_capacity(parsed.periods.len());
        let mut parsing_warnings = Vec::new();
        for parsed_period in parsed.periods {
            let period = Period::new(
                parsed_period,
                &ctx,
                options.representation_filter.as_ref(),
                &mut period_gen,
            )?;
            if let Period::Loaded(loaded) = &period {
                parsing_warnings.extend(loaded.parsing_warnings.iter().cloned());
            }
            periods.push(period);
        }
        periods.sort_by(|a, b| a.start().total_cmp(&b.start()));

        Ok(Self {
            id,
            transport: parsed.transport,
            is_dynamic: parsed.is_dynamic,
            is_live: parsed.is_live,
            availability_start_time: parsed.availability_start_time,
            lifetime: parsed.lifetime,
            suggested_presentation_delay: parsed.suggested_presentation_delay,
            minimum_time: parsed.minimum_time,
            maximum_time: parsed.maximum_time,
            uris: parsed.uris,
            periods,
            parsing_warnings,
            events: EventEmitter::default(),
            bounds,
        })
    }

    /// URL to refresh this manifest from.
    pub fn get_url(&self) -> Option<&Url> {
        self.uris.first()
    }

    /// The Period covering `time`, in seconds.
    pub fn period_for_time(&self, time: f64) -> Option<&Period> {
        self.periods.iter().find(|p| p.contains_time(time))
    }

    /// The Period right after the one covering `time`.
    pub fn period_after(&self, time: f64) -> Option<&Period> {
        self.periods.iter().find(|p| p.start() > time)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ManifestEvent> {
        self.events.subscribe()
    }

    /// Bounds calculator shared with every index of this Manifest.
    pub fn bounds_calculator(&self) -> &ManifestBoundsCalculator {
        &self.bounds
    }

    /// Fold a full refresh into this Manifest: the snapshot restates
    /// everything, so matched indices are replaced wholesale.
    pub fn replace(&mut self, new: Manifest, reason: Option<UpdateReason>) -> ManifestResult<()> {
        self.perform_update(new, UpdateType::Full, reason)
    }

    /// Fold a windowed refresh into this Manifest: the snapshot only
    /// covers recent history, so matched indices are merged.
    pub fn update(&mut self, new: Manifest, reason: Option<UpdateReason>) -> ManifestResult<()> {
        self.perform_update(new, UpdateType::Partial, reason)
    }

    fn perform_update(
        &mut self,
        new: Manifest,
        update_type: UpdateType,
        reason: Option<UpdateReason>,
    ) -> ManifestResult<()> {
        // `id` and `transport` deliberately keep their original values.
        self.is_dynamic = new.is_dynamic;
        self.is_live = new.is_live;
        self.availability_start_time = new.availability_start_time;
        self.lifetime = new.lifetime;
        self.suggested_presentation_delay = new.suggested_presentation_delay;
        self.minimum_time = new.minimum_time;
        self.maximum_time = new.maximum_time;
        self.uris = new.uris;
        self.parsing_warnings = new.parsing_warnings;
        self.bounds = new.bounds;

        let result = update_periods(&mut self.periods, new.periods, update_type);
        if result.is_ok() {
            self.events.emit_manifest_update(reason);
        }
        result
    }
}

/// Reconcile the retained Period list against a refreshed one.
///
/// Each refreshed Period is matched (by id, or by start time when ids
/// changed) against the retained list, in order. Matched Periods are
/// updated in place; unmatched refreshed Periods are inserted; retained
/// Periods the refresh no longer declares are dropped.
fn update_periods(
    old: &mut Vec<Period>,
    new: Vec<Period>,
    update_type: UpdateType,
) -> ManifestResult<()> {
    let mut remaining: VecDeque<Period> = old.drain(..).collect();
    let mut result: Vec<Period> = Vec::with_capacity(new.len());
    let mut first_error = None;

    for mut new_period in new {
        let matched = remaining
            .iter()
            .position(|p| p.id() == new_period.id() || p.start() == new_period.start());
        match matched {
            Some(position) => {
                for dropped in remaining.drain(..position) {
                    info!(id = dropped.id(), "manifest: dropping superseded period");
                }
                if let Some(mut old_period) = remaining.pop_front() {
                    if let Err(error) =
                        update_period_in_place(&mut old_period, &mut new_period, update_type)
                    {
                        if first_error.is_none() {
                            first_error = Some(error);
                        }
                    }
                    result.push(old_period);
                }
            }
            None => {
                debug!(id = new_period.id(), "manifest: adding new period");
                result.push(new_period);
            }
        }
    }
    for dropped in remaining {
        info!(id = dropped.id(), "manifest: dropping period absent from refresh");
    }

    *old = result;
    match first_error {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use aulos_core::MediaType;

    use super::*;
    use crate::{
        timeline::RawTimelineItem,
        types::{
            ParsedAdaptation, ParsedIndex, ParsedPeriod, ParsedRepresentation, TimelineIndexArgs,
        },
    };

    fn parsed_adaptation(id: &str, media_type: &str) -> ParsedAdaptation {
        ParsedAdaptation {
            id: Some(id.to_string()),
            media_type: media_type.to_string(),
            audio_description: false,
            closed_caption: false,
            representations: vec![ParsedRepresentation {
                id: Some(format!("{id}-rep")),
                bitrate: 1_000_000,
                codecs: None,
                mime_type: None,
                width: None,
                height: None,
                content_protections: vec![],
                base_urls: vec![],
                index: ParsedIndex::Timeline(TimelineIndexArgs {
                    timescale: 1,
                    raw_timeline: vec![RawTimelineItem {
                        start: Some(0.0),
                        duration: Some(10.0),
                        repeat_count: Some(3),
                    }],
                    ..Default::default()
                }),
            }],
        }
    }

    fn parsed_period(id: &str, start: f64) -> ParsedPeriod {
        ParsedPeriod {
            id: Some(id.to_string()),
            start,
            duration: Some(40.0),
            url: None,
            is_loaded: true,
            partial_period_id: None,
            adaptations: vec![
                parsed_adaptation("a", "audio"),
                parsed_adaptation("v", "video"),
            ],
        }
    }

    fn parsed_manifest(period_ids: &[(&str, f64)]) -> ParsedManifest {
        ParsedManifest {
            transport: "dash".to_string(),
            is_dynamic: false,
            is_live: false,
            availability_start_time: None,
            lifetime: None,
            time_shift_buffer_depth: None,
            suggested_presentation_delay: None,
            minimum_time: None,
            maximum_time: None,
            uris: vec![Url::parse("https://example.com/manifest.mpd").unwrap()],
            periods: period_ids
                .iter()
                .map(|(id, start)| parsed_period(id, *start))
                .collect(),
        }
    }

    fn manifest(period_ids: &[(&str, f64)]) -> Manifest {
        Manifest::new(parsed_manifest(period_ids), &ManifestOptions::default()).unwrap()
    }

    #[test]
    fn a_filter_rejecting_every_video_representation_fails_the_build() {
        let options = ManifestOptions {
            representation_filter: Some(Arc::new(|_representation, ctx| {
                ctx.media_type != MediaType::Video
            })),
        };
        let result = Manifest::new(parsed_manifest(&[("p1", 0.0)]), &options);
        assert!(result.is_err());
    }

    #[test]
    fn periods_are_sorted_chronologically() {
        let manifest = manifest(&[("p2", 40.0), ("p1", 0.0)]);
        let ids: Vec<&str> = manifest.periods.iter().map(|p| p.id()).collect();
        assert_eq!(ids, vec!["p1", "p2"]);
    }

    #[test]
    fn finds_the_period_covering_a_time() {
        let manifest = manifest(&[("p1", 0.0), ("p2", 40.0)]);
        assert_eq!(manifest.period_for_time(10.0).map(Period::id), Some("p1"));
        assert_eq!(manifest.period_for_time(40.0).map(Period::id), Some("p2"));
        assert_eq!(manifest.period_for_time(100.0).map(Period::id), None);
        assert_eq!(manifest.period_after(10.0).map(Period::id), Some("p2"));
    }

    #[test]
    fn replace_keeps_id_and_transport() {
        let mut manifest = manifest(&[("p1", 0.0)]);
        let original_id = manifest.id.clone();

        let mut parsed = parsed_manifest(&[("p1", 0.0)]);
        parsed.transport = "smooth".to_string();
        parsed.is_dynamic = true;
        parsed.is_live = true;
        parsed.lifetime = Some(10.0);
        let new = Manifest::new(parsed, &ManifestOptions::default()).unwrap();

        manifest.replace(new, None).unwrap();
        assert_eq!(manifest.id, original_id);
        assert_eq!(manifest.transport, "dash");
        assert!(manifest.is_dynamic);
        assert!(manifest.is_live);
        assert_eq!(manifest.lifetime, Some(10.0));
    }

    #[test]
    fn replace_emits_exactly_one_update_event() {
        let mut manifest = manifest(&[("p1", 0.0)]);
        let mut rx = manifest.subscribe();

        let new = Manifest::new(parsed_manifest(&[("p1", 0.0)]), &ManifestOptions::default())
            .unwrap();
        manifest
            .replace(new, Some(UpdateReason::Scheduled))
            .unwrap();

        assert!(matches!(
            rx.try_recv().unwrap(),
            ManifestEvent::ManifestUpdate {
                reason: Some(UpdateReason::Scheduled)
            }
        ));
        assert!(rx.try_recv().is_err());
    }
}
