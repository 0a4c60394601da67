#![forbid(unsafe_code)]

//! Ordered-by-start sequence of segment descriptors in index-timescale
//! units.
//!
//! Each entry denotes `repeat_count + 1` contiguous equal-duration segments
//! starting at `start`. A `duration` of `-1` marks an explicitly
//! unbounded/unknown-duration final entry; a negative `repeat_count` means
//! the entry repeats until the next entry or the end of the Period.

use tracing::warn;

use crate::error::{ManifestError, ManifestResult, ParseWarning};

/// Sentinel duration for an entry whose duration is explicitly unknown.
pub const UNKNOWN_DURATION: f64 = -1.0;

/// One timeline entry, in index-timescale units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimelineEntry {
    pub start: f64,
    pub duration: f64,
    pub repeat_count: i64,
}

/// Raw segment descriptor as declared by the source manifest, before gap
/// filling. Any field may be missing.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RawTimelineItem {
    pub start: Option<f64>,
    pub duration: Option<f64>,
    pub repeat_count: Option<i64>,
}

/// End of an entry, i.e. the end of its last repeated segment.
///
/// `next` is the entry coming right after, if any; `scaled_period_end`
/// bounds repeat-to-end entries. An unknown-duration entry without a
/// successor and without a period end reports its own start (its end
/// cannot be computed).
pub fn entry_end(
    entry: &TimelineEntry,
    next: Option<&TimelineEntry>,
    scaled_period_end: Option<f64>,
) -> f64 {
    if entry.duration == UNKNOWN_DURATION {
        return match next {
            Some(n) => n.start,
            None => scaled_period_end.unwrap_or(entry.start),
        };
    }
    match resolved_repeat(entry, next, scaled_period_end) {
        Some(repeat) => entry.start + (repeat + 1) as f64 * entry.duration,
        None => f64::INFINITY,
    }
}

/// Effective repeat count of an entry.
///
/// A negative declared repeat means "repeat until the next entry or the
/// period end"; `None` is returned when that bound is itself unknown.
pub fn resolved_repeat(
    entry: &TimelineEntry,
    next: Option<&TimelineEntry>,
    scaled_period_end: Option<f64>,
) -> Option<i64> {
    if entry.repeat_count >= 0 {
        return Some(entry.repeat_count);
    }
    if entry.duration <= 0.0 {
        return Some(0);
    }
    let repeat_end = next.map(|n| n.start).or(scaled_period_end)?;
    let repeat = ((repeat_end - entry.start) / entry.duration).ceil() as i64 - 1;
    Some(repeat.max(0))
}

/// The timeline itself: entries sorted ascending by `start`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SegmentTimeline {
    entries: Vec<TimelineEntry>,
}

impl SegmentTimeline {
    pub fn new(entries: Vec<TimelineEntry>) -> Self {
        Self { entries }
    }

    /// Build a timeline from raw descriptors, filling gaps:
    ///
    /// - a missing `start` is derived from the previous entry's end, or
    ///   falls back to `timeline_start` for the first item;
    /// - a missing duration is derived from the next item's start;
    /// - `repeat_count` defaults to 0.
    ///
    /// Items still unresolvable after this are dropped; one
    /// [`ParseWarning`] per drop is returned alongside the timeline.
    pub fn from_raw_items(
        items: &[RawTimelineItem],
        timeline_start: f64,
    ) -> (Self, Vec<ParseWarning>) {
        let mut entries: Vec<TimelineEntry> = Vec::with_capacity(items.len());
        let mut warnings = Vec::new();
        for (i, item) in items.iter().enumerate() {
            match resolve_raw_item(item, entries.last(), items.get(i + 1), timeline_start) {
                Some(entry) => entries.push(entry),
                None => {
                    warn!(index = i, "timeline: dropping unresolvable raw entry");
                    warnings.push(ParseWarning::UnresolvableTimelineEntry);
                }
            }
        }
        (Self { entries }, warnings)
    }

    /// Build a timeline from raw descriptors, reusing entries from a
    /// previous version of the same timeline where they provably match.
    ///
    /// This is a performance shortcut for long-running live timelines: the
    /// result is the same as [`SegmentTimeline::from_raw_items`], only the
    /// shared prefix is not re-derived. Falls back to full construction on
    /// any mismatch.
    pub fn from_previous(
        items: &[RawTimelineItem],
        previous: &SegmentTimeline,
        timeline_start: f64,
    ) -> (Self, Vec<ParseWarning>) {
        match Self::try_from_previous(items, previous, timeline_start) {
            Some(timeline) => (timeline, Vec::new()),
            None => {
                warn!("timeline: could not reuse previous timeline, reconstructing in full");
                Self::from_raw_items(items, timeline_start)
            }
        }
    }

    fn try_from_previous(
        items: &[RawTimelineItem],
        previous: &SegmentTimeline,
        timeline_start: f64,
    ) -> Option<SegmentTimeline> {
        if previous.entries.is_empty() || items.is_empty() {
            return None;
        }
        // The reuse path needs an explicit start on the first new item to
        // locate the common point.
        let new_initial_start = items[0].start?;
        let (prev_idx, repeat_skip) = previous.locate_start(new_initial_start)?;

        // Guess where the common span ends inside the new items, then check
        // the guess holds: the last reused previous entry must exactly
        // match the corresponding new item.
        let common_len = previous.entries.len() - prev_idx;
        let last_common_new_idx = common_len.checked_sub(1)?;
        if last_common_new_idx >= items.len() {
            return None;
        }
        let prev_last = previous.entries.last()?;
        let candidate = items[last_common_new_idx];
        let candidate_start = candidate.start?;
        let candidate_duration = candidate.duration?;
        let expected_start = if last_common_new_idx == 0 {
            // The first reused entry may begin mid-repeat.
            prev_last.start + repeat_skip as f64 * prev_last.duration
        } else {
            prev_last.start
        };
        if candidate_start != expected_start || candidate_duration != prev_last.duration {
            return None;
        }

        let mut entries: Vec<TimelineEntry> = previous.entries[prev_idx..].to_vec();
        if let Some(first) = entries.first_mut() {
            if repeat_skip > 0 {
                first.start += repeat_skip as f64 * first.duration;
                first.repeat_count -= repeat_skip;
            }
        }
        // Derive everything past the common span the normal way.
        for (i, item) in items.iter().enumerate().skip(last_common_new_idx + 1) {
            match resolve_raw_item(item, entries.last(), items.get(i + 1), timeline_start) {
                Some(entry) => entries.push(entry),
                None => return None,
            }
        }
        Some(SegmentTimeline { entries })
    }

    /// Find the entry (and the number of repeats to skip inside it) whose
    /// segment grid contains a segment starting exactly at `start`.
    fn locate_start(&self, start: f64) -> Option<(usize, i64)> {
        for (i, entry) in self.entries.iter().enumerate() {
            if entry.start == start {
                return Some((i, 0));
            }
            if entry.start > start {
                return None;
            }
            let end = entry_end(entry, self.entries.get(i + 1), None);
            if end == start {
                continue; // `start` is the next entry's start
            }
            if end > start {
                if entry.duration <= 0.0 {
                    return None;
                }
                let offset = start - entry.start;
                if offset % entry.duration == 0.0 {
                    return Some((i, (offset / entry.duration) as i64));
                }
                return None;
            }
        }
        None
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn first(&self) -> Option<&TimelineEntry> {
        self.entries.first()
    }

    pub fn last(&self) -> Option<&TimelineEntry> {
        self.entries.last()
    }

    /// Index of the last entry whose `start` is <= the given index time
    /// (insertion point minus one, clamped to 0).
    pub fn index_of(&self, scaled_time: f64) -> usize {
        let mut low = 0usize;
        let mut high = self.entries.len();
        while low < high {
            let mid = (low + high) / 2;
            if self.entries[mid].start < scaled_time {
                low = mid + 1;
            } else if self.entries[mid].start > scaled_time {
                high = mid;
            } else {
                return mid;
            }
        }
        low.saturating_sub(1)
    }

    /// End of the timeline, i.e. the end of its last entry. `None` when
    /// empty.
    pub fn end(&self, scaled_period_end: Option<f64>) -> Option<f64> {
        let last = self.entries.last()?;
        Some(entry_end(last, None, scaled_period_end))
    }

    /// Merge a refreshed (typically windowed) timeline into this one,
    /// keeping retained history and splicing the refreshed entries in at
    /// the first start they cover.
    ///
    /// Errors when a gap separates the retained end from the refreshed
    /// start: history in between was never declared and a partial merge
    /// would hide that.
    pub fn update(&mut self, new: SegmentTimeline) -> ManifestResult<()> {
        let new_entries = new.entries;
        let Some(new_first) = new_entries.first().copied() else {
            return Ok(());
        };
        if self.entries.is_empty() {
            self.entries = new_entries;
            return Ok(());
        }
        let old_end = {
            let last_idx = self.entries.len() - 1;
            entry_end(&self.entries[last_idx], Some(&new_first), None)
        };
        if old_end < new_first.start {
            return Err(ManifestError::TimelineUpdateGap);
        }

        for i in (0..self.entries.len()).rev() {
            let curr = self.entries[i];
            if curr.start == new_first.start {
                self.entries.truncate(i);
                self.entries.extend(new_entries);
                return Ok(());
            }
            if curr.start < new_first.start {
                if curr.duration > 0.0 && curr.start + curr.duration > new_first.start {
                    // The refreshed timeline starts inside the first
                    // segment of a retained entry. Drop that entry.
                    warn!(
                        start = curr.start,
                        "timeline: refreshed entries overlap a retained entry, dropping it"
                    );
                    self.entries.truncate(i);
                } else {
                    let curr_end = entry_end(&curr, Some(&new_first), None);
                    if curr_end > new_first.start && curr.duration > 0.0 {
                        // Mid-repeat overlap: keep only the repeats that
                        // finish before the refreshed start.
                        let kept =
                            ((new_first.start - curr.start) / curr.duration).floor() as i64 - 1;
                        self.entries[i].repeat_count = kept.max(0);
                    }
                    self.entries.truncate(i + 1);
                }
                self.entries.extend(new_entries);
                return Ok(());
            }
        }

        warn!("timeline: every retained entry starts after the refreshed timeline");
        self.entries = new_entries;
        Ok(())
    }

    /// Remove leading entries whose end is strictly before the given lower
    /// bound (the timeshift-window edge). Entries straddling the bound are
    /// kept whole; repeated pruning with the same bound is a no-op.
    pub fn clear_up_to(&mut self, scaled_bound: f64) {
        let mut first_kept = 0usize;
        while first_kept < self.entries.len() {
            let end = entry_end(
                &self.entries[first_kept],
                self.entries.get(first_kept + 1),
                None,
            );
            if end < scaled_bound {
                first_kept += 1;
            } else {
                break;
            }
        }
        if first_kept > 0 {
            self.entries.drain(..first_kept);
        }
    }

    /// Whether a segment previously handed out from this timeline is still
    /// covered by it.
    ///
    /// `scaled_time`/`scaled_duration` are in this timeline's units.
    /// Returns `None` when the covering entry has an unknown duration, in
    /// which case availability cannot be decided.
    pub fn is_still_available(&self, scaled_time: f64, scaled_duration: f64) -> Option<bool> {
        for (i, entry) in self.entries.iter().enumerate() {
            if entry.start > scaled_time {
                return Some(false);
            }
            let end = entry_end(entry, self.entries.get(i + 1), None);
            if scaled_time < end {
                if entry.duration == UNKNOWN_DURATION {
                    return None;
                }
                if entry.duration <= 0.0 {
                    return Some(false);
                }
                let offset = scaled_time - entry.start;
                if offset % entry.duration != 0.0 {
                    return Some(false);
                }
                return Some(scaled_duration == entry.duration);
            }
        }
        Some(false)
    }
}

fn resolve_raw_item(
    item: &RawTimelineItem,
    previous: Option<&TimelineEntry>,
    next: Option<&RawTimelineItem>,
    timeline_start: f64,
) -> Option<TimelineEntry> {
    let start = match item.start {
        Some(s) if !s.is_nan() => Some(s),
        _ => match previous {
            None => Some(timeline_start),
            Some(prev) if prev.duration >= 0.0 => {
                Some(prev.start + prev.duration * (prev.repeat_count + 1) as f64)
            }
            Some(_) => None,
        },
    }?;
    let duration = match item.duration {
        Some(d) if !d.is_nan() => Some(d),
        _ => match next.and_then(|n| n.start) {
            Some(next_start) if !next_start.is_nan() => Some(next_start - start),
            _ => None,
        },
    }?;
    Some(TimelineEntry {
        start,
        duration,
        repeat_count: item.repeat_count.unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn raw(start: Option<f64>, duration: Option<f64>, repeat: Option<i64>) -> RawTimelineItem {
        RawTimelineItem {
            start,
            duration,
            repeat_count: repeat,
        }
    }

    fn entry(start: f64, duration: f64, repeat_count: i64) -> TimelineEntry {
        TimelineEntry {
            start,
            duration,
            repeat_count,
        }
    }

    #[test]
    fn fully_explicit_items_construct_identically() {
        let items = [
            raw(Some(0.0), Some(10.0), Some(0)),
            raw(Some(10.0), Some(5.0), Some(3)),
            raw(Some(30.0), Some(10.0), Some(0)),
        ];
        let (timeline, warnings) = SegmentTimeline::from_raw_items(&items, 0.0);
        assert!(warnings.is_empty());
        assert_eq!(
            timeline.entries(),
            &[
                entry(0.0, 10.0, 0),
                entry(10.0, 5.0, 3),
                entry(30.0, 10.0, 0),
            ]
        );
    }

    #[test]
    fn missing_start_is_derived_from_previous_entry() {
        let items = [
            raw(Some(10.0), Some(5.0), Some(3)),
            raw(None, Some(2.0), None),
        ];
        let (timeline, _) = SegmentTimeline::from_raw_items(&items, 0.0);
        // 10 + 5 * (3 + 1) = 30
        assert_eq!(timeline.entries()[1], entry(30.0, 2.0, 0));
    }

    #[test]
    fn missing_start_on_first_item_falls_back_to_timeline_start() {
        let items = [raw(None, Some(4.0), None)];
        let (timeline, _) = SegmentTimeline::from_raw_items(&items, 360.0);
        assert_eq!(timeline.entries(), &[entry(360.0, 4.0, 0)]);
    }

    #[test]
    fn missing_duration_is_derived_from_next_item_start() {
        let items = [
            raw(Some(0.0), None, None),
            raw(Some(8.0), Some(8.0), None),
        ];
        let (timeline, _) = SegmentTimeline::from_raw_items(&items, 0.0);
        assert_eq!(timeline.entries()[0], entry(0.0, 8.0, 0));
    }

    #[test]
    fn unresolvable_items_are_dropped_with_a_warning() {
        let items = [
            raw(Some(0.0), Some(10.0), None),
            // No duration and no next item to derive it from.
            raw(Some(10.0), None, None),
        ];
        let (timeline, warnings) = SegmentTimeline::from_raw_items(&items, 0.0);
        assert_eq!(timeline.len(), 1);
        assert_eq!(warnings, vec![ParseWarning::UnresolvableTimelineEntry]);
    }

    #[rstest]
    #[case(-5.0, 0)]
    #[case(0.0, 0)]
    #[case(9.9, 0)]
    #[case(10.0, 1)]
    #[case(29.0, 1)]
    #[case(30.0, 2)]
    #[case(1000.0, 2)]
    fn index_of_returns_last_entry_at_or_before(#[case] time: f64, #[case] expected: usize) {
        let timeline = SegmentTimeline::new(vec![
            entry(0.0, 10.0, 0),
            entry(10.0, 5.0, 3),
            entry(30.0, 10.0, 0),
        ]);
        assert_eq!(timeline.index_of(time), expected);
    }

    #[test]
    fn entry_end_expands_repeats() {
        let e = entry(10.0, 5.0, 3);
        assert_eq!(entry_end(&e, None, None), 30.0);
    }

    #[test]
    fn entry_end_of_unknown_duration_uses_next_start() {
        let e = entry(10.0, UNKNOWN_DURATION, 0);
        let next = entry(42.0, 1.0, 0);
        assert_eq!(entry_end(&e, Some(&next), None), 42.0);
        assert_eq!(entry_end(&e, None, Some(50.0)), 50.0);
        assert_eq!(entry_end(&e, None, None), 10.0);
    }

    #[test]
    fn negative_repeat_runs_until_next_entry() {
        let e = entry(0.0, 4.0, -1);
        let next = entry(20.0, 4.0, 0);
        assert_eq!(resolved_repeat(&e, Some(&next), None), Some(4));
        assert_eq!(entry_end(&e, Some(&next), None), 20.0);
        assert_eq!(resolved_repeat(&e, None, Some(10.0)), Some(2));
        assert_eq!(resolved_repeat(&e, None, None), None);
    }

    #[test]
    fn pruning_removes_entries_ending_before_bound_and_is_idempotent() {
        let entries = vec![
            entry(0.0, 10.0, 0),
            entry(10.0, 5.0, 3),
            entry(30.0, 10.0, 0),
        ];
        let mut timeline = SegmentTimeline::new(entries.clone());

        timeline.clear_up_to(12.0);
        // First entry ends at 10 < 12: gone. Second ends at 30: straddles,
        // kept whole.
        assert_eq!(timeline.entries(), &entries[1..]);

        let before = timeline.clone();
        timeline.clear_up_to(12.0);
        assert_eq!(timeline, before);

        timeline.clear_up_to(100.0);
        // Last entry ends at 40 < 100 but nothing comes after it; it is
        // still removed, as its whole span is stale.
        assert!(timeline.is_empty());
    }

    #[test]
    fn update_appends_new_trailing_entries() {
        let mut retained = SegmentTimeline::new(vec![entry(0.0, 10.0, 3), entry(40.0, 10.0, 1)]);
        let refreshed = SegmentTimeline::new(vec![entry(40.0, 10.0, 1), entry(60.0, 10.0, 2)]);

        retained.update(refreshed).unwrap();
        assert_eq!(
            retained.entries(),
            &[entry(0.0, 10.0, 3), entry(40.0, 10.0, 1), entry(60.0, 10.0, 2)]
        );
    }

    #[test]
    fn update_keeps_history_older_than_the_refreshed_window() {
        let mut retained = SegmentTimeline::new(vec![entry(0.0, 10.0, 5)]);
        let refreshed = SegmentTimeline::new(vec![entry(60.0, 10.0, 1)]);

        retained.update(refreshed).unwrap();
        assert_eq!(
            retained.entries(),
            &[entry(0.0, 10.0, 5), entry(60.0, 10.0, 1)]
        );
    }

    #[test]
    fn update_rejects_a_gap_between_old_end_and_new_start() {
        let mut retained = SegmentTimeline::new(vec![entry(0.0, 10.0, 0)]);
        let refreshed = SegmentTimeline::new(vec![entry(50.0, 10.0, 0)]);

        assert!(matches!(
            retained.update(refreshed),
            Err(ManifestError::TimelineUpdateGap)
        ));
    }

    #[test]
    fn update_with_empty_refresh_is_a_no_op() {
        let mut retained = SegmentTimeline::new(vec![entry(0.0, 10.0, 0)]);
        let before = retained.clone();
        retained.update(SegmentTimeline::default()).unwrap();
        assert_eq!(retained, before);
    }

    #[test]
    fn update_trims_a_partially_overlapped_repeat() {
        // Retained entry covers [0, 60) in 10s repeats; refresh restates
        // from 30 on with a different grid.
        let mut retained = SegmentTimeline::new(vec![entry(0.0, 10.0, 5)]);
        let refreshed = SegmentTimeline::new(vec![entry(30.0, 15.0, 1)]);

        retained.update(refreshed).unwrap();
        assert_eq!(
            retained.entries(),
            &[entry(0.0, 10.0, 2), entry(30.0, 15.0, 1)]
        );
    }

    #[test]
    fn availability_checks_exact_alignment_inside_repeats() {
        let timeline = SegmentTimeline::new(vec![entry(0.0, 10.0, 3)]);

        assert_eq!(timeline.is_still_available(20.0, 10.0), Some(true));
        // Misaligned start.
        assert_eq!(timeline.is_still_available(21.0, 10.0), Some(false));
        // Wrong duration.
        assert_eq!(timeline.is_still_available(20.0, 5.0), Some(false));
        // Past the end.
        assert_eq!(timeline.is_still_available(40.0, 10.0), Some(false));
    }

    #[test]
    fn availability_is_unknown_inside_an_unbounded_entry() {
        let timeline =
            SegmentTimeline::new(vec![entry(0.0, 10.0, 0), entry(10.0, UNKNOWN_DURATION, 0)]);
        assert_eq!(timeline.is_still_available(10.0, 10.0), None);
    }

    #[test]
    fn from_previous_matches_full_construction() {
        // Previous live timeline, already constructed.
        let previous = SegmentTimeline::new(vec![
            entry(0.0, 10.0, 1),
            entry(20.0, 10.0, 0),
            entry(30.0, 10.0, 0),
        ]);
        // The refreshed manifest re-declares everything plus one new item.
        let items = [
            raw(Some(0.0), Some(10.0), Some(1)),
            raw(Some(20.0), Some(10.0), None),
            raw(Some(30.0), Some(10.0), None),
            raw(Some(40.0), Some(10.0), None),
        ];
        let (incremental, _) = SegmentTimeline::from_previous(&items, &previous, 0.0);
        let (full, _) = SegmentTimeline::from_raw_items(&items, 0.0);
        assert_eq!(incremental, full);
    }

    #[test]
    fn from_previous_falls_back_on_mismatch() {
        let previous = SegmentTimeline::new(vec![entry(0.0, 10.0, 1)]);
        // Different duration at the supposed common point.
        let items = [raw(Some(0.0), Some(5.0), Some(3)), raw(Some(20.0), Some(10.0), None)];
        let (incremental, _) = SegmentTimeline::from_previous(&items, &previous, 0.0);
        let (full, _) = SegmentTimeline::from_raw_items(&items, 0.0);
        assert_eq!(incremental, full);
    }
}
