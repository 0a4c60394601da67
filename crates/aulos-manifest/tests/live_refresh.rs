#![forbid(unsafe_code)]

//! Dynamic-content behaviors: timeshift pruning, staleness detection and
//! end-of-stream.


use std::time::Instant;

use aulos_manifest::{FetchErrorKind, Period, PositionBound, UpdateReason};
use fixture::{av_period, build, parsed_manifest};

fn dynamic_manifest(
    items: &[(f64, f64, i64)],
    depth: Option<f64>,
    live_edge: Option<f64>,
) -> aulos_manifest::Manifest {
    let mut parsed = parsed_manifest(vec![av_period("p1", 0.0, None, items)]);
    parsed.is_dynamic = true;
    parsed.is_live = true;
    parsed.time_shift_buffer_depth = depth;
    parsed.maximum_time = live_edge.map(|value| PositionBound {
        value,
        is_continuous: true,
        observed_at: Instant::now(),
    });
    build(parsed)
}

#[test]
fn reads_drop_history_behind_the_timeshift_window() {
    let mut manifest = dynamic_manifest(
        &[(0.0, 10.0, 0), (10.0, 10.0, 0), (20.0, 100.0, 0)],
        Some(20.0),
        Some(100.0),
    );

    let Period::Loaded(period) = &mut manifest.periods[0] else {
        panic!("expected a loaded period");
    };
    let index = &mut period.adaptations[0].representations[0].index;
    // Window floor is ~80s: the first two segments expired.
    assert_eq!(index.get_first_position(), Some(20.0));
}

#[test]
fn a_stale_index_is_recognized_from_not_found_errors() {
    let mut manifest = dynamic_manifest(&[(0.0, 10.0, 3)], None, None);
    let Period::Loaded(period) = &mut manifest.periods[0] else {
        panic!("expected a loaded period");
    };
    let index = &period.adaptations[0].representations[0].index;
    assert!(index.can_be_out_of_sync_error(FetchErrorKind::NotFound));
    assert!(index.can_be_out_of_sync_error(FetchErrorKind::Http(404)));
    assert!(!index.can_be_out_of_sync_error(FetchErrorKind::Http(500)));

    // A static manifest can never be out of sync.
    let mut static_manifest = build(parsed_manifest(vec![av_period(
        "p1",
        0.0,
        Some(40.0),
        &[(0.0, 10.0, 3)],
    )]));
    let Period::Loaded(period) = &mut static_manifest.periods[0] else {
        panic!("expected a loaded period");
    };
    let index = &period.adaptations[0].representations[0].index;
    assert!(!index.can_be_out_of_sync_error(FetchErrorKind::NotFound));
}

#[test]
fn an_out_of_sync_refresh_extends_the_live_timeline() {
    fixture::init_tracing();
    let mut manifest = dynamic_manifest(&[(0.0, 10.0, 3)], None, None);

    let mut parsed = parsed_manifest(vec![av_period("p1", 0.0, None, &[(40.0, 10.0, 2)])]);
    parsed.is_dynamic = true;
    parsed.is_live = true;
    let refreshed = build(parsed);

    manifest
        .update(refreshed, Some(UpdateReason::OutOfSync))
        .unwrap();

    let Period::Loaded(period) = &mut manifest.periods[0] else {
        panic!("expected a loaded period");
    };
    let index = &mut period.adaptations[0].representations[0].index;
    assert_eq!(index.get_last_position(), Some(70.0));
    // Retained history is still addressable.
    assert_eq!(index.get_first_position(), Some(0.0));
}

#[test]
fn a_dynamic_period_finishes_once_its_timeline_fills_it() {
    let mut parsed = parsed_manifest(vec![av_period("p1", 0.0, Some(40.0), &[(0.0, 10.0, 3)])]);
    parsed.is_dynamic = true;
    let mut manifest = build(parsed);
    let Period::Loaded(period) = &mut manifest.periods[0] else {
        panic!("expected a loaded period");
    };
    let index = &mut period.adaptations[0].representations[0].index;
    assert!(index.is_finished());

    let mut parsed = parsed_manifest(vec![av_period("p1", 0.0, Some(40.0), &[(0.0, 10.0, 1)])]);
    parsed.is_dynamic = true;
    let mut manifest = build(parsed);
    let Period::Loaded(period) = &mut manifest.periods[0] else {
        panic!("expected a loaded period");
    };
    let index = &mut period.adaptations[0].representations[0].index;
    assert!(!index.is_finished());
}
