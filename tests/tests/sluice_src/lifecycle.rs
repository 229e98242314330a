use std::time::Duration;

use rstest::*;
use sluice_src::{
    ElementState, ErrorDomain, Event, Format, Segment, SourceConfig, SourceError, SourceEvent,
    StartResult, StateChangeSuccess, StateEvent, mock::PatternSource,
};

use crate::common::{Harness, fixtures::tracing_setup};

#[rstest]
#[timeout(Duration::from_secs(10))]
fn state_changes_are_posted(_tracing_setup: ()) {
    let mut h = Harness::new(SourceConfig::new("src0"), PatternSource::new(Some(1000)));
    h.src.set_state(ElementState::Playing).unwrap();
    assert_eq!(h.src.state(), ElementState::Playing);

    let changes: Vec<_> = h
        .bus()
        .into_iter()
        .filter_map(|event| match event {
            Event::State(StateEvent::Changed { old, new, .. }) => Some((old, new)),
            _ => None,
        })
        .collect();
    assert_eq!(
        changes,
        vec![
            (ElementState::Null, ElementState::Ready),
            (ElementState::Ready, ElementState::Paused),
            (ElementState::Paused, ElementState::Playing),
        ]
    );
}

#[rstest]
#[timeout(Duration::from_secs(10))]
fn start_stop_cycles_end_stopped(_tracing_setup: ()) {
    let h = Harness::new(SourceConfig::new("cycles"), PatternSource::new(Some(4096)));

    for _ in 0..3 {
        h.src.set_state(ElementState::Paused).unwrap();
        assert!(h.src.is_started());
        h.src.set_state(ElementState::Ready).unwrap();
        assert!(!h.src.is_started());
        assert!(!h.src.is_starting());
        assert_eq!(h.src.start_wait(), StartResult::Flushing);
    }
    assert_eq!(h.probe.starts(), 3);
    assert_eq!(h.probe.stops(), 3);
}

#[rstest]
#[timeout(Duration::from_secs(10))]
fn stop_is_idempotent(_tracing_setup: ()) {
    let h = Harness::new(SourceConfig::new("idem"), PatternSource::new(Some(1000)));
    h.src.stop().unwrap();
    assert_eq!(h.probe.stops(), 0);

    h.src.set_state(ElementState::Paused).unwrap();
    h.src.stop().unwrap();
    h.src.stop().unwrap();
    assert_eq!(h.probe.stops(), 1);
    assert!(!h.src.is_started());
}

#[rstest]
#[timeout(Duration::from_secs(10))]
fn failing_start_posts_resource_error(_tracing_setup: ()) {
    let mut h = Harness::new(
        SourceConfig::new("broken"),
        PatternSource::new(Some(1000)).failing_start(),
    );
    let err = h.src.set_state(ElementState::Paused).unwrap_err();
    assert!(matches!(err, SourceError::StateChange(_)));
    assert_eq!(h.src.state(), ElementState::Ready);
    assert!(!h.src.is_started());

    let errors = h.errors();
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        SourceEvent::Error {
            element,
            domain,
            message,
            debug,
        } => {
            assert_eq!(element, "broken");
            assert_eq!(*domain, ErrorDomain::Resource);
            assert_eq!(message, "Failed to start");
            assert!(debug.as_deref().unwrap().contains("cannot open pattern"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[rstest]
#[timeout(Duration::from_secs(10))]
fn start_without_activation_fails(_tracing_setup: ()) {
    let mut h = Harness::new(SourceConfig::new("inactive"), PatternSource::new(Some(1000)));
    assert!(h.src.start().is_err());
    assert!(!h.src.is_started());
    assert_eq!(h.src.start_wait(), StartResult::Error);
    assert!(
        h.errors()
            .iter()
            .any(|e| matches!(e, SourceEvent::Error { message, .. } if message == "Source pad not activated yet"))
    );
}

#[rstest]
#[timeout(Duration::from_secs(10))]
fn format_is_locked_while_started(_tracing_setup: ()) {
    let h = Harness::new(SourceConfig::new("fmt"), PatternSource::new(Some(1000)));
    h.src.set_state(ElementState::Paused).unwrap();
    assert!(matches!(
        h.src.set_format(Format::Time),
        Err(SourceError::Usage(_))
    ));
    assert_eq!(h.src.format(), Format::Bytes);

    h.src.set_state(ElementState::Ready).unwrap();
    h.src.set_format(Format::Time).unwrap();
    assert_eq!(h.src.format(), Format::Time);
}

#[rstest]
#[timeout(Duration::from_secs(10))]
fn timestamping_switches_stopped_source_to_time(_tracing_setup: ()) {
    let h = Harness::new(SourceConfig::new("ts"), PatternSource::new(None));
    assert_eq!(h.src.format(), Format::Bytes);
    h.src.set_do_timestamp(true);
    assert!(h.src.do_timestamp());
    assert_eq!(h.src.format(), Format::Time);
}

#[rstest]
#[timeout(Duration::from_secs(10))]
fn new_segment_rejects_other_format(_tracing_setup: ()) {
    let h = Harness::new(SourceConfig::new("seg"), PatternSource::new(None));
    let before = h.src.segment();

    assert!(!h.src.new_segment(Segment::new(Format::Time)));
    assert_eq!(h.src.segment(), before);

    let mut segment = Segment::new(Format::Bytes);
    segment.start = 10;
    segment.position = 10;
    assert!(h.src.new_segment(segment.clone()));
    assert_eq!(h.src.segment(), segment);
}

#[rstest]
#[timeout(Duration::from_secs(10))]
fn non_live_source_prerolls(_tracing_setup: ()) {
    let h = Harness::new(SourceConfig::new("preroll"), PatternSource::new(Some(1000)));
    assert_eq!(h.src.set_state(ElementState::Ready).unwrap(), StateChangeSuccess::Success);
    assert_eq!(h.src.set_state(ElementState::Paused).unwrap(), StateChangeSuccess::Success);
    assert!(h.src.wait_playing().is_ok());
}
