use std::time::Duration;

use rstest::*;
use sluice_src::{
    ActivationMode, ElementState, ErrorDomain, FlowError, SourceConfig, SourceEvent,
    StreamEvent, mock::PatternSource,
};

use crate::common::{Harness, fixtures::tracing_setup};

fn pulled(size: Option<u64>) -> Harness {
    let h = Harness::new(
        SourceConfig::new("pull").with_mode(ActivationMode::Pull),
        PatternSource::new(size),
    );
    h.src.set_state(ElementState::Paused).unwrap();
    h
}

#[rstest]
#[timeout(Duration::from_secs(10))]
fn get_range_returns_requested_bytes(_tracing_setup: ()) {
    let h = pulled(Some(1000));
    assert!(h.src.is_started());

    let first = h.src.get_range(0, 100).unwrap();
    assert_eq!(first.len(), 100);
    assert_eq!(first.offset, Some(0));
    assert!(first.data().iter().enumerate().all(|(i, b)| *b == i as u8));

    let second = h.src.get_range(300, 10).unwrap();
    assert_eq!(second.data(), &[44_u8, 45, 46, 47, 48, 49, 50, 51, 52, 53]);
    assert_eq!(second.offset_end, Some(310));

    // No streaming thread in pull mode.
    assert!(h.sink.drain().is_empty());
}

#[rstest]
#[case::clipped(950, 100, Ok(50))]
#[case::at_end(1000, 10, Err(FlowError::Eos))]
#[case::past_end(5000, 10, Err(FlowError::Eos))]
#[timeout(Duration::from_secs(10))]
fn reads_are_clipped_to_size(
    _tracing_setup: (),
    #[case] offset: u64,
    #[case] length: u32,
    #[case] expected: Result<usize, FlowError>,
) {
    let h = pulled(Some(1000));
    assert_eq!(h.src.get_range(offset, length).map(|b| b.len()), expected);
}

#[rstest]
#[timeout(Duration::from_secs(10))]
fn pull_near_end_of_range_is_eos(_tracing_setup: ()) {
    let h = Harness::new(
        SourceConfig::new("far")
            .with_mode(ActivationMode::Pull)
            .with_dynamic_size(true),
        PatternSource::new(Some(1000)),
    );
    h.src.set_state(ElementState::Paused).unwrap();
    assert_eq!(h.src.get_range(u64::MAX - 4, 100).unwrap_err(), FlowError::Eos);
    assert_eq!(h.src.get_range(0, 10).unwrap().len(), 10);
}

#[rstest]
#[timeout(Duration::from_secs(10))]
fn flushing_fails_pulls(_tracing_setup: ()) {
    let h = pulled(Some(1000));
    h.src.set_flushing(true);
    assert_eq!(h.src.get_range(0, 10).unwrap_err(), FlowError::Flushing);
    h.src.set_flushing(false);
    assert_eq!(h.src.get_range(0, 10).unwrap().len(), 10);
}

#[rstest]
#[timeout(Duration::from_secs(10))]
fn pulls_after_stop_fail(_tracing_setup: ()) {
    let h = pulled(Some(1000));
    h.src.set_state(ElementState::Ready).unwrap();
    assert_eq!(h.src.get_range(0, 10).unwrap_err(), FlowError::NotSupported);
}

#[rstest]
#[timeout(Duration::from_secs(10))]
fn eos_event_ends_pulls(_tracing_setup: ()) {
    let h = pulled(Some(1000));
    assert!(h.src.send_event(StreamEvent::eos()));
    assert_eq!(h.src.get_range(0, 10).unwrap_err(), FlowError::Eos);
}

#[rstest]
#[timeout(Duration::from_secs(10))]
fn get_range_outside_pull_mode_is_unsupported(_tracing_setup: ()) {
    let h = Harness::new(SourceConfig::new("push"), PatternSource::new(Some(1000)));
    h.src.set_state(ElementState::Paused).unwrap();
    assert_eq!(h.src.get_range(0, 10).unwrap_err(), FlowError::NotSupported);
}

#[rstest]
#[timeout(Duration::from_secs(10))]
fn pull_mode_needs_random_access(_tracing_setup: ()) {
    let mut h = Harness::new(
        SourceConfig::new("sequential").with_mode(ActivationMode::Pull),
        PatternSource::new(Some(1000)).seekable(false),
    );
    assert!(h.src.set_state(ElementState::Paused).is_err());
    assert!(!h.src.is_started());
    assert_eq!(h.probe.stops(), 1);

    let errors = h.errors();
    assert!(matches!(
        errors.as_slice(),
        [SourceEvent::Error { domain: ErrorDomain::Core, message, .. }]
            if message == "Source cannot operate in pull mode"
    ));
}
