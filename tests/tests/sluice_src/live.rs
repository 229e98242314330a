use std::{thread, time::Duration};

use rstest::*;
use sluice_src::{
    ElementState, Format, SourceConfig, StateChangeSuccess, StreamEvent, mock::PatternSource,
};

use crate::common::{Harness, SETTLE, TIMEOUT, buffer_sizes, event_names, fixtures::tracing_setup};

fn live(name: &str) -> Harness {
    let h = Harness::new(
        SourceConfig::new(name).with_live(true).with_blocksize(32),
        PatternSource::new(None),
    );
    h.sink.set_push_delay(Duration::from_millis(2));
    h
}

/// Let in-flight work land, then report whether anything else arrives.
fn stays_quiet(h: &Harness) -> bool {
    thread::sleep(SETTLE);
    let _ = h.sink.drain();
    thread::sleep(SETTLE);
    buffer_sizes(&h.sink.drain()).is_empty()
}

#[rstest]
#[timeout(Duration::from_secs(10))]
fn live_source_waits_for_playing(_tracing_setup: ()) {
    let h = Harness::new(
        SourceConfig::new("cam").with_live(true).with_num_buffers(5),
        PatternSource::new(None),
    );
    h.src.set_state(ElementState::Ready).unwrap();
    assert_eq!(h.src.set_state(ElementState::Paused).unwrap(), StateChangeSuccess::NoPreroll);
    assert!(h.src.is_started());
    assert!(h.sink.next_buffer(SETTLE).is_none());

    assert_eq!(h.src.set_state(ElementState::Playing).unwrap(), StateChangeSuccess::Success);
    let items = h.sink.until_event("eos", TIMEOUT);
    assert_eq!(buffer_sizes(&items).len(), 5);
}

#[rstest]
#[timeout(Duration::from_secs(10))]
fn pausing_holds_live_output(_tracing_setup: ()) {
    let h = live("pause");
    h.src.set_state(ElementState::Playing).unwrap();
    assert!(h.sink.next_buffer(TIMEOUT).is_some());

    assert_eq!(h.src.set_state(ElementState::Paused).unwrap(), StateChangeSuccess::NoPreroll);
    assert!(stays_quiet(&h));

    h.src.set_state(ElementState::Playing).unwrap();
    assert!(h.sink.next_buffer(TIMEOUT).is_some());
}

#[rstest]
#[timeout(Duration::from_secs(10))]
fn flush_stop_while_paused_resumes_on_play(_tracing_setup: ()) {
    let h = live("flush-paused");
    h.src.set_state(ElementState::Playing).unwrap();
    assert!(h.sink.next_buffer(TIMEOUT).is_some());
    h.src.set_state(ElementState::Paused).unwrap();

    assert!(h.src.send_event(StreamEvent::flush_start()));
    assert!(h.src.send_event(StreamEvent::flush_stop(true)));
    assert!(stays_quiet(&h));

    h.src.set_state(ElementState::Playing).unwrap();
    let items = h.sink.until_event("segment", TIMEOUT);
    assert!(buffer_sizes(&items).is_empty());
    assert!(h.sink.next_buffer(TIMEOUT).is_some());
}

#[rstest]
#[timeout(Duration::from_secs(10))]
fn flush_stop_while_playing_restarts_at_once(_tracing_setup: ()) {
    let h = live("flush-playing");
    h.src.set_state(ElementState::Playing).unwrap();
    assert!(h.sink.next_buffer(TIMEOUT).is_some());

    assert!(h.src.send_event(StreamEvent::flush_start()));
    assert!(h.src.send_event(StreamEvent::flush_stop(true)));
    let items = h.sink.until_event("flush-stop", TIMEOUT);
    assert!(!items.is_empty());
    assert!(h.sink.next_buffer(TIMEOUT).is_some());
}

#[rstest]
#[timeout(Duration::from_secs(10))]
fn eos_releases_paused_live_source(_tracing_setup: ()) {
    let h = live("eos-paused");
    h.src.set_state(ElementState::Paused).unwrap();
    assert!(h.src.send_event(StreamEvent::eos()));

    let items = h.sink.until_event("eos", TIMEOUT);
    assert!(buffer_sizes(&items).is_empty());
    assert_eq!(event_names(&items).last(), Some(&"eos"));
}

#[rstest]
#[timeout(Duration::from_secs(10))]
fn timestamped_live_buffers_carry_running_time(_tracing_setup: ()) {
    let h = Harness::new(
        SourceConfig::new("stamp")
            .with_live(true)
            .with_do_timestamp(true)
            .with_num_buffers(3),
        PatternSource::new(None),
    );
    assert_eq!(h.src.format(), Format::Time);
    h.src.set_state(ElementState::Playing).unwrap();

    let mut last = 0;
    for _ in 0..3 {
        let buffer = h.sink.next_buffer(TIMEOUT).unwrap();
        let pts = buffer.pts.unwrap();
        assert!(pts >= last);
        last = pts;
    }
    assert!(h.src.running_time().is_some());
}
