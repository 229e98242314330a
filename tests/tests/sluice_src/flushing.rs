use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use rstest::*;
use sluice_src::{ElementState, SourceConfig, StreamEvent, mock::PatternSource};

use crate::common::{Harness, SETTLE, TIMEOUT, buffer_sizes, event_names, fixtures::tracing_setup};

#[rstest]
#[timeout(Duration::from_secs(10))]
fn flushing_releases_blocked_create(_tracing_setup: ()) {
    let mut h = Harness::new(SourceConfig::new("blocked"), PatternSource::new(None).blocking());
    h.src.set_state(ElementState::Playing).unwrap();
    assert!(h.probe.wait_created(1, TIMEOUT));

    h.src.set_flushing(true);
    assert!(h.src.is_flushing());
    assert_eq!(h.probe.unlocks(), 1);

    // The task parks instead of spinning on create.
    thread::sleep(SETTLE);
    assert_eq!(h.probe.creates(), 1);
    assert!(h.errors().is_empty());

    h.src.set_flushing(false);
    assert!(!h.src.is_flushing());
    assert_eq!(h.probe.unlock_stops(), 1);
}

#[rstest]
#[timeout(Duration::from_secs(10))]
fn stop_interrupts_blocked_create(_tracing_setup: ()) {
    let h = Harness::new(SourceConfig::new("stuck"), PatternSource::new(None).blocking());
    h.src.set_state(ElementState::Playing).unwrap();
    assert!(h.probe.wait_created(1, TIMEOUT));

    h.src.set_state(ElementState::Null).unwrap();
    assert!(!h.src.is_started());
    assert_eq!(h.probe.stops(), 1);
}

#[rstest]
#[timeout(Duration::from_secs(10))]
fn flush_events_restart_blocked_task(_tracing_setup: ()) {
    let h = Harness::new(SourceConfig::new("restart"), PatternSource::new(None).blocking());
    h.src.set_state(ElementState::Playing).unwrap();
    assert!(h.probe.wait_created(1, TIMEOUT));

    assert!(h.src.send_event(StreamEvent::flush_start()));
    assert!(h.src.send_event(StreamEvent::flush_stop(true)));
    assert!(h.probe.wait_created(2, TIMEOUT));

    // The restarted loop announces the segment again before creating.
    let names = event_names(&h.sink.drain());
    assert_eq!(
        names,
        vec!["stream-start", "segment", "flush-start", "flush-stop", "segment"]
    );
}

#[rstest]
#[timeout(Duration::from_secs(10))]
fn flush_mid_stream_resends_segment(_tracing_setup: ()) {
    let h = Harness::new(SourceConfig::new("midstream").with_blocksize(16), PatternSource::new(None));
    h.sink.set_push_delay(Duration::from_millis(2));
    h.src.set_state(ElementState::Playing).unwrap();
    assert!(h.sink.next_buffer(TIMEOUT).is_some());

    assert!(h.src.send_event(StreamEvent::flush_start()));
    assert!(h.src.send_event(StreamEvent::flush_stop(true)));

    let items = h.sink.until_event("flush-stop", TIMEOUT);
    assert_eq!(event_names(&items).last(), Some(&"flush-stop"));

    let items = h.sink.until_event("segment", TIMEOUT);
    assert!(buffer_sizes(&items).is_empty());
    assert!(h.sink.next_buffer(TIMEOUT).is_some());
}

#[rstest]
#[timeout(Duration::from_secs(10))]
fn flush_discards_queued_events(_tracing_setup: ()) {
    let h = Harness::new(SourceConfig::new("discard"), PatternSource::new(Some(64)));
    assert!(h.src.send_event(StreamEvent::Tag(vec![("k".into(), "v".into())])));
    h.src.set_flushing(true);
    h.src.set_flushing(false);

    h.src.set_state(ElementState::Playing).unwrap();
    let items = h.sink.until_event("eos", TIMEOUT);
    assert!(!event_names(&items).contains(&"tag"));
}

#[rstest]
#[timeout(Duration::from_secs(20))]
fn flush_stop_racing_stop_leaves_no_task(_tracing_setup: ()) {
    let mut h = Harness::new(SourceConfig::new("flush-race").with_blocksize(64), PatternSource::new(None));
    h.sink.set_push_delay(Duration::from_millis(1));

    for _ in 0..10 {
        h.src.set_state(ElementState::Playing).unwrap();
        assert!(h.sink.next_buffer(TIMEOUT).is_some());

        let done = Arc::new(AtomicBool::new(false));
        let flusher = {
            let src = h.src.clone();
            let done = Arc::clone(&done);
            thread::spawn(move || {
                while !done.load(Ordering::SeqCst) {
                    let _ = src.send_event(StreamEvent::flush_start());
                    let _ = src.send_event(StreamEvent::flush_stop(true));
                }
            })
        };
        thread::sleep(Duration::from_millis(5));
        h.src.set_state(ElementState::Ready).unwrap();
        done.store(true, Ordering::SeqCst);
        flusher.join().unwrap();

        assert!(!h.src.is_started());
        let _ = h.sink.drain();
        thread::sleep(SETTLE);
        assert!(buffer_sizes(&h.sink.drain()).is_empty());
    }
    assert!(h.errors().is_empty());
}
