use std::time::Duration;

use rstest::*;
use sluice_src::{
    BufferFlags, ElementState, Format, SeekEvent, SeekFlags, SegmentFlags, SourceConfig,
    StreamEvent,
    mock::{Item, PatternSource},
};

use crate::common::{Harness, TIMEOUT, buffer_sizes, fixtures::tracing_setup};

fn segment_of(items: &[Item]) -> Option<sluice_src::Segment> {
    items.iter().rev().find_map(|item| match item {
        Item::Event(StreamEvent::Segment { segment, .. }) => Some(segment.clone()),
        _ => None,
    })
}

#[rstest]
#[timeout(Duration::from_secs(10))]
fn flushing_seek_repositions_stream(_tracing_setup: ()) {
    let h = Harness::new(
        SourceConfig::new("seek").with_blocksize(256),
        PatternSource::new(Some(10_000)),
    );
    h.sink.set_push_delay(Duration::from_millis(5));
    h.src.set_state(ElementState::Playing).unwrap();
    assert!(h.sink.next_buffer(TIMEOUT).is_some());

    let seek = SeekEvent::new(Format::Bytes, SeekFlags::FLUSH, 5000, None);
    let seqnum = seek.seqnum;
    assert!(h.src.send_event(StreamEvent::Seek(seek)));

    let items = h.sink.until_event("flush-start", TIMEOUT);
    let Some(Item::Event(StreamEvent::FlushStart { seqnum: start_seqnum })) = items.last() else {
        panic!("no flush-start: {items:?}");
    };
    assert_eq!(*start_seqnum, seqnum);

    let items = h.sink.until_event("segment", TIMEOUT);
    assert_eq!(
        items.iter().filter_map(Item::event_name).collect::<Vec<_>>(),
        vec!["flush-stop", "segment"]
    );
    let segment = segment_of(&items).unwrap();
    assert_eq!(segment.start, 5000);
    assert!(segment.flags.contains(SegmentFlags::RESET));
    let Some(Item::Event(StreamEvent::Segment { seqnum: segment_seqnum, .. })) = items.last() else {
        unreachable!();
    };
    assert_eq!(*segment_seqnum, seqnum);

    let buffer = h.sink.next_buffer(TIMEOUT).unwrap();
    assert_eq!(buffer.offset, Some(5000));
    assert_eq!(buffer.data()[0], 5000_u64 as u8);
    assert!(buffer.has_flag(BufferFlags::DISCONT));
}

#[rstest]
#[timeout(Duration::from_secs(10))]
fn unseekable_source_refuses_seek(_tracing_setup: ()) {
    let h = Harness::new(
        SourceConfig::new("noseek").with_blocksize(64),
        PatternSource::new(None).seekable(false),
    );
    h.sink.set_push_delay(Duration::from_millis(2));
    h.src.set_state(ElementState::Playing).unwrap();
    assert!(h.sink.next_buffer(TIMEOUT).is_some());

    let seek = SeekEvent::new(Format::Bytes, SeekFlags::FLUSH, 100, None);
    assert!(!h.src.send_event(StreamEvent::Seek(seek)));
    assert_eq!(h.src.segment().start, 0);
}

#[rstest]
#[timeout(Duration::from_secs(10))]
fn seek_in_other_format_is_refused(_tracing_setup: ()) {
    let h = Harness::new(SourceConfig::new("fmtseek"), PatternSource::new(Some(100_000)));
    h.sink.set_push_delay(Duration::from_millis(2));
    h.src.set_state(ElementState::Playing).unwrap();
    assert!(h.sink.next_buffer(TIMEOUT).is_some());

    let seek = SeekEvent::new(Format::Time, SeekFlags::FLUSH, 1_000_000, None);
    assert!(!h.src.send_event(StreamEvent::Seek(seek)));
    assert_eq!(h.src.segment().format, Format::Bytes);
}

#[rstest]
#[timeout(Duration::from_secs(10))]
fn seek_before_start_sets_initial_segment(_tracing_setup: ()) {
    let h = Harness::new(
        SourceConfig::new("preseek").with_blocksize(100),
        PatternSource::new(Some(1000)),
    );
    let seek = SeekEvent::new(Format::Bytes, SeekFlags::FLUSH, 600, Some(800));
    assert!(h.src.send_event(StreamEvent::Seek(seek)));
    h.src.set_state(ElementState::Playing).unwrap();

    let items = h.sink.until_event("eos", TIMEOUT);
    let segment = segment_of(&items).unwrap();
    assert_eq!((segment.start, segment.stop), (600, Some(800)));
    assert_eq!(buffer_sizes(&items), vec![100, 100]);
    let first = items
        .iter()
        .find_map(|item| match item {
            Item::Buffer(buffer) => Some(buffer),
            _ => None,
        })
        .unwrap();
    assert_eq!(first.offset, Some(600));
}
