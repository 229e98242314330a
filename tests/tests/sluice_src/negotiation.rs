use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use rstest::*;
use sluice_bufpool::{BufferPool, BufferPoolConfig};
use sluice_platform::Mutex;
use sluice_src::{
    Buffer, BufferList, Caps, Downstream, ElementState, ErrorDomain, Event, FlowError,
    FlowResult, MockDownstream, PoolProposal, Query, SourceConfig, SourceElement, SourceEvent,
    StreamEvent, mock::PatternSource,
};

use crate::common::{Harness, TIMEOUT, event_names, fixtures::tracing_setup, wait_until};

fn proposal(pool: &BufferPool, size: usize) -> PoolProposal {
    PoolProposal {
        pool: Some(pool.clone()),
        size,
        min_buffers: 2,
        max_buffers: 0,
    }
}

#[rstest]
#[timeout(Duration::from_secs(10))]
fn caps_fixate_to_first_common_type(_tracing_setup: ()) {
    let h = Harness::new(
        SourceConfig::new("caps").with_num_buffers(1),
        PatternSource::new(None).with_caps(Caps::new(["audio/raw", "audio/x-flac"])),
    );
    h.sink.set_peer_caps(Caps::new(["audio/x-flac", "audio/raw"]));
    h.src.set_state(ElementState::Playing).unwrap();

    let items = h.sink.until_event("eos", TIMEOUT);
    assert_eq!(event_names(&items), vec!["stream-start", "caps", "segment", "eos"]);
    assert_eq!(h.src.current_caps(), Some(Caps::new(["audio/raw"])));
}

#[rstest]
#[timeout(Duration::from_secs(10))]
fn disjoint_caps_stop_streaming(_tracing_setup: ()) {
    let mut h = Harness::new(
        SourceConfig::new("nocaps"),
        PatternSource::new(None).with_caps(Caps::new(["audio/raw"])),
    );
    h.sink.set_peer_caps(Caps::new(["video/raw"]));
    h.src.set_state(ElementState::Playing).unwrap();

    let items = h.sink.until_event("eos", TIMEOUT);
    assert_eq!(event_names(&items), vec!["stream-start", "eos"]);
    assert!(h.src.current_caps().is_none());
    assert!(h.src.needs_reconfigure());

    let errors = h.errors();
    assert!(matches!(
        errors.as_slice(),
        [SourceEvent::Error { domain: ErrorDomain::Stream, debug: Some(debug), .. }]
            if debug.contains("not negotiated")
    ));
}

#[rstest]
#[timeout(Duration::from_secs(10))]
fn caps_query_is_filtered_by_template(_tracing_setup: ()) {
    let h = Harness::new(
        SourceConfig::new("capsq"),
        PatternSource::new(None).with_caps(Caps::new(["a/x", "b/y"])),
    );
    let mut query = Query::caps(Some(Caps::new(["b/y", "c/z"])));
    assert!(h.src.query(&mut query));
    let Query::Caps { result, .. } = query else {
        unreachable!();
    };
    assert_eq!(result, Some(Caps::new(["b/y"])));
}

#[rstest]
#[timeout(Duration::from_secs(10))]
fn peer_pool_is_used_and_replaced(_tracing_setup: ()) {
    let h = Harness::new(SourceConfig::new("pools").with_blocksize(128), PatternSource::new(None));
    let first = BufferPool::new(BufferPoolConfig::default());
    h.sink.propose_pool(proposal(&first, 512));
    h.sink.set_push_delay(Duration::from_millis(2));
    h.src.set_state(ElementState::Playing).unwrap();

    let buffer = h.sink.next_buffer(TIMEOUT).unwrap();
    assert_eq!(buffer.len(), 128);
    assert!(buffer.memory().is_leased());
    assert!(h.src.buffer_pool().unwrap().same_pool(&first));
    assert!(first.is_active());
    assert_eq!(first.config().size, 512);

    let second = BufferPool::new(BufferPoolConfig::default());
    h.sink.propose_pool(proposal(&second, 256));
    assert!(h.src.src_event(&StreamEvent::Reconfigure));
    assert!(wait_until(|| h.src.buffer_pool().is_some_and(|p| p.same_pool(&second))));
    assert!(second.is_active());
    assert!(!first.is_active());

    h.src.set_state(ElementState::Null).unwrap();
    assert!(h.src.buffer_pool().is_none());
    assert!(!second.is_active());
}

#[rstest]
#[timeout(Duration::from_secs(10))]
fn own_pool_without_peer_proposal(_tracing_setup: ()) {
    let h = Harness::new(SourceConfig::new("ownpool").with_num_buffers(1), PatternSource::new(None));
    h.src.set_state(ElementState::Playing).unwrap();
    let _ = h.sink.until_event("eos", TIMEOUT);

    let pool = h.src.buffer_pool().unwrap();
    assert!(pool.is_active());
    assert_eq!(pool.config().size, h.src.blocksize() as usize);
    let (allocator, _) = h.src.allocator();
    assert!(allocator.is_some());
}

#[rstest]
#[timeout(Duration::from_secs(10))]
fn mocked_peer_sees_ordered_events(_tracing_setup: ()) {
    let names = Arc::new(Mutex::new(Vec::new()));
    let mut peer = MockDownstream::new();
    peer.expect_peer_query().returning(|_| false);
    peer.expect_push().times(2).returning(|_| Ok(()));
    peer.expect_push_list().never();
    {
        let names = Arc::clone(&names);
        peer.expect_push_event().returning(move |event| {
            names.lock().push(event.name());
            true
        });
    }

    let src = SourceElement::new(
        SourceConfig::new("mocked").with_num_buffers(2),
        PatternSource::new(None).with_caps(Caps::new(["audio/raw"])),
        Arc::new(peer),
    );
    src.set_state(ElementState::Playing).unwrap();
    assert!(wait_until(|| names.lock().contains(&"eos")));
    src.set_state(ElementState::Null).unwrap();

    assert_eq!(*names.lock(), vec!["stream-start", "caps", "segment", "eos"]);
}

/// Peer that asks for a reconfigure and rejects the first buffer.
struct RenegotiatingPeer {
    src: Mutex<Option<SourceElement>>,
    rejected: AtomicBool,
    caps_queries: AtomicUsize,
    buffers: kanal::Sender<Buffer>,
}

impl Downstream for RenegotiatingPeer {
    fn push(&self, buffer: Buffer) -> FlowResult<()> {
        if !self.rejected.swap(true, Ordering::SeqCst) {
            if let Some(src) = self.src.lock().as_ref() {
                src.mark_reconfigure();
            }
            return Err(FlowError::NotNegotiated);
        }
        let _ = self.buffers.send(buffer);
        Ok(())
    }

    fn push_list(&self, _list: BufferList) -> FlowResult<()> {
        Ok(())
    }

    fn push_event(&self, _event: StreamEvent) -> bool {
        true
    }

    fn peer_query(&self, query: &mut Query) -> bool {
        match query {
            Query::Caps { result, .. } => {
                self.caps_queries.fetch_add(1, Ordering::SeqCst);
                *result = Some(Caps::new(["audio/raw"]));
                true
            }
            _ => false,
        }
    }
}

#[rstest]
#[timeout(Duration::from_secs(10))]
fn not_negotiated_with_reconfigure_renegotiates(_tracing_setup: ()) {
    let (tx, rx) = kanal::unbounded();
    let peer = Arc::new(RenegotiatingPeer {
        src: Mutex::new(None),
        rejected: AtomicBool::new(false),
        caps_queries: AtomicUsize::new(0),
        buffers: tx,
    });
    let src = SourceElement::new(
        SourceConfig::new("renegotiate").with_blocksize(64),
        PatternSource::new(None).with_caps(Caps::new(["audio/raw"])),
        Arc::clone(&peer) as _,
    );
    *peer.src.lock() = Some(src.clone());
    let mut events = src.bus().subscribe_element(src.name());
    src.set_state(ElementState::Playing).unwrap();

    for _ in 0..3 {
        assert!(rx.recv_timeout(TIMEOUT).is_ok());
    }
    assert!(src.is_started());
    assert_eq!(peer.caps_queries.load(Ordering::SeqCst), 2);
    assert_eq!(src.current_caps(), Some(Caps::new(["audio/raw"])));

    src.set_state(ElementState::Null).unwrap();
    peer.src.lock().take();
    while let Ok(event) = events.try_recv() {
        assert!(!matches!(event, Event::Source(ref e) if e.is_error()), "{event:?}");
    }
}
