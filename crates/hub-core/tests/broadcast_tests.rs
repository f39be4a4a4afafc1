// crates/hub-core/tests/broadcast_tests.rs
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use hub_core::memory::{self, MemoryPeer};
use hub_core::participant::CLOSE_TIMEOUT;
use hub_core::{
    broadcast, BroadcastReport, ConnectionHandle, Frame, FrameSink, FrameStream, ParticipantId,
    SessionRegistry, TransportError,
};

const WAIT: Duration = Duration::from_millis(500);

async fn registry_with(n: usize) -> (SessionRegistry, Vec<MemoryPeer>) {
    let registry = SessionRegistry::new(16);
    let mut peers = Vec::with_capacity(n);
    for i in 0..n {
        let (handle, peer) = memory::pair();
        registry
            .admit(ParticipantId::new(format!("p{i}")), handle)
            .await
            .unwrap();
        peers.push(peer);
    }
    (registry, peers)
}

#[tokio::test]
async fn reaches_every_participant() {
    let (registry, mut peers) = registry_with(4).await;
    let frame = Frame::text(r#"{"hello":"world"}"#);

    let report = broadcast(&registry, &frame).await;
    assert_eq!(report, BroadcastReport { delivered: 4, failed: 0 });

    for peer in &mut peers {
        assert_eq!(peer.recv_timeout(WAIT).await, Some(frame.clone()));
    }
}

#[tokio::test]
async fn one_dead_recipient_is_reported_once_and_the_rest_still_receive() {
    let (registry, mut peers) = registry_with(5).await;

    // Kill p2's connection before broadcasting.
    drop(peers.remove(2));

    let frame = Frame::text("ping");
    let report = broadcast(&registry, &frame).await;

    // Each failed send is logged once and counted once in the report.
    assert_eq!(report, BroadcastReport { delivered: 4, failed: 1 });
    for peer in &mut peers {
        assert_eq!(peer.recv_timeout(WAIT).await, Some(frame.clone()));
    }

    // The failure belongs to p2: it is the only one that cannot be reached.
    for participant in registry.snapshot().await {
        let reachable = participant.send(Frame::text("again")).await.is_ok();
        assert_eq!(reachable, participant.id().as_str() != "p2", "{}", participant.id());
    }

    // Broadcast never removes anyone; that is the session loop's job.
    assert_eq!(registry.len().await, 5);
}

#[tokio::test]
async fn participant_removed_after_snapshot_fails_safely() {
    let (registry, _peers) = registry_with(2).await;
    let snapshot = registry.snapshot().await;

    let victim = snapshot[0].id().clone();
    registry.remove(&victim).await;

    let mut failed = 0;
    for participant in &snapshot {
        if participant.send(Frame::text("late")).await.is_err() {
            failed += 1;
        }
    }
    assert_eq!(failed, 1);
}

#[tokio::test]
async fn binary_frames_are_forwarded_unchanged() {
    let (registry, mut peers) = registry_with(2).await;
    let frame = Frame::Binary(Bytes::from_static(&[0, 159, 146, 150]));

    broadcast(&registry, &frame).await;

    for peer in &mut peers {
        assert_eq!(peer.recv_timeout(WAIT).await, Some(frame.clone()));
    }
}

#[tokio::test]
async fn empty_registry_is_a_no_op() {
    let registry = SessionRegistry::new(4);
    let report = broadcast(&registry, &Frame::text("anyone?")).await;
    assert_eq!(report, BroadcastReport::default());
}

/// A peer that never reads: sends and close handshakes never complete.
struct StalledSink;

#[async_trait]
impl FrameSink for StalledSink {
    async fn send(&mut self, _frame: Frame) -> Result<(), TransportError> {
        std::future::pending().await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        std::future::pending().await
    }
}

struct SilentStream;

#[async_trait]
impl FrameStream for SilentStream {
    async fn recv(&mut self) -> Option<Result<Frame, TransportError>> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn removing_a_stalled_recipient_unblocks_the_broadcaster() {
    let registry = Arc::new(SessionRegistry::new(4));

    let (handle, mut healthy) = memory::pair();
    registry.admit(ParticipantId::from("healthy"), handle).await.unwrap();

    let stalled_id = ParticipantId::from("stalled");
    let stalled = registry
        .admit(stalled_id.clone(), ConnectionHandle::new(StalledSink, SilentStream))
        .await
        .unwrap();

    let frame = Frame::text("hello");
    let task = tokio::spawn({
        let registry = registry.clone();
        let frame = frame.clone();
        async move { broadcast(&registry, &frame).await }
    });

    // Let the broadcast get stuck on the stalled sink.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!task.is_finished());

    let removed = tokio::time::timeout(CLOSE_TIMEOUT * 3, registry.remove(&stalled_id))
        .await
        .expect("remove must not wait on a stalled send");
    assert!(removed);
    assert!(stalled.is_closed());

    let report = tokio::time::timeout(WAIT, task)
        .await
        .expect("broadcast must finish once the stalled recipient is removed")
        .unwrap();
    assert_eq!(report, BroadcastReport { delivered: 1, failed: 1 });
    assert_eq!(healthy.recv_timeout(WAIT).await, Some(frame));

    let err = stalled.send(Frame::text("late")).await.unwrap_err();
    assert_eq!(err, TransportError::Closed);
}
