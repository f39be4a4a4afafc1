// crates/hub-core/tests/session_tests.rs
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hub_core::memory::{self, MemoryPeer};
use hub_core::{
    ConnectionHandle, Dispatcher, Frame, FrameSink, FrameStream, HandlerContext, Hub, HubConfig,
    HubError, MessageHandler, ParticipantId, SessionEnd, TransportError,
};
use hub_protocol::{ChatPayload, Envelope, MessageType, PresencePayload};
use serde_json::json;
use tokio::task::JoinHandle;

const WAIT: Duration = Duration::from_millis(500);
const QUIET: Duration = Duration::from_millis(100);

const CHAT: &str =
    r#"{"type":"CHAT_MESSAGE","player_id":"a","payload":{"text":"hi"},"timestamp":1718000000000}"#;

async fn join(hub: &Arc<Hub>) -> (ParticipantId, JoinHandle<SessionEnd>, MemoryPeer) {
    let (handle, peer) = memory::pair();
    let (id, task) = hub.connect(handle).await.expect("admitted");
    (id, task, peer)
}

fn text(frame: Option<Frame>) -> String {
    match frame {
        Some(Frame::Text(text)) => text,
        other => panic!("expected a text frame, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_message_does_not_end_the_session() {
    let hub = Arc::new(Hub::new(HubConfig::new(8)));
    let (_a, _ta, a) = join(&hub).await;
    let (_b, _tb, mut b) = join(&hub).await;

    a.send_text("{not json").unwrap();
    a.send_text(CHAT).unwrap();

    assert_eq!(text(b.recv_timeout(WAIT).await), CHAT);
    assert_eq!(hub.registry().len().await, 2);
}

#[tokio::test]
async fn chat_is_delivered_byte_identical_to_everyone() {
    let hub = Arc::new(Hub::new(HubConfig::new(8)));
    let (_a, _ta, mut a) = join(&hub).await;
    let (_b, _tb, mut b) = join(&hub).await;

    // Odd spacing and key order must survive untouched.
    let original = "{ \"timestamp\": 7,\n  \"payload\": {\"text\" : \"gg\"}, \"player_id\":\"a\", \"type\":\"CHAT_MESSAGE\" }";
    a.send_text(original).unwrap();

    assert_eq!(text(b.recv_timeout(WAIT).await), original);
    assert_eq!(text(a.recv_timeout(WAIT).await), original);
}

#[tokio::test]
async fn non_chat_types_are_not_broadcast() {
    let hub = Arc::new(Hub::new(HubConfig::new(8)));
    let (a_id, _ta, a) = join(&hub).await;
    let (_b, _tb, mut b) = join(&hub).await;

    for kind in ["PLAYER_MOVE", "GAME_STATE_SYNC", "SPAWN_ITEM"] {
        let env = json!({"type": kind, "player_id": "a", "payload": {}, "timestamp": 1});
        a.send_text(env.to_string()).unwrap();
    }

    assert_eq!(b.recv_timeout(QUIET).await, None);
    assert!(hub.registry().contains(&a_id).await);
}

#[tokio::test]
async fn idle_participant_is_removed_after_timeout() {
    let config = HubConfig::new(4).with_idle_timeout(Duration::from_millis(100));
    let hub = Arc::new(Hub::new(config));
    let (id, task, mut peer) = join(&hub).await;

    assert!(hub.registry().contains(&id).await);

    let end = tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("session should time out")
        .unwrap();

    assert_eq!(end, SessionEnd::IdleTimeout);
    assert!(!hub.registry().contains(&id).await);
    assert_eq!(peer.recv_timeout(WAIT).await, None);
}

#[tokio::test]
async fn activity_keeps_the_session_alive() {
    let config = HubConfig::new(4).with_idle_timeout(Duration::from_millis(200));
    let hub = Arc::new(Hub::new(config));
    let (id, _task, peer) = join(&hub).await;

    let participant = hub.registry().lookup(&id).await.unwrap();
    let admitted_at = participant.last_activity();

    let ping = json!({
        "type": "PLAYER_MOVE",
        "player_id": id.as_str(),
        "payload": {"x": 1},
        "timestamp": 0
    });
    for _ in 0..8 {
        tokio::time::sleep(Duration::from_millis(60)).await;
        peer.send_text(ping.to_string()).unwrap();
    }
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(hub.registry().contains(&id).await);
    assert!(participant.last_activity() > admitted_at);
}

#[tokio::test]
async fn peer_close_removes_the_participant() {
    let hub = Arc::new(Hub::new(HubConfig::new(4)));
    let (id, task, mut peer) = join(&hub).await;

    peer.close();

    assert_eq!(task.await.unwrap(), SessionEnd::PeerClosed);
    assert!(!hub.registry().contains(&id).await);
}

#[tokio::test]
async fn removal_from_elsewhere_stops_the_session() {
    let hub = Arc::new(Hub::new(HubConfig::new(4)));
    let (id, task, _peer) = join(&hub).await;

    assert!(hub.registry().remove(&id).await);

    let end = tokio::time::timeout(WAIT, task).await.unwrap().unwrap();
    assert_eq!(end, SessionEnd::Removed);
}

#[tokio::test]
async fn connect_beyond_capacity_fails() {
    let hub = Arc::new(Hub::new(HubConfig::new(2)));
    let (_a, _ta, _pa) = join(&hub).await;
    let (_b, _tb, _pb) = join(&hub).await;

    let (handle, mut peer) = memory::pair();
    let err = hub.connect(handle).await.unwrap_err();

    assert!(matches!(err, HubError::Capacity { max: 2 }));
    assert_eq!(hub.registry().len().await, 2);
    assert_eq!(peer.recv_timeout(WAIT).await, None);
}

#[tokio::test]
async fn send_to_addresses_a_single_participant() {
    let hub = Arc::new(Hub::new(HubConfig::new(4)));
    let (a_id, _ta, mut a) = join(&hub).await;
    let (_b, _tb, mut b) = join(&hub).await;

    hub.send_to(&a_id, MessageType::GameStateSync, &json!({"tick": 42}))
        .await
        .unwrap();

    let env = Envelope::decode(text(a.recv_timeout(WAIT).await).as_bytes()).unwrap();
    assert_eq!(env.kind(), &MessageType::GameStateSync);
    assert_eq!(env.player_id(), a_id.as_str());
    assert_eq!(env.raw_payload(), r#"{"tick":42}"#);
    assert_eq!(b.recv_timeout(QUIET).await, None);

    let err = hub
        .send_to(&ParticipantId::from("ghost"), MessageType::ChatMessage, &json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, HubError::NotFound(_)));
}

#[tokio::test]
async fn presence_is_announced_when_enabled() {
    let hub = Arc::new(Hub::new(HubConfig::new(4).with_presence(true)));
    let (a_id, _ta, mut a) = join(&hub).await;

    let own_join = Envelope::decode(text(a.recv_timeout(WAIT).await).as_bytes()).unwrap();
    assert_eq!(own_join.kind(), &MessageType::PlayerJoin);
    assert_eq!(own_join.player_id(), a_id.as_str());

    let (b_id, tb, mut b) = join(&hub).await;
    let b_join = Envelope::decode(text(a.recv_timeout(WAIT).await).as_bytes()).unwrap();
    assert_eq!(b_join.player_id(), b_id.as_str());
    assert_eq!(
        b_join.decode_payload::<PresencePayload>().unwrap(),
        PresencePayload { participants: 2 }
    );

    b.close();
    tb.await.unwrap();

    let b_leave = Envelope::decode(text(a.recv_timeout(WAIT).await).as_bytes()).unwrap();
    assert_eq!(b_leave.kind(), &MessageType::PlayerLeave);
    assert_eq!(b_leave.player_id(), b_id.as_str());
    assert_eq!(
        b_leave.decode_payload::<PresencePayload>().unwrap(),
        PresencePayload { participants: 1 }
    );
}

/// Replies to the sender only, echoing the chat text back.
struct EchoHandler;

#[async_trait]
impl MessageHandler for EchoHandler {
    async fn handle(&self, ctx: HandlerContext<'_>) -> Result<(), HubError> {
        let chat: ChatPayload = ctx.envelope.decode_payload()?;
        let reply = Envelope::new(
            MessageType::from("ECHO"),
            ctx.sender.id().as_str(),
            &chat,
        )?;
        ctx.sender.send(Frame::Text(reply.encode()?)).await?;
        Ok(())
    }
}

#[tokio::test]
async fn custom_handlers_extend_routing() {
    let mut dispatcher = Dispatcher::with_default_handlers();
    assert!(!dispatcher.handles(&MessageType::from("ECHO")));
    dispatcher.register(MessageType::from("ECHO"), EchoHandler);

    let hub = Arc::new(Hub::with_dispatcher(HubConfig::new(4), dispatcher));
    let (a_id, _ta, mut a) = join(&hub).await;

    // Wrong payload shape: the handler fails, the session survives.
    a.send_text(r#"{"type":"ECHO","player_id":"a","payload":42,"timestamp":0}"#)
        .unwrap();
    a.send_text(r#"{"type":"ECHO","player_id":"a","payload":{"text":"marco"},"timestamp":0}"#)
        .unwrap();

    let reply = Envelope::decode(text(a.recv_timeout(WAIT).await).as_bytes()).unwrap();
    assert_eq!(reply.kind(), &MessageType::Other("ECHO".into()));
    assert_eq!(
        reply.decode_payload::<ChatPayload>().unwrap(),
        ChatPayload { text: "marco".into() }
    );
    assert!(hub.registry().contains(&a_id).await);
}

/// Accepts nothing: every send hangs, and so does reading.
struct NeverReads;

#[async_trait]
impl FrameSink for NeverReads {
    async fn send(&mut self, _frame: Frame) -> Result<(), TransportError> {
        std::future::pending().await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

#[async_trait]
impl FrameStream for NeverReads {
    async fn recv(&mut self) -> Option<Result<Frame, TransportError>> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn stalled_reader_timing_out_frees_the_chat_sender() {
    let config = HubConfig::new(4).with_idle_timeout(Duration::from_millis(300));
    let hub = Arc::new(Hub::new(config));

    let (stalled_id, stalled_task) = hub
        .connect(ConnectionHandle::new(NeverReads, NeverReads))
        .await
        .unwrap();
    let (_a, _ta, mut a) = join(&hub).await;

    // Keep `a` active so only the stalled participant idles out.
    a.send_text(CHAT).unwrap();

    let end = tokio::time::timeout(Duration::from_secs(2), stalled_task)
        .await
        .expect("stalled participant should idle out")
        .unwrap();
    assert_eq!(end, SessionEnd::IdleTimeout);
    assert!(!hub.registry().contains(&stalled_id).await);

    // The chat broadcast that was stuck on the stalled sink completes, and
    // `a`'s session keeps serving new messages.
    assert_eq!(text(a.recv_timeout(WAIT).await), CHAT);
    a.send_text(CHAT).unwrap();
    assert_eq!(text(a.recv_timeout(WAIT).await), CHAT);
}
