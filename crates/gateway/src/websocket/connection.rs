//! Reader and writer pumps for one websocket.
//!
//! The reader owns every read and the writer owns every write, so the
//! socket never sees concurrent reads or concurrent writes. The writer
//! stops when its outbound queue closes, which happens when the hub lets go
//! of the connection.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use roomcast_chats::{ConnectionId, HubHandle, MessageService};
use roomcast_config::ChatConfig;
use roomcast_users::UserProfile;
use tokio::sync::mpsc;
use tokio::time::{interval_at, timeout, Instant};
use tracing::{debug, error};

#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub max_message_size: usize,
    pub write_wait: Duration,
    pub pong_wait: Duration,
    pub ping_period: Duration,
}

impl From<&ChatConfig> for ConnectionSettings {
    fn from(config: &ChatConfig) -> Self {
        Self {
            max_message_size: config.max_message_size,
            write_wait: config.write_wait(),
            pong_wait: config.pong_wait(),
            ping_period: config.ping_period(),
        }
    }
}

/// Everything the reader needs to turn frames into broadcasts.
pub struct Session {
    pub room_id: i64,
    pub member_id: ConnectionId,
    pub author: UserProfile,
    pub hub: HubHandle,
    pub messages: Arc<MessageService>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadEnd {
    Closed,
    IdleTimeout,
    TooLarge,
    ReadError,
    HubClosed,
}

/// Drive a registered connection until either side gives up, then leave
/// the room and give the writer a bounded chance to say goodbye.
pub async fn run_connection<S, R, E>(
    sink: S,
    mut stream: R,
    session: Session,
    outbound: mpsc::Receiver<String>,
    settings: ConnectionSettings,
) where
    S: Sink<Message> + Unpin + Send + 'static,
    S::Error: Display + Send,
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let mut writer = tokio::spawn(write_pump(sink, outbound, settings.clone()));

    let writer_done = tokio::select! {
        end = read_pump(&mut stream, &session, &settings) => {
            debug!(room_id = session.room_id, connection = %session.member_id, ?end, "reader finished");
            false
        }
        _ = &mut writer => {
            debug!(room_id = session.room_id, connection = %session.member_id, "writer finished first");
            true
        }
    };

    session.hub.unregister(session.member_id).await;

    if !writer_done && timeout(settings.write_wait, &mut writer).await.is_err() {
        debug!(connection = %session.member_id, "writer did not stop in time, aborting");
        writer.abort();
    }
}

/// Reads frames until close, error, idle timeout or an oversized message.
/// Every frame counts as liveness.
pub async fn read_pump<R, E>(
    stream: &mut R,
    session: &Session,
    settings: &ConnectionSettings,
) -> ReadEnd
where
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    loop {
        let frame = match timeout(settings.pong_wait, stream.next()).await {
            Err(_) => return ReadEnd::IdleTimeout,
            Ok(None) => return ReadEnd::Closed,
            Ok(Some(Err(error))) => {
                debug!(connection = %session.member_id, %error, "websocket read failed");
                return ReadEnd::ReadError;
            }
            Ok(Some(Ok(frame))) => frame,
        };

        let text = match frame {
            Message::Text(text) => text,
            Message::Close(_) => return ReadEnd::Closed,
            Message::Binary(_) => {
                debug!(connection = %session.member_id, "ignoring binary frame");
                continue;
            }
            Message::Ping(_) | Message::Pong(_) => continue,
        };

        if text.len() > settings.max_message_size {
            return ReadEnd::TooLarge;
        }

        match session
            .messages
            .post(session.room_id, &session.author, &text)
            .await
        {
            Ok(Some(payload)) => {
                if session.hub.broadcast(payload).await.is_err() {
                    return ReadEnd::HubClosed;
                }
            }
            Ok(None) => {}
            Err(error) => {
                error!(
                    room_id = session.room_id,
                    user_id = session.author.user_id,
                    %error,
                    "message not stored, dropping it"
                );
            }
        }
    }
}

/// Writes queued messages, joining whatever piled up into one newline
/// separated frame, and pings on a fixed period.
pub async fn write_pump<S>(mut sink: S, mut outbound: mpsc::Receiver<String>, settings: ConnectionSettings)
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    let mut ping = interval_at(Instant::now() + settings.ping_period, settings.ping_period);

    loop {
        let frame = tokio::select! {
            next = outbound.recv() => match next {
                Some(first) => Message::Text(coalesce(first, &mut outbound)),
                None => {
                    let _ = timeout(settings.write_wait, sink.send(Message::Close(None))).await;
                    return;
                }
            },
            _ = ping.tick() => Message::Ping(Vec::new()),
        };

        match timeout(settings.write_wait, sink.send(frame)).await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => {
                debug!(%error, "websocket write failed");
                return;
            }
            Err(_) => {
                debug!("websocket write timed out");
                return;
            }
        }
    }
}

fn coalesce(first: String, outbound: &mut mpsc::Receiver<String>) -> String {
    let mut frame = first;
    while let Ok(next) = outbound.try_recv() {
        frame.push('\n');
        frame.push_str(&next);
    }
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc as fmpsc;
    use roomcast_chats::test_support::{MemoryChatStore, StaticDirectory, StaticUsers};
    use roomcast_chats::{HubContext, Member, MemoryBus, RoomManager};

    type Inbound = fmpsc::UnboundedSender<Result<Message, &'static str>>;
    type Outbound = fmpsc::UnboundedReceiver<Message>;

    fn alice() -> UserProfile {
        UserProfile {
            user_id: 7,
            username: "alice".into(),
            profile_pic: String::new(),
            created_at: None,
        }
    }

    fn settings() -> ConnectionSettings {
        ConnectionSettings {
            max_message_size: 512,
            write_wait: Duration::from_secs(1),
            pong_wait: Duration::from_secs(60),
            ping_period: Duration::from_secs(54),
        }
    }

    struct Harness {
        manager: RoomManager,
        store: Arc<MemoryChatStore>,
    }

    impl Harness {
        fn new() -> Self {
            let store = Arc::new(MemoryChatStore::default());
            Self::with_store(store)
        }

        fn with_store(store: Arc<MemoryChatStore>) -> Self {
            let config = ChatConfig::default();
            let context = HubContext {
                bus: Arc::new(MemoryBus::default()),
                messages: Arc::new(MessageService::new(store.clone(), &config)),
                users: Arc::new(StaticUsers::new([alice()])),
                config,
            };
            Self {
                manager: RoomManager::new(context, Arc::new(StaticDirectory::new([42]))),
                store,
            }
        }

        /// Joins room 42 and runs the pumps over in-memory channels.
        async fn connect(
            &self,
            settings: ConnectionSettings,
        ) -> (Inbound, Outbound, tokio::task::JoinHandle<()>) {
            let (in_tx, in_rx) = fmpsc::unbounded();
            let (out_tx, out_rx) = fmpsc::unbounded();
            let (queue_tx, queue_rx) = mpsc::channel(16);
            let member = Member::new(alice(), queue_tx);
            let member_id = member.id;
            let hub = self.manager.join(42, member).await.unwrap();

            let session = Session {
                room_id: 42,
                member_id,
                author: alice(),
                hub,
                messages: self.manager.context().messages.clone(),
            };
            let task = tokio::spawn(run_connection(out_tx, in_rx, session, queue_rx, settings));
            (in_tx, out_rx, task)
        }
    }

    async fn next_text(out: &mut Outbound) -> String {
        loop {
            match timeout(Duration::from_secs(2), out.next()).await.unwrap() {
                Some(Message::Text(text)) => return text,
                Some(Message::Ping(_)) => continue,
                other => panic!("unexpected frame {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn text_frames_are_stored_and_echoed_through_the_room() {
        let harness = Harness::new();
        let (inbound, mut outbound, _task) = harness.connect(settings()).await;
        assert_eq!(next_text(&mut outbound).await, r#"{"chats":[]}"#);

        inbound
            .unbounded_send(Ok(Message::Text(" hello\nworld ".into())))
            .unwrap();

        let frame = next_text(&mut outbound).await;
        let payload: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(payload["msg"], "hello world");
        assert_eq!(payload["username"], "alice");
        assert_eq!(harness.store.all().await.len(), 1);
    }

    #[tokio::test]
    async fn oversized_frame_ends_the_connection() {
        let harness = Harness::new();
        let (inbound, mut outbound, task) = harness.connect(settings()).await;
        next_text(&mut outbound).await;

        inbound
            .unbounded_send(Ok(Message::Text("x".repeat(513))))
            .unwrap();

        timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
        assert!(harness.store.all().await.is_empty());
        assert!(matches!(outbound.next().await, Some(Message::Close(None)) | None));
    }

    #[tokio::test]
    async fn storage_failure_keeps_the_connection_open() {
        let harness = Harness::with_store(Arc::new(MemoryChatStore::failing()));
        let (inbound, mut outbound, task) = harness.connect(settings()).await;
        next_text(&mut outbound).await;

        inbound.unbounded_send(Ok(Message::Text("lost".into()))).unwrap();

        let nothing = timeout(Duration::from_millis(100), outbound.next()).await;
        assert!(nothing.is_err());
        assert!(!task.is_finished());
    }

    #[tokio::test]
    async fn client_close_unregisters_and_writer_sends_close() {
        let harness = Harness::new();
        let (inbound, mut outbound, task) = harness.connect(settings()).await;
        next_text(&mut outbound).await;

        inbound.unbounded_send(Ok(Message::Close(None))).unwrap();

        timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
        assert!(matches!(outbound.next().await, Some(Message::Close(None))));
    }

    #[tokio::test(start_paused = true)]
    async fn silent_peer_times_out() {
        let harness = Harness::new();
        let mut quick = settings();
        quick.pong_wait = Duration::from_secs(5);
        quick.ping_period = Duration::from_secs(4);
        let (_inbound, mut outbound, task) = harness.connect(quick).await;
        next_text(&mut outbound).await;

        tokio::time::sleep(Duration::from_secs(6)).await;

        timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
        let mut saw_ping = false;
        while let Some(frame) = outbound.next().await {
            if matches!(frame, Message::Ping(_)) {
                saw_ping = true;
            }
        }
        assert!(saw_ping);
    }

    #[tokio::test]
    async fn queued_messages_are_coalesced() {
        let (sink, mut frames) = fmpsc::unbounded();
        let (tx, rx) = mpsc::channel(8);
        tx.send("a".to_string()).await.unwrap();
        tx.send("b".to_string()).await.unwrap();
        tx.send("c".to_string()).await.unwrap();
        drop(tx);

        write_pump(sink, rx, settings()).await;

        assert_eq!(frames.next().await, Some(Message::Text("a\nb\nc".into())));
        assert_eq!(frames.next().await, Some(Message::Close(None)));
    }
}
