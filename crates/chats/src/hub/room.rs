//! The per-room actor.
//!
//! One task owns the member set of a room. Registrations, departures,
//! broadcasts and bus traffic all arrive as events on that task, so the
//! member set needs no lock. Broadcasts are handed to a separate publisher
//! task and reach members only when they come back from the bus.

use std::collections::HashMap;

use chrono::Utc;
use futures::stream::{BoxStream, StreamExt};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{ConnectionId, HubContext, Member};
use crate::pubsub::{topic_for, MessageBus};
use crate::types::{ChatError, ChatResult};

const COMMAND_BUFFER: usize = 256;
const PUBLISH_BUFFER: usize = 256;

enum HubCommand {
    Register {
        member: Member,
        ack: oneshot::Sender<()>,
    },
    Unregister(ConnectionId),
    Broadcast(String),
}

/// Cheap, cloneable address of a running hub.
#[derive(Debug, Clone)]
pub struct HubHandle {
    id: Uuid,
    room_id: i64,
    commands: mpsc::Sender<HubCommand>,
}

impl std::fmt::Debug for HubCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HubCommand::Register { member, .. } => write!(f, "Register({})", member.id),
            HubCommand::Unregister(id) => write!(f, "Unregister({id})"),
            HubCommand::Broadcast(_) => f.write_str("Broadcast"),
        }
    }
}

impl HubHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn room_id(&self) -> i64 {
        self.room_id
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    /// Resolves once the hub has added `member`. A hub that has stopped
    /// answers with [`ChatError::HubClosed`].
    pub async fn register(&self, member: Member) -> ChatResult<()> {
        let (ack, acked) = oneshot::channel();
        self.commands
            .send(HubCommand::Register { member, ack })
            .await
            .map_err(|_| ChatError::HubClosed(self.room_id))?;
        acked.await.map_err(|_| ChatError::HubClosed(self.room_id))
    }

    pub async fn unregister(&self, connection: ConnectionId) {
        if self
            .commands
            .send(HubCommand::Unregister(connection))
            .await
            .is_err()
        {
            debug!(room_id = self.room_id, %connection, "hub already stopped");
        }
    }

    pub async fn broadcast(&self, payload: String) -> ChatResult<()> {
        self.commands
            .send(HubCommand::Broadcast(payload))
            .await
            .map_err(|_| ChatError::HubClosed(self.room_id))
    }
}

struct Hub {
    id: Uuid,
    room_id: i64,
    context: HubContext,
    members: HashMap<ConnectionId, Member>,
    publish: mpsc::Sender<String>,
}

/// Subscribe to the room topic and start the hub and its publisher.
pub(crate) async fn spawn_hub(
    room_id: i64,
    context: HubContext,
    shutdown: watch::Receiver<bool>,
) -> ChatResult<(HubHandle, JoinHandle<()>)> {
    let topic = topic_for(&context.config.topic_prefix, room_id);
    let inbound = context.bus.subscribe(&topic).await?;

    let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
    let (publish_tx, publish_rx) = mpsc::channel(PUBLISH_BUFFER);
    tokio::spawn(run_publisher(context.bus.clone(), topic, publish_rx));

    let id = Uuid::new_v4();
    let hub = Hub {
        id,
        room_id,
        context,
        members: HashMap::new(),
        publish: publish_tx,
    };
    let task = tokio::spawn(hub.run(commands_rx, inbound, shutdown));

    Ok((
        HubHandle {
            id,
            room_id,
            commands: commands_tx,
        },
        task,
    ))
}

/// Publishes in arrival order. A failed publish loses that message.
async fn run_publisher(
    bus: std::sync::Arc<dyn MessageBus>,
    topic: String,
    mut queue: mpsc::Receiver<String>,
) {
    while let Some(payload) = queue.recv().await {
        if let Err(error) = bus.publish(&topic, &payload).await {
            error!(%topic, %error, "failed to publish message, it will not be delivered");
        }
    }
}

impl Hub {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<HubCommand>,
        mut inbound: BoxStream<'static, String>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(room_id = self.room_id, hub_id = %self.id, "hub started");

        let idle_timeout = self.context.config.hub_idle_timeout();
        let idle = sleep(idle_timeout.unwrap_or_default());
        tokio::pin!(idle);
        let mut was_empty = true;

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                payload = inbound.next() => match payload {
                    Some(payload) => self.deliver(&payload),
                    None => {
                        error!(room_id = self.room_id, "bus subscription closed, stopping hub");
                        break;
                    }
                },
                _ = shutdown.changed() => {
                    debug!(room_id = self.room_id, "shutdown requested");
                    break;
                }
                () = &mut idle, if idle_timeout.is_some() && self.members.is_empty() => {
                    info!(room_id = self.room_id, "hub idle, stopping");
                    break;
                }
            }

            let empty = self.members.is_empty();
            if empty && !was_empty {
                if let Some(idle_timeout) = idle_timeout {
                    idle.as_mut().reset(Instant::now() + idle_timeout);
                }
            }
            was_empty = empty;
        }

        // Dropping the senders closes every outbound queue.
        let departed = self.members.len();
        self.members.clear();
        info!(room_id = self.room_id, hub_id = %self.id, departed, "hub stopped");
    }

    fn handle(&mut self, command: HubCommand) {
        match command {
            HubCommand::Register { member, ack } => {
                debug!(room_id = self.room_id, connection = %member.id, user_id = member.profile.user_id, "member joined");
                self.replay_history(member.outbound.downgrade());
                self.members.insert(member.id, member);
                let _ = ack.send(());
            }
            HubCommand::Unregister(connection) => {
                if self.members.remove(&connection).is_some() {
                    debug!(room_id = self.room_id, %connection, "member left");
                }
            }
            HubCommand::Broadcast(payload) => match self.publish.try_send(payload) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(room_id = self.room_id, "bus is behind, dropping message");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    error!(room_id = self.room_id, "publisher stopped, dropping message");
                }
            },
        }
    }

    /// Best-effort fan-out. A member whose queue is full or closed is
    /// disconnected.
    fn deliver(&mut self, payload: &str) {
        let mut disconnected = Vec::new();
        for (id, member) in &self.members {
            match member.outbound.try_send(payload.to_string()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(room_id = self.room_id, connection = %id, "outbound queue full, disconnecting");
                    disconnected.push(*id);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => disconnected.push(*id),
            }
        }
        for id in disconnected {
            self.members.remove(&id);
        }
    }

    /// Runs off the hub task so a slow store or identity lookup never
    /// stalls the room. Holds only a weak sender so leaving the room still
    /// closes the queue.
    fn replay_history(&self, outbound: mpsc::WeakSender<String>) {
        let context = self.context.clone();
        let room_id = self.room_id;

        tokio::spawn(async move {
            let replay = async {
                let batch = context
                    .messages
                    .history(room_id, context.users.as_ref(), Utc::now())
                    .await;
                let count = batch.chats.len();
                let frame = serde_json::to_string(&batch)?;
                let closed = || anyhow::anyhow!("connection closed before history arrived");
                let outbound = outbound.upgrade().ok_or_else(closed)?;
                outbound.send(frame).await.map_err(|_| closed())?;
                anyhow::Ok(count)
            };

            match timeout(context.config.history_timeout(), replay).await {
                Ok(Ok(count)) => debug!(room_id, count, "history replayed"),
                Ok(Err(error)) => warn!(room_id, error = %error, "history replay failed"),
                Err(_) => warn!(room_id, "history replay timed out"),
            }
        });
    }
}
