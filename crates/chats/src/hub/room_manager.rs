//! Registry mapping room ids to running hubs.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{watch, Mutex, OnceCell};
use tracing::{debug, error, info};
use uuid::Uuid;

use super::room::{spawn_hub, HubHandle};
use super::{HubContext, Member};
use crate::services::RoomDirectory;
use crate::types::{ChatError, ChatResult};

const JOIN_ATTEMPTS: usize = 3;

type HubSlot = Arc<OnceCell<HubHandle>>;
type HubMap = Arc<Mutex<HashMap<i64, HubSlot>>>;

/// Creates hubs on first use, at most one per room. The registry lock is
/// only held to find a room's slot; creation itself is serialised per room
/// by the slot.
pub struct RoomManager {
    hubs: HubMap,
    directory: Arc<dyn RoomDirectory>,
    context: HubContext,
    shutdown: watch::Sender<bool>,
}

impl RoomManager {
    pub fn new(context: HubContext, directory: Arc<dyn RoomDirectory>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            hubs: Arc::new(Mutex::new(HashMap::new())),
            directory,
            context,
            shutdown,
        }
    }

    pub fn context(&self) -> &HubContext {
        &self.context
    }

    /// The running hub for `room_id`, creating it when the room directory
    /// confirms the room exists.
    pub async fn join_room(&self, room_id: i64) -> ChatResult<HubHandle> {
        if *self.shutdown.borrow() {
            return Err(ChatError::ShuttingDown);
        }

        let slot = {
            let mut hubs = self.hubs.lock().await;
            Arc::clone(hubs.entry(room_id).or_default())
        };

        let result = slot
            .get_or_try_init(|| self.create_hub(room_id))
            .await
            .cloned();

        if result.is_err() {
            let mut hubs = self.hubs.lock().await;
            let abandoned = hubs
                .get(&room_id)
                .is_some_and(|current| Arc::ptr_eq(current, &slot) && !current.initialized());
            if abandoned {
                hubs.remove(&room_id);
            }
        }

        result
    }

    /// Register `member` with the room's hub. A hub that stopped between
    /// lookup and registration is replaced transparently.
    pub async fn join(&self, room_id: i64, member: Member) -> ChatResult<HubHandle> {
        for attempt in 1..=JOIN_ATTEMPTS {
            let hub = self.join_room(room_id).await?;
            match hub.register(member.clone()).await {
                Ok(()) => return Ok(hub),
                Err(ChatError::HubClosed(_)) => {
                    debug!(room_id, attempt, "hub stopped during join, retrying");
                    forget_hub(&self.hubs, room_id, hub.id()).await;
                }
                Err(error) => return Err(error),
            }
        }
        Err(ChatError::HubClosed(room_id))
    }

    pub async fn hub(&self, room_id: i64) -> Option<HubHandle> {
        let hubs = self.hubs.lock().await;
        hubs.get(&room_id).and_then(|slot| slot.get().cloned())
    }

    pub async fn hub_count(&self) -> usize {
        let hubs = self.hubs.lock().await;
        hubs.values().filter(|slot| slot.initialized()).count()
    }

    /// Stop every hub and refuse further joins.
    pub async fn shutdown(&self) {
        self.shutdown.send_replace(true);
        let stopped = {
            let mut hubs = self.hubs.lock().await;
            let count = hubs.len();
            hubs.clear();
            count
        };
        info!(hubs = stopped, "room manager shut down");
    }

    async fn create_hub(&self, room_id: i64) -> ChatResult<HubHandle> {
        if !self.directory.room_exists(room_id).await {
            info!(room_id, "room directory does not know this room");
            return Err(ChatError::RoomNotFound(room_id));
        }

        let (handle, task) =
            spawn_hub(room_id, self.context.clone(), self.shutdown.subscribe()).await?;

        let hubs = Arc::clone(&self.hubs);
        let hub_id = handle.id();
        tokio::spawn(async move {
            if let Err(error) = task.await {
                error!(room_id, %error, "hub task failed");
            }
            forget_hub(&hubs, room_id, hub_id).await;
        });

        info!(room_id, %hub_id, "hub created");
        Ok(handle)
    }
}

/// Drop the registry entry for `room_id` if it still points at `hub_id`.
async fn forget_hub(hubs: &Mutex<HashMap<i64, HubSlot>>, room_id: i64, hub_id: Uuid) {
    let mut hubs = hubs.lock().await;
    let current = hubs
        .get(&room_id)
        .and_then(|slot| slot.get())
        .is_some_and(|hub| hub.id() == hub_id);
    if current {
        hubs.remove(&room_id);
        debug!(room_id, %hub_id, "hub removed from registry");
    }
}
