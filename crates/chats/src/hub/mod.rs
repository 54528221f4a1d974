//! Per-room hubs and the registry that owns them.

mod room;
mod room_manager;

pub use room::HubHandle;
pub use room_manager::RoomManager;

use std::sync::Arc;

use roomcast_config::ChatConfig;
use roomcast_users::{UserLookup, UserProfile};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::pubsub::MessageBus;
use crate::services::MessageService;

pub type ConnectionId = Uuid;

/// A connection as seen by its hub: who it is and where to push frames.
#[derive(Debug, Clone)]
pub struct Member {
    pub id: ConnectionId,
    pub profile: UserProfile,
    pub outbound: mpsc::Sender<String>,
}

impl Member {
    pub fn new(profile: UserProfile, outbound: mpsc::Sender<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            profile,
            outbound,
        }
    }
}

/// Collaborators shared by every hub of a process.
#[derive(Clone)]
pub struct HubContext {
    pub bus: Arc<dyn MessageBus>,
    pub messages: Arc<MessageService>,
    pub users: Arc<dyn UserLookup>,
    pub config: ChatConfig,
}
