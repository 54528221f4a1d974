//! Shared application state for the gateway

use std::sync::Arc;

use roomcast_chats::{MessageService, RoomManager};
use roomcast_config::ChatConfig;
use roomcast_users::{CachedAccountStore, IdentityService};

/// Services shared by every handler.
#[derive(Clone)]
pub struct GatewayState {
    pub rooms: Arc<RoomManager>,
    pub identity: Arc<dyn IdentityService>,
    pub messages: Arc<MessageService>,
    pub accounts: Arc<CachedAccountStore>,
    pub chat: ChatConfig,
}

impl GatewayState {
    pub fn new(
        rooms: Arc<RoomManager>,
        identity: Arc<dyn IdentityService>,
        accounts: Arc<CachedAccountStore>,
    ) -> Self {
        let context = rooms.context();
        Self {
            messages: context.messages.clone(),
            chat: context.config.clone(),
            rooms,
            identity,
            accounts,
        }
    }
}
