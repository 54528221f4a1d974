//! # Roomcast Chats Crate
//!
//! Real-time room fan-out and chat history.
//!
//! ## Architecture
//!
//! - **Hub**: one actor task per room owning the set of local connections
//! - **Room Manager**: lazily creates hubs after asking the room directory
//! - **PubSub**: topic-per-room bus that every hub publishes to and listens on
//! - **Repositories**: the chat store contract over the durable chat log
//! - **Services**: message normalisation/persistence and the room directory client
//!
//! Every broadcast goes out over the bus and reaches local connections only
//! when it comes back, so local and remote peers see the same order for a
//! given hub.

pub mod entities;
pub mod hub;
pub mod pubsub;
pub mod repositories;
pub mod services;
pub mod test_support;
pub mod types;

pub use entities::{ChatPayload, HistoryBatch};
pub use hub::{ConnectionId, HubContext, HubHandle, Member, RoomManager};
pub use pubsub::{topic_for, MemoryBus, MessageBus, RedisBus};
pub use repositories::ChatStore;
pub use services::{day_window, HttpRoomDirectory, MessageService, RoomDirectory};
pub use types::{BusError, BusResult, ChatError, ChatResult};
