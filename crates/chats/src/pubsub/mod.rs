//! Topic-per-room publish/subscribe bridge between processes.

pub mod memory_bus;
pub mod redis_bus;

pub use memory_bus::MemoryBus;
pub use redis_bus::RedisBus;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::types::BusResult;

/// Messages published to a topic reach every live subscription of that
/// topic, in publish order per publisher.
#[async_trait]
pub trait MessageBus: Send + Sync {
    async fn publish(&self, topic: &str, payload: &str) -> BusResult<()>;

    /// The subscription is active once this returns. Dropping the stream
    /// unsubscribes.
    async fn subscribe(&self, topic: &str) -> BusResult<BoxStream<'static, String>>;
}

/// Bus topic carrying the traffic of `room_id`.
pub fn topic_for(prefix: &str, room_id: i64) -> String {
    format!("{prefix}{room_id}")
}
