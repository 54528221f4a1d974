//! In-memory bus for single-node deployments and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::{broadcast, Mutex};
use tracing::warn;

use super::MessageBus;
use crate::types::BusResult;

pub struct MemoryBus {
    topics: Mutex<HashMap<String, broadcast::Sender<String>>>,
    buffer_size: usize,
}

impl MemoryBus {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
            buffer_size,
        }
    }

    #[cfg(test)]
    async fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .lock()
            .await
            .get(topic)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl MessageBus for MemoryBus {
    async fn publish(&self, topic: &str, payload: &str) -> BusResult<()> {
        let mut topics = self.topics.lock().await;
        let abandoned = topics
            .get(topic)
            .is_some_and(|tx| tx.send(payload.to_string()).is_err());
        if abandoned {
            topics.remove(topic);
        }
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> BusResult<BoxStream<'static, String>> {
        let mut topics = self.topics.lock().await;
        topics.retain(|_, tx| tx.receiver_count() > 0);
        let rx = topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.buffer_size).0)
            .subscribe();

        let topic = topic.to_string();
        Ok(stream::unfold(rx, move |mut rx| {
            let topic = topic.clone();
            async move {
                loop {
                    match rx.recv().await {
                        Ok(payload) => return Some((payload, rx)),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(%topic, skipped, "subscriber lagged behind, messages dropped");
                        }
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }
            }
        })
        .boxed())
    }
}
