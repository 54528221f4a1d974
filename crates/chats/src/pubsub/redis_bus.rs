//! Redis pub/sub bus shared by every process of a deployment.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use redis::aio::{ConnectionManager, PubSub};
use redis::AsyncCommands;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::MessageBus;
use crate::types::BusResult;

const SUBSCRIPTION_BUFFER: usize = 1024;
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Publishes over a shared multiplexed connection; each subscription gets
/// its own pub/sub connection.
#[derive(Clone)]
pub struct RedisBus {
    client: redis::Client,
    publisher: ConnectionManager,
}

impl RedisBus {
    pub fn new(client: redis::Client, publisher: ConnectionManager) -> Self {
        Self { client, publisher }
    }

    async fn open_subscription(client: &redis::Client, topic: &str) -> BusResult<PubSub> {
        let mut pubsub = client.get_async_pubsub().await?;
        pubsub.subscribe(topic).await?;
        Ok(pubsub)
    }
}

#[async_trait]
impl MessageBus for RedisBus {
    async fn publish(&self, topic: &str, payload: &str) -> BusResult<()> {
        let mut conn = self.publisher.clone();
        let receivers: i64 = conn.publish(topic, payload).await?;
        debug!(%topic, receivers, "published to bus");
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> BusResult<BoxStream<'static, String>> {
        let pubsub = Self::open_subscription(&self.client, topic).await?;
        info!(%topic, "subscribed to bus topic");

        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        tokio::spawn(forward_messages(
            self.client.clone(),
            topic.to_string(),
            pubsub,
            tx,
        ));

        Ok(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|payload| (payload, rx))
        })
        .boxed())
    }
}

/// Pumps one topic into `tx` until the receiving side goes away,
/// reconnecting whenever the pub/sub connection drops.
async fn forward_messages(
    client: redis::Client,
    topic: String,
    first: PubSub,
    tx: mpsc::Sender<String>,
) {
    let mut pubsub = Some(first);

    loop {
        let connection = match pubsub.take() {
            Some(connection) => connection,
            None => {
                tokio::select! {
                    _ = tx.closed() => return,
                    _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                }
                match RedisBus::open_subscription(&client, &topic).await {
                    Ok(connection) => {
                        info!(%topic, "re-subscribed to bus topic");
                        connection
                    }
                    Err(error) => {
                        error!(%topic, %error, "failed to re-subscribe, retrying");
                        continue;
                    }
                }
            }
        };

        let mut messages = Box::pin(connection.into_on_message());
        loop {
            tokio::select! {
                _ = tx.closed() => {
                    debug!(%topic, "subscription dropped");
                    return;
                }
                message = messages.next() => {
                    let Some(message) = message else { break };
                    let payload: String = match message.get_payload() {
                        Ok(payload) => payload,
                        Err(error) => {
                            warn!(%topic, %error, "undecodable bus payload");
                            continue;
                        }
                    };
                    if tx.send(payload).await.is_err() {
                        return;
                    }
                }
            }
        }

        warn!(%topic, "bus subscription ended, reconnecting");
    }
}
