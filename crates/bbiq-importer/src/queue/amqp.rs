//! AMQP 0-9-1 backend built on `lapin`.
//!
//! Queues are plain work queues on the default exchange. Publisher confirms
//! are enabled on every channel so `publish` reports whether the broker took
//! the message.

use super::broker::{BrokerChannel, BrokerConnector, Delivery, QueueInfo, Subscription};
use crate::error::{QueueError, Result};
use async_trait::async_trait;
use futures::StreamExt;
use lapin::{
    options::{
        BasicAckOptions, BasicCancelOptions, BasicConsumeOptions, BasicPublishOptions,
        BasicQosOptions, ConfirmSelectOptions, QueueDeclareOptions, QueuePurgeOptions,
    },
    types::FieldTable,
    BasicProperties, Channel, Connection, ConnectionProperties, Consumer,
};
use tracing::debug;
use uuid::Uuid;

/// AMQP delivery mode for messages that survive a broker restart
const DELIVERY_MODE_PERSISTENT: u8 = 2;
const DELIVERY_MODE_TRANSIENT: u8 = 1;

const REPLY_SUCCESS: u16 = 200;

#[derive(Debug, Clone, Copy, Default)]
pub struct AmqpConnector;

#[async_trait]
impl BrokerConnector for AmqpConnector {
    type Channel = AmqpChannel;

    async fn connect(&self, url: &str) -> Result<AmqpChannel> {
        let connection = Connection::connect(url, ConnectionProperties::default())
            .await
            .map_err(|e| QueueError::connection(url, e))?;

        let channel = connection
            .create_channel()
            .await
            .map_err(|e| QueueError::Channel(e.to_string()))?;

        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(|e| QueueError::Channel(e.to_string()))?;

        debug!(url, channel_id = channel.id(), "Opened AMQP channel");
        Ok(AmqpChannel {
            connection,
            channel,
        })
    }
}

pub struct AmqpChannel {
    connection: Connection,
    channel: Channel,
}

#[async_trait]
impl BrokerChannel for AmqpChannel {
    type Subscription = AmqpSubscription;

    async fn set_prefetch(&self, limit: u16) -> Result<()> {
        self.channel
            .basic_qos(limit, BasicQosOptions::default())
            .await
            .map_err(|e| QueueError::Channel(e.to_string()))
    }

    async fn declare_queue(&self, name: &str, durable: bool) -> Result<QueueInfo> {
        let queue = self
            .channel
            .queue_declare(
                name,
                QueueDeclareOptions {
                    durable,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| QueueError::declare(name, e))?;

        Ok(QueueInfo {
            name: queue.name().as_str().to_string(),
            message_count: queue.message_count(),
            consumer_count: queue.consumer_count(),
        })
    }

    async fn publish(&self, queue: &str, payload: &[u8], persistent: bool) -> Result<bool> {
        let delivery_mode = if persistent {
            DELIVERY_MODE_PERSISTENT
        } else {
            DELIVERY_MODE_TRANSIENT
        };

        let confirmation = self
            .channel
            .basic_publish(
                "",
                queue,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default()
                    .with_delivery_mode(delivery_mode)
                    .with_content_type("application/json".into()),
            )
            .await
            .map_err(|e| QueueError::publish(queue, e))?
            .await
            .map_err(|e| QueueError::publish(queue, e))?;

        Ok(!confirmation.is_nack())
    }

    async fn subscribe(&self, queue: &str) -> Result<AmqpSubscription> {
        let tag = format!("bbiq-{}", Uuid::new_v4());
        let consumer = self
            .channel
            .basic_consume(
                queue,
                &tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| QueueError::consume(queue, e))?;

        Ok(AmqpSubscription {
            queue: queue.to_string(),
            tag,
            channel: self.channel.clone(),
            consumer,
        })
    }

    async fn purge(&self, queue: &str) -> Result<u32> {
        self.channel
            .queue_purge(queue, QueuePurgeOptions::default())
            .await
            .map_err(|e| QueueError::consume(queue, e))
    }

    async fn close(&self) -> Result<()> {
        self.channel
            .close(REPLY_SUCCESS, "OK")
            .await
            .map_err(|e| QueueError::Close(e.to_string()))?;
        self.connection
            .close(REPLY_SUCCESS, "OK")
            .await
            .map_err(|e| QueueError::Close(e.to_string()))
    }
}

pub struct AmqpSubscription {
    queue: String,
    tag: String,
    channel: Channel,
    consumer: Consumer,
}

#[async_trait]
impl Subscription for AmqpSubscription {
    type Delivery = AmqpDelivery;

    async fn next_delivery(&mut self) -> Option<Result<AmqpDelivery>> {
        let next = self.consumer.next().await?;
        Some(
            next.map(|delivery| AmqpDelivery { delivery })
                .map_err(|e| QueueError::consume(self.queue.as_str(), e)),
        )
    }

    async fn cancel(&mut self) -> Result<()> {
        self.channel
            .basic_cancel(&self.tag, BasicCancelOptions::default())
            .await
            .map_err(|e| QueueError::consume(self.queue.as_str(), e))
    }
}

pub struct AmqpDelivery {
    delivery: lapin::message::Delivery,
}

#[async_trait]
impl Delivery for AmqpDelivery {
    fn payload(&self) -> &[u8] {
        &self.delivery.data
    }

    async fn ack(&self) -> Result<()> {
        self.delivery
            .acker
            .ack(BasicAckOptions::default())
            .await
            .map_err(|e| QueueError::Ack(e.to_string()))
    }
}
