//! Minimal broker seam used by the import queue.
//!
//! Only the operations the queue needs are modelled: connecting, declaring a
//! point-to-point queue, publishing, consuming with explicit acks, purging and
//! closing. Each backend decides how these map to its protocol.

use crate::error::Result;
use async_trait::async_trait;

/// Metadata returned when a queue is declared
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueInfo {
    pub name: String,
    pub message_count: u32,
    pub consumer_count: u32,
}

/// Entry point of a broker backend
#[async_trait]
pub trait BrokerConnector: Send + Sync + 'static {
    type Channel: BrokerChannel;

    /// Open a connection to `url` and a channel on it
    async fn connect(&self, url: &str) -> Result<Self::Channel>;
}

/// A channel owned by exactly one import queue
#[async_trait]
pub trait BrokerChannel: Send + Sync + 'static {
    type Subscription: Subscription;

    /// Bound the number of unacknowledged deliveries on this channel
    async fn set_prefetch(&self, limit: u16) -> Result<()>;

    /// Declare `name` if missing. Redeclaring with another durability is an error.
    async fn declare_queue(&self, name: &str, durable: bool) -> Result<QueueInfo>;

    /// Publish `payload` to `queue`. `Ok(false)` asks the caller to slow down.
    async fn publish(&self, queue: &str, payload: &[u8], persistent: bool) -> Result<bool>;

    async fn subscribe(&self, queue: &str) -> Result<Self::Subscription>;

    /// Drop all ready messages of `queue`, returning how many were removed
    async fn purge(&self, queue: &str) -> Result<u32>;

    /// Close the channel, then the connection
    async fn close(&self) -> Result<()>;
}

/// Stream of deliveries for one consumer
#[async_trait]
pub trait Subscription: Send + 'static {
    type Delivery: Delivery;

    /// Next delivery, or `None` once the subscription has ended
    async fn next_delivery(&mut self) -> Option<Result<Self::Delivery>>;

    /// Stop receiving new deliveries. Unacked deliveries stay valid.
    async fn cancel(&mut self) -> Result<()>;
}

/// A single delivered message awaiting acknowledgment
#[async_trait]
pub trait Delivery: Send + Sync + 'static {
    fn payload(&self) -> &[u8];

    /// Acknowledge the delivery, resolving once the broker has taken it
    async fn ack(&self) -> Result<()>;
}
