//! In-process broker for tests and dry runs.
//!
//! Mirrors the AMQP behaviour the import queue relies on: prefetch bounds the
//! number of unacknowledged deliveries per subscription, a queue cannot be
//! redeclared with another durability, deliveries dropped without an ack go
//! back to the head of their queue, and a delivery can only be acked once.
//! `publish` answers `false` once a queue holds more ready messages than its
//! high-water mark.

use super::broker::{BrokerChannel, BrokerConnector, Delivery, QueueInfo, Subscription};
use crate::error::{QueueError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};

/// Ready messages above which `publish` asks producers to slow down
pub const DEFAULT_HIGH_WATER_MARK: usize = 10_000;

#[derive(Debug, Default)]
struct QueueState {
    durable: bool,
    ready: VecDeque<Vec<u8>>,
    consumers: u32,
}

#[derive(Debug)]
struct BrokerState {
    queues: Mutex<HashMap<String, QueueState>>,
    notify: Notify,
    acks: AtomicUsize,
    open_channels: AtomicUsize,
    shut_down: AtomicBool,
    reachable: bool,
    high_water_mark: usize,
}

/// Shared in-memory broker; clones talk to the same queues
#[derive(Debug, Clone)]
pub struct InMemoryBroker {
    state: Arc<BrokerState>,
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::with_high_water_mark(DEFAULT_HIGH_WATER_MARK)
    }
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_high_water_mark(high_water_mark: usize) -> Self {
        Self::build(true, high_water_mark)
    }

    /// A broker every connection attempt to fails
    pub fn unreachable() -> Self {
        Self::build(false, DEFAULT_HIGH_WATER_MARK)
    }

    fn build(reachable: bool, high_water_mark: usize) -> Self {
        Self {
            state: Arc::new(BrokerState {
                queues: Mutex::new(HashMap::new()),
                notify: Notify::new(),
                acks: AtomicUsize::new(0),
                open_channels: AtomicUsize::new(0),
                shut_down: AtomicBool::new(false),
                reachable,
                high_water_mark,
            }),
        }
    }

    fn queues(&self) -> MutexGuard<'_, HashMap<String, QueueState>> {
        // Poisoning only happens if a holder panicked; the map is still consistent
        self.state
            .queues
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Ready (not yet delivered) messages of `queue`
    pub fn messages(&self, queue: &str) -> Vec<Vec<u8>> {
        self.queues()
            .get(queue)
            .map(|q| q.ready.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn message_count(&self, queue: &str) -> usize {
        self.queues().get(queue).map_or(0, |q| q.ready.len())
    }

    pub fn queue_exists(&self, queue: &str) -> bool {
        self.queues().contains_key(queue)
    }

    /// Total acknowledgments received across all queues
    pub fn ack_count(&self) -> usize {
        self.state.acks.load(Ordering::SeqCst)
    }

    pub fn open_channels(&self) -> usize {
        self.state.open_channels.load(Ordering::SeqCst)
    }

    /// End every subscription, as a broker going away would
    pub fn shutdown(&self) {
        self.state.shut_down.store(true, Ordering::SeqCst);
        self.state.notify.notify_waiters();
    }

    fn is_shut_down(&self) -> bool {
        self.state.shut_down.load(Ordering::SeqCst)
    }

    fn enqueue(&self, queue: &str, payload: Vec<u8>, front: bool) -> Option<usize> {
        let depth = {
            let mut queues = self.queues();
            let state = queues.get_mut(queue)?;
            if front {
                state.ready.push_front(payload);
            } else {
                state.ready.push_back(payload);
            }
            state.ready.len()
        };
        self.state.notify.notify_waiters();
        Some(depth)
    }

    fn dequeue(&self, queue: &str) -> Option<Vec<u8>> {
        self.queues().get_mut(queue)?.ready.pop_front()
    }

    fn release_consumer(&self, queue: &str) {
        if let Some(state) = self.queues().get_mut(queue) {
            state.consumers = state.consumers.saturating_sub(1);
        }
    }
}

#[async_trait]
impl BrokerConnector for InMemoryBroker {
    type Channel = InMemoryChannel;

    async fn connect(&self, url: &str) -> Result<InMemoryChannel> {
        if !self.state.reachable || self.is_shut_down() {
            return Err(QueueError::connection(url, "connection refused"));
        }
        self.state.open_channels.fetch_add(1, Ordering::SeqCst);
        Ok(InMemoryChannel {
            broker: self.clone(),
            prefetch: Mutex::new(None),
            closed: AtomicBool::new(false),
        })
    }
}

pub struct InMemoryChannel {
    broker: InMemoryBroker,
    prefetch: Mutex<Option<Arc<Semaphore>>>,
    closed: AtomicBool,
}

impl InMemoryChannel {
    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(QueueError::Channel("channel is closed".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl BrokerChannel for InMemoryChannel {
    type Subscription = InMemorySubscription;

    async fn set_prefetch(&self, limit: u16) -> Result<()> {
        self.ensure_open()?;
        let semaphore = (limit > 0).then(|| Arc::new(Semaphore::new(usize::from(limit))));
        *self
            .prefetch
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = semaphore;
        Ok(())
    }

    async fn declare_queue(&self, name: &str, durable: bool) -> Result<QueueInfo> {
        self.ensure_open()?;
        let mut queues = self.broker.queues();
        let state = queues.entry(name.to_string()).or_insert_with(|| QueueState {
            durable,
            ..QueueState::default()
        });

        if state.durable != durable {
            return Err(QueueError::declare(
                name,
                "PRECONDITION_FAILED - inequivalent arg 'durable'",
            ));
        }

        Ok(QueueInfo {
            name: name.to_string(),
            message_count: u32::try_from(state.ready.len()).unwrap_or(u32::MAX),
            consumer_count: state.consumers,
        })
    }

    async fn publish(&self, queue: &str, payload: &[u8], _persistent: bool) -> Result<bool> {
        self.ensure_open()?;
        let depth = self
            .broker
            .enqueue(queue, payload.to_vec(), false)
            .ok_or_else(|| QueueError::publish(queue, "queue not declared"))?;
        Ok(depth <= self.broker.state.high_water_mark)
    }

    async fn subscribe(&self, queue: &str) -> Result<InMemorySubscription> {
        self.ensure_open()?;
        {
            let mut queues = self.broker.queues();
            let state = queues
                .get_mut(queue)
                .ok_or_else(|| QueueError::consume(queue, "queue not declared"))?;
            state.consumers += 1;
        }

        let prefetch = self
            .prefetch
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        Ok(InMemorySubscription {
            broker: self.broker.clone(),
            queue: queue.to_string(),
            prefetch,
            cancelled: false,
        })
    }

    async fn purge(&self, queue: &str) -> Result<u32> {
        self.ensure_open()?;
        let mut queues = self.broker.queues();
        let state = queues
            .get_mut(queue)
            .ok_or_else(|| QueueError::consume(queue, "queue not declared"))?;
        let purged = state.ready.len();
        state.ready.clear();
        Ok(u32::try_from(purged).unwrap_or(u32::MAX))
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(QueueError::Close("channel already closed".into()));
        }
        self.broker.state.open_channels.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct InMemorySubscription {
    broker: InMemoryBroker,
    queue: String,
    prefetch: Option<Arc<Semaphore>>,
    cancelled: bool,
}

impl InMemorySubscription {
    fn ended(&self) -> bool {
        self.cancelled || self.broker.is_shut_down()
    }
}

#[async_trait]
impl Subscription for InMemorySubscription {
    type Delivery = InMemoryDelivery;

    async fn next_delivery(&mut self) -> Option<Result<InMemoryDelivery>> {
        // Hold a prefetch slot before taking a message off the queue
        let permit = match &self.prefetch {
            Some(semaphore) => Some(semaphore.clone().acquire_owned().await.ok()?),
            None => None,
        };

        loop {
            let notified = self.broker.state.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.ended() {
                return None;
            }
            if let Some(payload) = self.broker.dequeue(&self.queue) {
                return Some(Ok(InMemoryDelivery {
                    broker: self.broker.clone(),
                    queue: self.queue.clone(),
                    payload,
                    acked: AtomicBool::new(false),
                    permit: Mutex::new(permit),
                }));
            }

            notified.await;
        }
    }

    async fn cancel(&mut self) -> Result<()> {
        if !self.cancelled {
            self.cancelled = true;
            self.broker.release_consumer(&self.queue);
        }
        Ok(())
    }
}

impl Drop for InMemorySubscription {
    fn drop(&mut self) {
        if !self.cancelled {
            self.broker.release_consumer(&self.queue);
        }
    }
}

pub struct InMemoryDelivery {
    broker: InMemoryBroker,
    queue: String,
    payload: Vec<u8>,
    acked: AtomicBool,
    permit: Mutex<Option<OwnedSemaphorePermit>>,
}

#[async_trait]
impl Delivery for InMemoryDelivery {
    fn payload(&self) -> &[u8] {
        &self.payload
    }

    async fn ack(&self) -> Result<()> {
        if self.acked.swap(true, Ordering::SeqCst) {
            return Err(QueueError::Ack("delivery already acknowledged".into()));
        }
        self.broker.state.acks.fetch_add(1, Ordering::SeqCst);
        self.permit
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        Ok(())
    }
}

impl Drop for InMemoryDelivery {
    fn drop(&mut self) {
        if !self.acked.load(Ordering::SeqCst) {
            let payload = std::mem::take(&mut self.payload);
            self.broker.enqueue(&self.queue, payload, true);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn channel(broker: &InMemoryBroker) -> InMemoryChannel {
        let channel = broker.connect("memory://test").await.unwrap();
        channel.declare_queue("jobs", true).await.unwrap();
        channel
    }

    #[tokio::test]
    async fn test_redeclare_with_other_durability_fails() {
        let broker = InMemoryBroker::new();
        let channel = channel(&broker).await;

        assert!(channel.declare_queue("jobs", true).await.is_ok());
        let err = channel.declare_queue("jobs", false).await.unwrap_err();
        assert!(matches!(err, QueueError::Declare { .. }));
    }

    #[tokio::test]
    async fn test_declare_reports_message_count() {
        let broker = InMemoryBroker::new();
        let channel = channel(&broker).await;
        channel.publish("jobs", b"one", true).await.unwrap();
        channel.publish("jobs", b"two", true).await.unwrap();

        let info = channel.declare_queue("jobs", true).await.unwrap();
        assert_eq!(info.message_count, 2);
    }

    #[tokio::test]
    async fn test_publish_signals_high_water_mark() {
        let broker = InMemoryBroker::with_high_water_mark(1);
        let channel = channel(&broker).await;

        assert!(channel.publish("jobs", b"one", true).await.unwrap());
        assert!(!channel.publish("jobs", b"two", true).await.unwrap());
        assert_eq!(broker.message_count("jobs"), 2);
    }

    #[tokio::test]
    async fn test_prefetch_bounds_unacked_deliveries() {
        let broker = InMemoryBroker::new();
        let channel = channel(&broker).await;
        channel.set_prefetch(1).await.unwrap();
        channel.publish("jobs", b"one", true).await.unwrap();
        channel.publish("jobs", b"two", true).await.unwrap();

        let mut subscription = channel.subscribe("jobs").await.unwrap();
        let first = subscription.next_delivery().await.unwrap().unwrap();

        let blocked =
            tokio::time::timeout(Duration::from_millis(50), subscription.next_delivery()).await;
        assert!(blocked.is_err());

        first.ack().await.unwrap();
        let second = subscription.next_delivery().await.unwrap().unwrap();
        assert_eq!(second.payload(), b"two");
    }

    #[tokio::test]
    async fn test_unacked_delivery_is_requeued_on_drop() {
        let broker = InMemoryBroker::new();
        let channel = channel(&broker).await;
        channel.publish("jobs", b"one", true).await.unwrap();

        let mut subscription = channel.subscribe("jobs").await.unwrap();
        let delivery = subscription.next_delivery().await.unwrap().unwrap();
        assert_eq!(broker.message_count("jobs"), 0);

        drop(delivery);
        assert_eq!(broker.messages("jobs"), vec![b"one".to_vec()]);
    }

    #[tokio::test]
    async fn test_double_ack_is_rejected() {
        let broker = InMemoryBroker::new();
        let channel = channel(&broker).await;
        channel.publish("jobs", b"one", true).await.unwrap();

        let mut subscription = channel.subscribe("jobs").await.unwrap();
        let delivery = subscription.next_delivery().await.unwrap().unwrap();

        delivery.ack().await.unwrap();
        assert!(matches!(delivery.ack().await, Err(QueueError::Ack(_))));
        assert_eq!(broker.ack_count(), 1);
    }

    #[tokio::test]
    async fn test_purge_and_shutdown() {
        let broker = InMemoryBroker::new();
        let channel = channel(&broker).await;
        channel.publish("jobs", b"one", true).await.unwrap();
        channel.publish("jobs", b"two", true).await.unwrap();

        assert_eq!(channel.purge("jobs").await.unwrap(), 2);
        assert_eq!(broker.message_count("jobs"), 0);

        let mut subscription = channel.subscribe("jobs").await.unwrap();
        let waiter = tokio::spawn(async move { subscription.next_delivery().await.is_none() });
        tokio::task::yield_now().await;
        broker.shutdown();
        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn test_closed_channel_rejects_operations() {
        let broker = InMemoryBroker::new();
        let channel = channel(&broker).await;
        assert_eq!(broker.open_channels(), 1);

        channel.close().await.unwrap();
        assert_eq!(broker.open_channels(), 0);
        assert!(channel.publish("jobs", b"late", true).await.is_err());
    }

    #[tokio::test]
    async fn test_unreachable_broker() {
        let broker = InMemoryBroker::unreachable();
        let Err(err) = broker.connect("memory://nowhere").await else {
            panic!("unreachable broker accepted a connection");
        };
        assert!(matches!(err, QueueError::Connection { .. }));
    }
}
