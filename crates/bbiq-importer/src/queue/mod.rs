//! Durable import queue between producers and consumers.
//!
//! An [`ImportQueue`] owns one broker channel and declares the primary queue
//! plus an optional failure queue. Producers call [`ImportQueue::push`];
//! consumers register a single handler with [`ImportQueue::on_data`] that
//! receives parsed entities and answers whether the import succeeded.
//!
//! # Acknowledgments
//!
//! Every delivery is acknowledged exactly once after its handler resolved,
//! whatever the outcome. Redelivering an entity that failed deterministically
//! would loop forever, so retries of transient failures belong to the handler.
//! Rejected entities are copied to the failure queue (before the ack) when one
//! is configured. Payloads that do not parse are acknowledged and dropped.
//!
//! # Example
//!
//! ```no_run
//! use bbiq_importer::queue::{AmqpConnector, ImportQueue, ImportQueueOptions};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let mut queue = ImportQueue::new(AmqpConnector, ImportQueueOptions::default());
//! queue.open().await?;
//! queue
//!     .on_data(|entity| async move {
//!         tracing::info!(%entity, "Received");
//!         true
//!     })
//!     .await?;
//! queue.wait_for_consumer().await;
//! queue.close().await;
//! # Ok(())
//! # }
//! ```

mod amqp;
mod broker;
mod memory;
mod options;
mod stats;

pub use amqp::{AmqpChannel, AmqpConnector, AmqpDelivery, AmqpSubscription};
pub use broker::{BrokerChannel, BrokerConnector, Delivery, QueueInfo, Subscription};
pub use memory::{
    InMemoryBroker, InMemoryChannel, InMemoryDelivery, InMemorySubscription,
    DEFAULT_HIGH_WATER_MARK,
};
pub use options::*;
pub use stats::QueueStats;

use crate::error::{QueueError, Result};
use bbiq_common::QueuedEntity;
use futures::FutureExt;
use stats::QueueCounters;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument};

enum Connection<Ch> {
    Idle,
    Open(Arc<Ch>),
    Closed,
}

struct ConsumerHandle {
    shutdown: CancellationToken,
    ended: CancellationToken,
    task: JoinHandle<()>,
}

/// Queue of entities waiting to be imported
pub struct ImportQueue<C: BrokerConnector> {
    connector: C,
    options: ImportQueueOptions,
    connection: Connection<C::Channel>,
    counters: Arc<QueueCounters>,
    consumer: Option<ConsumerHandle>,
}

impl<C: BrokerConnector> ImportQueue<C> {
    pub fn new(connector: C, options: ImportQueueOptions) -> Self {
        Self {
            connector,
            options,
            connection: Connection::Idle,
            counters: Arc::new(QueueCounters::default()),
            consumer: None,
        }
    }

    pub fn options(&self) -> &ImportQueueOptions {
        &self.options
    }

    pub fn is_open(&self) -> bool {
        matches!(self.connection, Connection::Open(_))
    }

    pub fn stats(&self) -> QueueStats {
        self.counters.snapshot()
    }

    fn channel(&self) -> Result<&Arc<C::Channel>> {
        match &self.connection {
            Connection::Open(channel) => Ok(channel),
            Connection::Idle | Connection::Closed => Err(QueueError::NotOpen),
        }
    }

    /// Connect, apply the prefetch limit and declare the queues.
    ///
    /// Returns the metadata of the primary queue, followed by the failure
    /// queue when one is configured. May only be called once.
    pub async fn open(&mut self) -> Result<Vec<QueueInfo>> {
        if !matches!(self.connection, Connection::Idle) {
            return Err(QueueError::AlreadyOpen);
        }

        let options = &self.options;
        let channel = self.connector.connect(&options.connection_url).await?;

        match declare_queues(&channel, options).await {
            Ok(queues) => {
                for queue in &queues {
                    info!(
                        queue = %queue.name,
                        messages = queue.message_count,
                        consumers = queue.consumer_count,
                        persistent = options.is_persistent,
                        "Queue declared"
                    );
                }
                self.connection = Connection::Open(Arc::new(channel));
                Ok(queues)
            }
            Err(e) => {
                if let Err(close_err) = channel.close().await {
                    debug!(error = %close_err, "Failed to close channel after declare error");
                }
                Err(e)
            }
        }
    }

    /// Publish `entity` to the primary queue.
    ///
    /// Never fails: errors are logged and reported as `false`. `false` from an
    /// open queue also means the broker wants producers to slow down.
    pub async fn push(&self, entity: &QueuedEntity) -> bool {
        let channel = match self.channel() {
            Ok(channel) => channel,
            Err(e) => {
                error!(%entity, error = %e, "Unable to push into the queue");
                return false;
            }
        };

        let payload = match entity.to_vec() {
            Ok(payload) => payload,
            Err(e) => {
                error!(%entity, error = %e, "Unable to serialize entity");
                return false;
            }
        };

        match channel
            .publish(&self.options.queue_name, &payload, self.options.is_persistent)
            .await
        {
            Ok(true) => true,
            Ok(false) => {
                debug!(%entity, "Broker buffer over capacity");
                false
            }
            Err(e) => {
                error!(%entity, error = %e, "Unable to push into the queue");
                false
            }
        }
    }

    /// Register the handler invoked once per delivered entity.
    ///
    /// The handler's result decides whether the raw payload is copied to the
    /// failure queue; the delivery is acknowledged either way. Only one
    /// handler may be registered per queue.
    pub async fn on_data<F, Fut>(&mut self, handler: F) -> Result<()>
    where
        F: Fn(QueuedEntity) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        if self.consumer.is_some() {
            return Err(QueueError::ConsumerAlreadyRegistered);
        }
        let channel = Arc::clone(self.channel()?);
        let subscription = channel.subscribe(&self.options.queue_name).await?;

        let context = Arc::new(DispatchContext {
            channel,
            handler,
            failure_queue: self.options.failure_queue.clone(),
            persistent: self.options.is_persistent,
            counters: Arc::clone(&self.counters),
        });

        let shutdown = CancellationToken::new();
        let ended = CancellationToken::new();
        let task = tokio::spawn(
            dispatch(subscription, context, shutdown.clone(), ended.clone()).in_current_span(),
        );

        debug!(queue = %self.options.queue_name, "Consumer registered, waiting for messages");
        self.consumer = Some(ConsumerHandle {
            shutdown,
            ended,
            task,
        });
        Ok(())
    }

    /// Resolves once the broker ends the subscription or the queue is closed.
    /// Returns immediately when no consumer is registered.
    pub async fn wait_for_consumer(&self) {
        if let Some(consumer) = &self.consumer {
            consumer.ended.cancelled().await;
        }
    }

    /// Drop every ready message of the primary queue. The failure queue is untouched.
    pub async fn purge(&self) -> Result<u32> {
        let purged = self.channel()?.purge(&self.options.queue_name).await?;
        info!(queue = %self.options.queue_name, purged, "Queue purged");
        Ok(purged)
    }

    /// Stop consuming, give pending deliveries their grace period, then close
    /// the channel and the connection.
    ///
    /// Returns `false` if the queue was never opened (or already closed).
    pub async fn close(&mut self) -> bool {
        let channel = match std::mem::replace(&mut self.connection, Connection::Closed) {
            Connection::Open(channel) => channel,
            Connection::Idle | Connection::Closed => return false,
        };

        let stats = self.counters.snapshot();
        info!(
            processed = stats.processed,
            consumed = stats.consumed,
            "Closing import queue"
        );

        if let Some(consumer) = self.consumer.take() {
            consumer.shutdown.cancel();
            if let Err(e) = consumer.task.await {
                warn!(error = %e, "Consumer dispatcher did not stop cleanly");
            }
        }

        let interval = self.options.close_poll_interval();
        for _ in 0..self.options.close_grace_periods {
            if self.counters.pending() == 0 {
                break;
            }
            tokio::time::sleep(interval).await;
        }

        let remaining = self.counters.pending();
        if remaining > 0 {
            warn!(
                remaining,
                grace_ms = self.options.close_grace().as_millis() as u64,
                "Grace period elapsed, force-closing with unacknowledged messages"
            );
        }

        if let Err(e) = channel.close().await {
            error!(error = %e, "Unable to close connection");
        }
        true
    }
}

impl<C: BrokerConnector> Drop for ImportQueue<C> {
    fn drop(&mut self) {
        if let Some(consumer) = &self.consumer {
            consumer.shutdown.cancel();
        }
    }
}

async fn declare_queues<Ch: BrokerChannel>(
    channel: &Ch,
    options: &ImportQueueOptions,
) -> Result<Vec<QueueInfo>> {
    channel.set_prefetch(options.prefetch_limit).await?;

    let mut queues = vec![
        channel
            .declare_queue(&options.queue_name, options.is_persistent)
            .await?,
    ];
    if let Some(failure_queue) = &options.failure_queue {
        queues.push(
            channel
                .declare_queue(failure_queue, options.is_persistent)
                .await?,
        );
    }
    Ok(queues)
}

struct DispatchContext<Ch, F> {
    channel: Arc<Ch>,
    handler: F,
    failure_queue: Option<String>,
    persistent: bool,
    counters: Arc<QueueCounters>,
}

async fn dispatch<Ch, F, Fut>(
    mut subscription: Ch::Subscription,
    context: Arc<DispatchContext<Ch, F>>,
    shutdown: CancellationToken,
    ended: CancellationToken,
) where
    Ch: BrokerChannel,
    F: Fn(QueuedEntity) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    loop {
        let next = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            next = subscription.next_delivery() => next,
        };

        match next {
            Some(Ok(delivery)) => {
                context.counters.received();
                tokio::spawn(handle_delivery(Arc::clone(&context), delivery).in_current_span());
            }
            Some(Err(e)) => {
                error!(error = %e, "Subscription failed");
                break;
            }
            None => {
                info!("Subscription ended by the broker");
                break;
            }
        }
    }

    if let Err(e) = subscription.cancel().await {
        warn!(error = %e, "Unable to cancel subscription");
    }
    ended.cancel();
}

async fn handle_delivery<Ch, F, Fut>(
    context: Arc<DispatchContext<Ch, F>>,
    delivery: <Ch::Subscription as Subscription>::Delivery,
) where
    Ch: BrokerChannel,
    F: Fn(QueuedEntity) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    let payload = delivery.payload();

    match QueuedEntity::from_slice(payload) {
        Err(e) => {
            warn!(error = %e, bytes = payload.len(), "Discarding unparseable message");
            context.counters.unparseable();
        }
        Ok(entity) => {
            let handler = &context.handler;
            let succeeded = AssertUnwindSafe(async move { handler(entity).await })
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    error!("Consumer handler panicked, treating entity as failed");
                    false
                });

            if !succeeded {
                context.counters.rejected();
                route_to_failure_queue(&context, payload).await;
            }
        }
    }

    if let Err(e) = delivery.ack().await {
        error!(error = %e, "Unable to acknowledge delivery");
    }
    context.counters.finished();
}

async fn route_to_failure_queue<Ch: BrokerChannel, F>(
    context: &DispatchContext<Ch, F>,
    payload: &[u8],
) {
    let Some(failure_queue) = &context.failure_queue else {
        return;
    };

    match context
        .channel
        .publish(failure_queue, payload, context.persistent)
        .await
    {
        Ok(true) => debug!(queue = %failure_queue, "Entity moved to failure queue"),
        Ok(false) => warn!(queue = %failure_queue, "Failure queue over capacity"),
        Err(e) => error!(queue = %failure_queue, error = %e, "Unable to publish to failure queue"),
    }
}
