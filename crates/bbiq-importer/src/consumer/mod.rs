//! Consumer side of the pipeline: turns one delivered entity into a persisted
//! pending import or a definitive rejection.
//!
//! ```text
//! Received -> Validating -> ValidationFailed                      (reject)
//!                        -> Persisting -> Persisted               (success)
//!                                      -> TransactionFailed -> Persisting (attempts left)
//!                                                           -> reject     (exhausted)
//! ```
//!
//! Unknown entity types and invalid payloads are rejected without retry.
//! Persistence errors and panics count as transaction errors and are retried
//! up to the [`RetryPolicy`] limit. Each entity's attempts are sequential;
//! other deliveries keep flowing while one entity is retried.

mod retry;

pub use retry::RetryPolicy;

use crate::error::{ImportErrorKind, Result};
use crate::persistence::{ImportRecord, ImportResult};
use crate::queue::{BrokerConnector, ImportQueue};
use crate::validators;
use bbiq_common::QueuedEntity;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Why an entity was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumeError {
    pub kind: ImportErrorKind,
    pub message: String,
}

/// Outcome of consuming one entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumeReport {
    pub outcome: std::result::Result<ImportResult, ConsumeError>,
    /// Persistence attempts made, 0 when rejected before persisting
    pub attempts: u32,
}

impl ConsumeReport {
    fn rejected(kind: ImportErrorKind, message: impl Into<String>, attempts: u32) -> Self {
        Self {
            outcome: Err(ConsumeError {
                kind,
                message: message.into(),
            }),
            attempts,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn error_kind(&self) -> ImportErrorKind {
        match &self.outcome {
            Ok(_) => ImportErrorKind::None,
            Err(e) => e.kind,
        }
    }
}

/// Validates and persists entities handed over by an [`ImportQueue`]
pub struct ImportConsumer<I> {
    worker_id: usize,
    importer: Arc<I>,
    retry: RetryPolicy,
}

impl<I: ImportRecord> ImportConsumer<I> {
    pub fn new(worker_id: usize, importer: Arc<I>, retry: RetryPolicy) -> Self {
        Self {
            worker_id,
            importer,
            retry,
        }
    }

    pub fn worker_id(&self) -> usize {
        self.worker_id
    }

    /// Register this consumer as the queue's handler.
    ///
    /// Deliveries are handled inside a `consumer{worker=N}` span.
    pub async fn register<C: BrokerConnector>(self, queue: &mut ImportQueue<C>) -> Result<()> {
        let span = info_span!("consumer", worker = self.worker_id);
        let consumer = Arc::new(self);
        async move {
            info!("Running consumer");
            queue
                .on_data(move |entity| {
                    let consumer = Arc::clone(&consumer);
                    async move { consumer.handle(entity).await }
                })
                .await
        }
        .instrument(span)
        .await
    }

    /// Queue handler: `true` only when the entity was persisted
    pub async fn handle(&self, entity: QueuedEntity) -> bool {
        debug!(%entity, "Received entity");
        self.consume(&entity).await.is_success()
    }

    /// Run the validation and persistence state machine for one entity
    pub async fn consume(&self, entity: &QueuedEntity) -> ConsumeReport {
        let Some(kind) = entity.kind() else {
            let kind = ImportErrorKind::RecordEntityNotFound;
            warn!(
                %entity,
                entity_type = %entity.entity_type,
                code = kind.code(),
                "{} [skipping]",
                kind.message()
            );
            return ConsumeReport::rejected(
                kind,
                format!("unsupported entity type '{}'", entity.entity_type),
                0,
            );
        };

        if let Err(e) = validators::validate(kind, &entity.data) {
            let kind = ImportErrorKind::InvalidRecord;
            warn!(
                %entity,
                code = kind.code(),
                field = %e.field,
                error = %e.message,
                "{} [skipping]",
                kind.message()
            );
            return ConsumeReport::rejected(kind, e.to_string(), 0);
        }

        let limit = self.retry.attempts();
        let mut attempts = 0;

        loop {
            attempts += 1;
            if attempts > 1 {
                info!(%entity, attempt = attempts, "Restarting import process");
            }

            let attempt = AssertUnwindSafe(self.importer.import_record(kind, entity))
                .catch_unwind()
                .await;

            let message = match attempt {
                Ok(Ok(result)) => {
                    info!(
                        %entity,
                        import_id = result.import_id,
                        status = %result.status,
                        attempts,
                        "Imported entity"
                    );
                    return ConsumeReport {
                        outcome: Ok(result),
                        attempts,
                    };
                }
                Ok(Err(e)) => e.to_string(),
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    error!(%entity, panic = %message, "Unexpected panic while importing");
                    format!("unexpected panic: {message}")
                }
            };

            let kind = ImportErrorKind::TransactionError;
            let attempts_left = limit.saturating_sub(attempts);
            if attempts_left == 0 {
                let record = serde_json::to_string(entity).unwrap_or_default();
                error!(
                    %entity,
                    code = kind.code(),
                    error = %message,
                    attempts,
                    record = %record,
                    "No more attempts left, rejecting entity"
                );
                return ConsumeReport::rejected(kind, message, attempts);
            }

            warn!(
                %entity,
                code = kind.code(),
                error = %message,
                attempts_left,
                "{} [retrying]",
                kind.message()
            );

            let delay = self.retry.delay_after(attempts);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_extraction() {
        let static_str: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(static_str.as_ref()), "boom");

        let owned: Box<dyn Any + Send> = Box::new(String::from("owned boom"));
        assert_eq!(panic_message(owned.as_ref()), "owned boom");

        let other: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }

    #[test]
    fn test_report_error_kind() {
        let rejected = ConsumeReport::rejected(ImportErrorKind::InvalidRecord, "bad", 0);
        assert!(!rejected.is_success());
        assert_eq!(rejected.error_kind(), ImportErrorKind::InvalidRecord);
    }
}
