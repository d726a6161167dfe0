//! Producer to consumer scenarios with a scripted importer

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use bbiq_common::{EntityType, QueuedEntity};
use bbiq_importer::consumer::{ImportConsumer, RetryPolicy};
use bbiq_importer::persistence::ImportStatus;
use bbiq_importer::queue::{ImportQueue, InMemoryBroker};
use bbiq_importer::ImportErrorKind;
use common::{eventually, fixture_author, init_test_tracing, test_options, Step, StubImporter};
use std::sync::Arc;
use std::time::Duration;

async fn run_pipeline(
    importer: Arc<StubImporter>,
    retry: RetryPolicy,
    entities: &[QueuedEntity],
) -> (InMemoryBroker, ImportQueue<InMemoryBroker>) {
    let broker = InMemoryBroker::new();
    let mut queue = ImportQueue::new(broker.clone(), test_options());
    queue.open().await.unwrap();

    for entity in entities {
        assert!(queue.push(entity).await);
    }

    ImportConsumer::new(0, importer, retry)
        .register(&mut queue)
        .await
        .unwrap();

    let expected = entities.len() as u64;
    eventually(|| queue.stats().processed == expected).await;
    (broker, queue)
}

fn failure_count(broker: &InMemoryBroker, queue: &ImportQueue<InMemoryBroker>) -> usize {
    broker.message_count(queue.options().failure_queue.as_deref().unwrap())
}

#[tokio::test]
async fn test_valid_author_is_imported() {
    init_test_tracing();
    let author = fixture_author();
    let consumer = ImportConsumer::new(
        0,
        Arc::new(StubImporter::new([Step::Succeed(42)])),
        RetryPolicy::immediate(3),
    );

    let report = consumer.consume(&author).await;
    let result = report.outcome.unwrap();
    assert_eq!(result.import_id, 42);
    assert_eq!(result.status, ImportStatus::CreatedPending);
    assert_eq!(result.status.to_string(), "created pending");
    assert_eq!(report.attempts, 1);
}

#[tokio::test]
async fn test_happy_path_through_the_queue() {
    init_test_tracing();
    let importer = Arc::new(StubImporter::new([Step::Succeed(42)]));
    let author = fixture_author();

    let (broker, mut queue) =
        run_pipeline(Arc::clone(&importer), RetryPolicy::immediate(3), &[author]).await;

    assert_eq!(importer.calls(), 1);
    assert_eq!(
        importer.imported(),
        vec![(EntityType::Author, "OL23919A".to_string())]
    );
    assert_eq!(broker.ack_count(), 1);
    assert_eq!(failure_count(&broker, &queue), 0);
    queue.close().await;
}

#[tokio::test]
async fn test_unknown_entity_type_is_rejected_without_import() {
    init_test_tracing();
    let importer = Arc::new(StubImporter::default());
    let mut bogus = fixture_author();
    bogus.entity_type = "Bogus".to_string();

    let consumer = ImportConsumer::new(0, Arc::clone(&importer), RetryPolicy::immediate(3));
    let report = consumer.consume(&bogus).await;
    assert_eq!(report.error_kind(), ImportErrorKind::RecordEntityNotFound);
    assert_eq!(report.error_kind().code(), "RECORD_ENTITY_NOT_FOUND");
    assert_eq!(report.attempts, 0);

    let (broker, mut queue) =
        run_pipeline(Arc::clone(&importer), RetryPolicy::immediate(3), &[bogus]).await;
    assert_eq!(importer.calls(), 0);
    assert_eq!(broker.ack_count(), 1);
    assert_eq!(failure_count(&broker, &queue), 1);
    queue.close().await;
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    init_test_tracing();
    let importer = Arc::new(StubImporter::new([
        Step::Fail("deadlock detected"),
        Step::Fail("deadlock detected"),
        Step::Succeed(7),
    ]));

    let (broker, mut queue) = run_pipeline(
        Arc::clone(&importer),
        RetryPolicy::immediate(3),
        &[fixture_author()],
    )
    .await;

    assert_eq!(importer.calls(), 3);
    assert_eq!(queue.stats().failed, 0);
    assert_eq!(broker.ack_count(), 1);
    assert_eq!(failure_count(&broker, &queue), 0);
    queue.close().await;
}

#[tokio::test]
async fn test_exhausted_retries_reject_the_entity() {
    init_test_tracing();
    let importer = Arc::new(StubImporter::always_failing(10));

    let (broker, mut queue) = run_pipeline(
        Arc::clone(&importer),
        RetryPolicy::immediate(2),
        &[fixture_author()],
    )
    .await;

    assert_eq!(importer.calls(), 2);
    assert_eq!(queue.stats().failed, 1);
    assert_eq!(broker.ack_count(), 1);
    assert_eq!(failure_count(&broker, &queue), 1);
    queue.close().await;
}

#[tokio::test]
async fn test_exhausted_retries_report_transaction_error() {
    init_test_tracing();
    let importer = Arc::new(StubImporter::always_failing(10));
    let consumer = ImportConsumer::new(0, Arc::clone(&importer), RetryPolicy::immediate(2));

    let report = consumer.consume(&fixture_author()).await;
    assert_eq!(report.error_kind(), ImportErrorKind::TransactionError);
    assert_eq!(report.attempts, 2);
    assert!(report.outcome.unwrap_err().message.contains("connection reset"));
}

#[tokio::test]
async fn test_invalid_entity_never_reaches_persistence() {
    init_test_tracing();
    let importer = Arc::new(StubImporter::default());
    let mut invalid = fixture_author();
    for alias in &mut invalid.data.alias {
        alias.default = false;
    }

    let (broker, mut queue) =
        run_pipeline(Arc::clone(&importer), RetryPolicy::immediate(3), &[invalid]).await;

    assert_eq!(importer.calls(), 0);
    assert_eq!(queue.stats().failed, 1);
    assert_eq!(broker.ack_count(), 1);
    assert_eq!(failure_count(&broker, &queue), 1);
    queue.close().await;
}

#[tokio::test]
async fn test_importer_panic_is_a_transaction_error() {
    init_test_tracing();
    let importer = Arc::new(StubImporter::new([Step::Panic, Step::Succeed(5)]));
    let consumer = ImportConsumer::new(0, Arc::clone(&importer), RetryPolicy::immediate(2));

    let report = consumer.consume(&fixture_author()).await;
    assert_eq!(report.outcome.unwrap().import_id, 5);
    assert_eq!(report.attempts, 2);

    let importer = Arc::new(StubImporter::new([Step::Panic]));
    let consumer = ImportConsumer::new(0, Arc::clone(&importer), RetryPolicy::immediate(1));
    let report = consumer.consume(&fixture_author()).await;
    assert_eq!(report.error_kind(), ImportErrorKind::TransactionError);
    assert_eq!(importer.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_waits_between_attempts() {
    init_test_tracing();
    let importer = Arc::new(StubImporter::new([
        Step::Fail("timeout"),
        Step::Fail("timeout"),
        Step::Succeed(9),
    ]));
    let retry = RetryPolicy::with_backoff(3, Duration::from_millis(100), Duration::from_secs(1));
    let consumer = ImportConsumer::new(0, Arc::clone(&importer), retry);

    let started = tokio::time::Instant::now();
    let report = consumer.consume(&fixture_author()).await;

    assert!(report.is_success());
    // 100ms after the first failure, 200ms after the second
    assert!(started.elapsed() >= Duration::from_millis(300));
}

#[tokio::test]
async fn test_slow_import_does_not_block_other_deliveries() {
    init_test_tracing();
    let importer = Arc::new(StubImporter::new([
        Step::Delay(Duration::from_millis(300), 1),
        Step::Succeed(2),
    ]));
    let mut first = fixture_author();
    first.origin_id = "OL1A".to_string();
    let mut second = fixture_author();
    second.origin_id = "OL2A".to_string();

    let (_broker, mut queue) = run_pipeline(
        Arc::clone(&importer),
        RetryPolicy::immediate(1),
        &[first, second],
    )
    .await;

    let imported: Vec<String> = importer.imported().into_iter().map(|(_, id)| id).collect();
    assert_eq!(imported, vec!["OL2A".to_string(), "OL1A".to_string()]);
    queue.close().await;
}
