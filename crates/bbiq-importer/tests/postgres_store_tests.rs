//! `entity_import` persistence against a real PostgreSQL
//!
//! Run with: `cargo test -p bbiq-importer --test postgres_store_tests -- --ignored`

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use bbiq_common::EntityType;
use bbiq_importer::persistence::{
    ExistingImportAction, ImportRecord, ImportStatus, PgImportStore,
};
use common::{fixture_author, init_test_tracing, TestPostgres};
use serial_test::serial;

async fn count_imports(pg: &TestPostgres) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM entity_import")
        .fetch_one(pg.pool())
        .await
        .unwrap()
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn test_import_creates_pending_row() {
    init_test_tracing();
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    let store = PgImportStore::new(pg.pool().clone(), ExistingImportAction::Skip);

    let author = fixture_author();
    let result = store.import_record(EntityType::Author, &author).await.unwrap();
    assert_eq!(result.status, ImportStatus::CreatedPending);

    let (entity_type, default_alias, source): (String, String, String) = sqlx::query_as(
        "SELECT entity_type, default_alias, origin_source FROM entity_import WHERE id = $1",
    )
    .bind(result.import_id)
    .fetch_one(pg.pool())
    .await
    .unwrap();
    assert_eq!(entity_type, "Author");
    assert_eq!(default_alias, "J. K. Rowling");
    assert_eq!(source, "OPENLIBRARY");
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn test_reimport_is_idempotent() {
    init_test_tracing();
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    let store = PgImportStore::new(pg.pool().clone(), ExistingImportAction::Skip);
    let author = fixture_author();

    let first = store.import_record(EntityType::Author, &author).await.unwrap();
    let second = store.import_record(EntityType::Author, &author).await.unwrap();

    assert_eq!(second.status, ImportStatus::SkippedPending);
    assert_eq!(second.import_id, first.import_id);
    assert_eq!(count_imports(&pg).await, 1);
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn test_newer_edit_updates_pending_row() {
    init_test_tracing();
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    let store = PgImportStore::new(pg.pool().clone(), ExistingImportAction::UpdatePending);

    let author = fixture_author();
    let first = store.import_record(EntityType::Author, &author).await.unwrap();

    let mut edited = author.clone();
    edited.last_edited = Some("2024-01-01T00:00:00".to_string());
    edited.data.annotation = Some("Updated biography.".to_string());
    let second = store.import_record(EntityType::Author, &edited).await.unwrap();
    assert_eq!(second.status, ImportStatus::UpdatedPending);
    assert_eq!(second.import_id, first.import_id);

    let third = store.import_record(EntityType::Author, &author).await.unwrap();
    assert_eq!(third.status, ImportStatus::SkippedPending);
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn test_accepted_import_is_never_touched() {
    init_test_tracing();
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    let store = PgImportStore::new(pg.pool().clone(), ExistingImportAction::UpdatePending);

    let author = fixture_author();
    let first = store.import_record(EntityType::Author, &author).await.unwrap();
    sqlx::query("UPDATE entity_import SET accepted_bbid = '6f2b7f0e-2c55-4e8a-9a4c-3f1f8f0f1a01'::uuid WHERE id = $1")
        .bind(first.import_id)
        .execute(pg.pool())
        .await
        .unwrap();

    let mut edited = author.clone();
    edited.last_edited = Some("2030-01-01T00:00:00".to_string());
    let second = store.import_record(EntityType::Author, &edited).await.unwrap();
    assert_eq!(second.status, ImportStatus::SkippedAccepted);
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn test_same_origin_id_of_another_kind_is_separate() {
    init_test_tracing();
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    let store = PgImportStore::new(pg.pool().clone(), ExistingImportAction::Skip);

    let author = fixture_author();
    let mut work = author.clone();
    work.entity_type = EntityType::Work.to_string();

    store.import_record(EntityType::Author, &author).await.unwrap();
    let result = store.import_record(EntityType::Work, &work).await.unwrap();
    assert_eq!(result.status, ImportStatus::CreatedPending);
    assert_eq!(count_imports(&pg).await, 2);
}
