mod common;

use snip_storage::{BackendKind, FileRepository, InMemoryRepository, SqliteRepository, UrlRepository};
use tempfile::TempDir;

async fn sqlite() -> SqliteRepository {
    let repo = SqliteRepository::in_memory().await.expect("open sqlite");
    repo.ensure_schema().await.expect("create schema");
    repo
}

struct FileFixture {
    _dir: TempDir,
    repo: FileRepository,
}

impl FileFixture {
    fn start() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let repo = FileRepository::open(dir.path().join("short-url-db.json")).expect("open file");
        Self { _dir: dir, repo }
    }
}

#[tokio::test]
async fn memory_save_then_lookup() {
    common::save_then_lookup(&InMemoryRepository::new()).await;
}

#[tokio::test]
async fn memory_misses_are_not_errors() {
    common::misses_are_not_errors(&InMemoryRepository::new()).await;
}

#[tokio::test]
async fn memory_duplicate_url_is_a_conflict() {
    common::duplicate_url_is_a_conflict(&InMemoryRepository::new()).await;
}

#[tokio::test]
async fn file_save_then_lookup() {
    let fixture = FileFixture::start();
    common::save_then_lookup(&fixture.repo).await;
}

#[tokio::test]
async fn file_misses_are_not_errors() {
    let fixture = FileFixture::start();
    common::misses_are_not_errors(&fixture.repo).await;
}

#[tokio::test]
async fn file_duplicate_url_is_a_conflict() {
    let fixture = FileFixture::start();
    common::duplicate_url_is_a_conflict(&fixture.repo).await;
}

#[tokio::test]
async fn file_soft_delete_marks_only_live_records() {
    let fixture = FileFixture::start();
    common::soft_delete_marks_only_live_records(&fixture.repo).await;
}

#[tokio::test]
async fn file_records_carry_an_id() {
    let fixture = FileFixture::start();
    common::durable_records_carry_an_id(&fixture.repo).await;
}

#[tokio::test]
async fn sqlite_save_then_lookup() {
    common::save_then_lookup(&sqlite().await).await;
}

#[tokio::test]
async fn sqlite_misses_are_not_errors() {
    common::misses_are_not_errors(&sqlite().await).await;
}

#[tokio::test]
async fn sqlite_duplicate_url_is_a_conflict() {
    common::duplicate_url_is_a_conflict(&sqlite().await).await;
}

#[tokio::test]
async fn sqlite_soft_delete_marks_only_live_records() {
    common::soft_delete_marks_only_live_records(&sqlite().await).await;
}

#[tokio::test]
async fn sqlite_records_carry_an_id() {
    common::durable_records_carry_an_id(&sqlite().await).await;
}

#[tokio::test]
async fn sqlite_health_check_fails_after_close() {
    let repo = sqlite().await;
    assert!(repo.health_check().await.is_ok());
    assert_eq!(repo.backend(), BackendKind::Sqlite);

    repo.close().await;
    assert!(repo.health_check().await.is_err());
}
