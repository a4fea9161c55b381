//! Behaviour every backend has to share, written once against the trait.

#![allow(dead_code)]

use snip_storage::{ShortId, StorageError, UrlRepository};

pub fn id(value: &str) -> ShortId {
    ShortId::new(value)
}

pub async fn save_then_lookup(repo: &dyn UrlRepository) {
    repo.save_one(&id("abc123"), "https://example.com")
        .await
        .unwrap();

    let by_id = repo.lookup_by_short_id(&id("abc123")).await.unwrap().unwrap();
    assert_eq!(by_id.original_url, "https://example.com");
    assert!(!by_id.deleted);

    let by_url = repo
        .lookup_by_original_url("https://example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_url.short_id, id("abc123"));
}

pub async fn misses_are_not_errors(repo: &dyn UrlRepository) {
    assert!(repo
        .lookup_by_short_id(&id("doesnotexist"))
        .await
        .unwrap()
        .is_none());
    assert!(repo
        .lookup_by_original_url("https://never.example")
        .await
        .unwrap()
        .is_none());
}

pub async fn duplicate_url_is_a_conflict(repo: &dyn UrlRepository) {
    repo.save_one(&id("first"), "https://dup.example")
        .await
        .unwrap();

    let err = repo
        .save_batch_item(&id("second"), "https://dup.example")
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict(_)), "got {err:?}");

    let winner = repo
        .lookup_by_original_url("https://dup.example")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(winner.short_id, id("first"));
    assert!(repo.lookup_by_short_id(&id("second")).await.unwrap().is_none());
}

pub async fn soft_delete_marks_only_live_records(repo: &dyn UrlRepository) {
    repo.save_one(&id("keep"), "https://keep.example")
        .await
        .unwrap();
    repo.save_one(&id("drop"), "https://drop.example")
        .await
        .unwrap();

    repo.batch_soft_delete(&[id("drop"), id("missing")])
        .await
        .unwrap();
    // Deleting again is harmless.
    repo.batch_soft_delete(&[id("drop")]).await.unwrap();

    let dropped = repo.lookup_by_short_id(&id("drop")).await.unwrap().unwrap();
    assert!(dropped.deleted);
    let kept = repo.lookup_by_short_id(&id("keep")).await.unwrap().unwrap();
    assert!(!kept.deleted);
}

pub async fn durable_records_carry_an_id(repo: &dyn UrlRepository) {
    repo.save_one(&id("withid"), "https://id.example")
        .await
        .unwrap();
    let record = repo.lookup_by_short_id(&id("withid")).await.unwrap().unwrap();
    assert!(record.id.is_some_and(|uuid| !uuid.is_empty()));
}
