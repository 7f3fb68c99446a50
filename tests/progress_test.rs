use chrono::{Duration, TimeZone, Utc};
use futures_util::future::join_all;
use std::sync::Arc;

use nihongo_api::core::{Clock, ManualClock};
use nihongo_api::storage::models::{NewProgress, ProgressPatch, ProgressQuery, ProgressStatus};
use nihongo_api::storage::{MemoryStorageProvider, ProgressStorage};
use nihongo_api::NihongoError;

fn storage_at(clock: &ManualClock) -> MemoryStorageProvider {
    let clock: Arc<dyn Clock> = Arc::new(clock.clone());
    MemoryStorageProvider::with_clock(clock)
}

#[tokio::test]
async fn test_second_create_conflicts() {
    let storage = MemoryStorageProvider::new();

    let first = storage
        .create_progress(NewProgress::started("u1", "l1"))
        .await
        .unwrap();
    assert_eq!(first.status, ProgressStatus::InProgress);
    assert_eq!(first.attempts, 0);
    assert!(!first.favorite);

    let err = storage
        .create_progress(NewProgress::started("u1", "l1"))
        .await
        .unwrap_err();
    assert!(matches!(err, NihongoError::ConflictError(_)));
    assert_eq!(err.status_code(), 409);

    // Different user, same lesson is a separate record
    assert!(storage
        .create_progress(NewProgress::started("u2", "l1"))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_concurrent_creates_produce_one_record() {
    let storage = Arc::new(MemoryStorageProvider::new());

    let attempts = (0..8).map(|_| {
        let storage = Arc::clone(&storage);
        tokio::spawn(async move {
            storage
                .create_progress(NewProgress::started("u1", "l1"))
                .await
        })
    });

    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let created = results.iter().filter(|result| result.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|result| matches!(result, Err(NihongoError::ConflictError(_))))
        .count();
    assert_eq!(created, 1);
    assert_eq!(conflicts, 7);

    let records = storage
        .progress_by_user("u1", ProgressQuery::default())
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn test_patch_only_touches_given_fields() {
    let start = Utc.with_ymd_and_hms(2025, 5, 10, 9, 0, 0).unwrap();
    let clock = ManualClock::new(start);
    let storage = storage_at(&clock);

    let mut new_progress = NewProgress::started("u1", "l1");
    new_progress.notes = Some("kana".to_string());
    new_progress.time_spent = 120;
    storage.create_progress(new_progress).await.unwrap();

    clock.advance(Duration::minutes(5));
    let updated = storage
        .update_progress("u1", "l1", ProgressPatch::score(70))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.score, 70);
    assert_eq!(updated.status, ProgressStatus::InProgress);
    assert_eq!(updated.notes.as_deref(), Some("kana"));
    assert_eq!(updated.time_spent, 120);
    assert_eq!(updated.started_at, start);
    assert_eq!(updated.last_accessed, start + Duration::minutes(5));
    assert!(updated.completed_at.is_none());
}

#[tokio::test]
async fn test_completion_stamps_once_and_counts_attempt() {
    let start = Utc.with_ymd_and_hms(2025, 5, 10, 9, 0, 0).unwrap();
    let clock = ManualClock::new(start);
    let storage = storage_at(&clock);
    storage
        .create_progress(NewProgress::started("u1", "l1"))
        .await
        .unwrap();

    clock.advance(Duration::hours(1));
    let completed = storage
        .update_progress("u1", "l1", ProgressPatch::completed(90))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(completed.status, ProgressStatus::Completed);
    assert_eq!(completed.score, 90);
    assert_eq!(completed.attempts, 1);
    assert_eq!(completed.completed_at, Some(start + Duration::hours(1)));

    clock.advance(Duration::hours(1));
    let again = storage
        .update_progress("u1", "l1", ProgressPatch::completed(95))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(again.attempts, 1);
    assert_eq!(again.score, 95);
    assert_eq!(again.completed_at, Some(start + Duration::hours(1)));
}

#[tokio::test]
async fn test_update_missing_record_is_none() {
    let storage = MemoryStorageProvider::new();
    let result = storage
        .update_progress("u1", "missing", ProgressPatch::favorite(true))
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_stats_and_filters() {
    let storage = MemoryStorageProvider::new();
    for lesson in ["l1", "l2", "l3"] {
        storage
            .create_progress(NewProgress::started("u1", lesson))
            .await
            .unwrap();
    }
    storage
        .update_progress("u1", "l1", ProgressPatch::completed(80))
        .await
        .unwrap();
    storage
        .update_progress("u1", "l2", ProgressPatch::favorite(true))
        .await
        .unwrap();

    let stats = storage.user_progress_stats("u1").await.unwrap();
    assert_eq!(stats.total_lessons, 3);
    assert_eq!(stats.completed_lessons, 1);
    assert_eq!(stats.in_progress_lessons, 2);
    assert_eq!(stats.favorite_lessons, 1);

    let completed = storage
        .progress_by_user(
            "u1",
            ProgressQuery {
                status: Some(ProgressStatus::Completed),
                ..ProgressQuery::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].lesson_id, "l1");

    let favorites = storage
        .progress_by_user(
            "u1",
            ProgressQuery {
                favorite_only: true,
                ..ProgressQuery::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].lesson_id, "l2");

    let board = storage.leaderboard(10).await.unwrap();
    assert_eq!(board.len(), 1);
    assert_eq!(board[0].total_score, 80);
}
