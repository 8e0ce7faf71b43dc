mod common;

use std::{sync::Arc, time::Duration};

use common::{InstrumentedStore, assert_aggregate, harness, seed_movie};
use movie_ratings::{cache::MovieCache, db::MovieStore, errors::AppError};

const TTL: Duration = Duration::from_secs(30);

#[tokio::test(start_paused = true)]
async fn test_reads_within_ttl_hit_cache() {
    let h = harness(TTL);
    let movie = seed_movie(&h.store, "Alien").await;

    h.service.get_movie(movie.id).await.unwrap();
    tokio::time::advance(Duration::from_secs(10)).await;
    h.service.get_movie(movie.id).await.unwrap();

    assert_eq!(h.store.movie_reads(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_read_after_ttl_refetches() {
    let h = harness(TTL);
    let movie = seed_movie(&h.store, "Alien").await;

    h.service.get_movie(movie.id).await.unwrap();
    tokio::time::advance(TTL + Duration::from_millis(1)).await;
    h.service.get_movie(movie.id).await.unwrap();

    assert_eq!(h.store.movie_reads(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_committed_change_visible_before_ttl() {
    let h = harness(TTL);
    let movie = seed_movie(&h.store, "Alien").await;

    let before = h.service.get_movie(movie.id).await.unwrap();
    assert_eq!(before.rating_count, 0);

    h.service.create_rating(1, movie.id, 4.5, None).await.unwrap();
    let after = h.service.get_movie(movie.id).await.unwrap();
    assert_aggregate(after.aggregate(), 4.5, 1);

    h.service.update_rating(1, movie.id, 2.0, None).await.unwrap();
    assert_aggregate(
        h.service.movie_aggregate(movie.id).await.unwrap(),
        2.0,
        1,
    );

    h.service.delete_rating(1, movie.id).await.unwrap();
    assert_eq!(
        h.service.movie_aggregate(movie.id).await.unwrap().count,
        0
    );
}

#[tokio::test(start_paused = true)]
async fn test_refresh_restarts_ttl() {
    let h = harness(TTL);
    let movie = seed_movie(&h.store, "Alien").await;

    h.service.get_movie(movie.id).await.unwrap();
    tokio::time::advance(Duration::from_secs(20)).await;
    h.service.create_rating(1, movie.id, 3.0, None).await.unwrap();
    let reads_after_refresh = h.store.movie_reads();

    tokio::time::advance(Duration::from_secs(20)).await;
    let movie = h.service.get_movie(movie.id).await.unwrap();
    assert_eq!(movie.rating_count, 1);
    assert_eq!(h.store.movie_reads(), reads_after_refresh);
}

#[tokio::test(start_paused = true)]
async fn test_failed_refresh_keeps_commit_and_evicts_entry() {
    let h = harness(TTL);
    let movie = seed_movie(&h.store, "Alien").await;
    h.service.get_movie(movie.id).await.unwrap();

    h.store.fail_movie_reads(true);
    h.service.create_rating(1, movie.id, 5.0, None).await.unwrap();
    h.store.fail_movie_reads(false);

    let stored = h.store.inner.get_movie(movie.id, None).await.unwrap();
    assert_eq!(stored.rating_count, 1);

    let cached = h.service.get_movie(movie.id).await.unwrap();
    assert_aggregate(cached.aggregate(), 5.0, 1);
}

#[tokio::test(start_paused = true)]
async fn test_missing_movie_not_cached() {
    let h = harness(TTL);
    let err = h.service.get_movie(99).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert!(h.service.cache().is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn test_purge_expired_drops_only_stale_entries() {
    let store = Arc::new(InstrumentedStore::default());
    let cache = MovieCache::with_shards(store.clone(), TTL, 4);
    let first = seed_movie(&store, "Alien").await;
    let second = seed_movie(&store, "Heat").await;

    cache.get(first.id).await.unwrap();
    tokio::time::advance(Duration::from_secs(20)).await;
    cache.get(second.id).await.unwrap();
    tokio::time::advance(Duration::from_secs(15)).await;

    assert_eq!(cache.purge_expired().await, 1);
    assert_eq!(cache.len().await, 1);

    cache.get(second.id).await.unwrap();
    assert_eq!(store.movie_reads(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_sharded_cache_serves_many_movies() {
    let store = Arc::new(InstrumentedStore::default());
    let cache = MovieCache::with_shards(store.clone(), TTL, 8);

    let mut ids = Vec::new();
    for i in 0..32 {
        ids.push(seed_movie(&store, &format!("Movie {i}")).await.id);
    }
    for id in &ids {
        assert_eq!(cache.get(*id).await.unwrap().id, *id);
    }
    for id in &ids {
        cache.get(*id).await.unwrap();
    }

    assert_eq!(cache.len().await, 32);
    assert_eq!(store.movie_reads(), 32);
    assert_eq!(
        store.inner.list_movies(None).await.unwrap().len(),
        ids.len()
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_mutation_still_refreshes_cache() {
    let h = harness(TTL);
    let movie = seed_movie(&h.store, "Alien").await;
    h.service.get_movie(movie.id).await.unwrap();

    h.store.hold_next_movie_reads(1);
    let cancelled = tokio::time::timeout(
        Duration::from_millis(100),
        h.service.create_rating(1, movie.id, 4.5, None),
    )
    .await;
    assert!(cancelled.is_err());

    h.store.release_movie_reads();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let reads = h.store.movie_reads();
    assert_aggregate(
        h.service.movie_aggregate(movie.id).await.unwrap(),
        4.5,
        1,
    );
    assert_eq!(h.store.movie_reads(), reads);
}

#[tokio::test(start_paused = true)]
async fn test_slow_miss_does_not_overwrite_newer_refresh() {
    let h = harness(TTL);
    let movie = seed_movie(&h.store, "Alien").await;

    h.store.hold_next_movie_reads(1);
    let cache = h.service.cache().clone();
    let movie_id = movie.id;
    let slow_miss = tokio::spawn(async move { cache.get(movie_id).await });
    while h.store.held_movie_reads() > 0 {
        tokio::task::yield_now().await;
    }

    h.service.create_rating(1, movie.id, 4.0, None).await.unwrap();
    h.store.release_movie_reads();
    let stale = slow_miss.await.unwrap().unwrap();
    assert_eq!(stale.rating_count, 0);

    let reads = h.store.movie_reads();
    assert_aggregate(
        h.service.movie_aggregate(movie.id).await.unwrap(),
        4.0,
        1,
    );
    assert_eq!(h.store.movie_reads(), reads);
}

#[tokio::test(start_paused = true)]
async fn test_slow_miss_does_not_restore_deleted_movie() {
    let h = harness(TTL);
    let movie = seed_movie(&h.store, "Alien").await;

    h.store.hold_next_movie_reads(1);
    let cache = h.service.cache().clone();
    let movie_id = movie.id;
    let slow_miss = tokio::spawn(async move { cache.get(movie_id).await });
    while h.store.held_movie_reads() > 0 {
        tokio::task::yield_now().await;
    }

    h.service.delete_movie(movie.id).await.unwrap();
    h.store.release_movie_reads();
    assert!(slow_miss.await.unwrap().is_ok());

    let err = h.service.get_movie(movie.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert!(h.service.cache().is_empty().await);
}
