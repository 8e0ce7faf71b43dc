#![allow(dead_code)]

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use movie_ratings::{
    aggregate::{Aggregate, ScoreChange},
    cache::MovieCache,
    db::{Database, MemoryStore, MemoryUnit, MovieStore, RatingStore},
    errors::AppError,
    models::{Movie, NewMovie, NewRating, RaterRating, Rating, RatingUpdate},
    service::RatingService,
};
use tokio::sync::watch;

/// Memory store that counts movie reads and can be told to fail or stall.
pub struct InstrumentedStore {
    pub inner: MemoryStore,
    movie_reads: AtomicUsize,
    fail_score_changes: AtomicBool,
    fail_movie_reads: AtomicBool,
    // reads still to be held back once the row has been read
    held_movie_reads: AtomicUsize,
    reads_released: watch::Sender<bool>,
}

impl Default for InstrumentedStore {
    fn default() -> Self {
        Self {
            inner: MemoryStore::new(),
            movie_reads: AtomicUsize::new(0),
            fail_score_changes: AtomicBool::new(false),
            fail_movie_reads: AtomicBool::new(false),
            held_movie_reads: AtomicUsize::new(0),
            reads_released: watch::channel(true).0,
        }
    }
}

impl InstrumentedStore {
    /// The next `count` movie reads fetch their row and then wait for
    /// `release_movie_reads` before returning it.
    pub fn hold_next_movie_reads(&self, count: usize) {
        self.reads_released.send_replace(false);
        self.held_movie_reads.store(count, Ordering::SeqCst);
    }

    pub fn release_movie_reads(&self) {
        self.reads_released.send_replace(true);
    }

    pub fn held_movie_reads(&self) -> usize {
        self.held_movie_reads.load(Ordering::SeqCst)
    }

    pub fn movie_reads(&self) -> usize {
        self.movie_reads.load(Ordering::SeqCst)
    }

    pub fn fail_score_changes(&self, fail: bool) {
        self.fail_score_changes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_movie_reads(&self, fail: bool) {
        self.fail_movie_reads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Database for InstrumentedStore {
    type Unit = MemoryUnit;

    async fn begin(&self) -> Result<MemoryUnit, AppError> {
        self.inner.begin().await
    }
}

#[async_trait]
impl RatingStore for InstrumentedStore {
    async fn create_rating(
        &self,
        rating: NewRating,
        unit: Option<&mut MemoryUnit>,
    ) -> Result<Rating, AppError> {
        self.inner.create_rating(rating, unit).await
    }

    async fn update_rating(
        &self,
        update: RatingUpdate,
        unit: Option<&mut MemoryUnit>,
    ) -> Result<Rating, AppError> {
        self.inner.update_rating(update, unit).await
    }

    async fn delete_rating(
        &self,
        rater_id: i64,
        movie_id: i64,
        expected_version: i64,
        unit: Option<&mut MemoryUnit>,
    ) -> Result<Rating, AppError> {
        self.inner
            .delete_rating(rater_id, movie_id, expected_version, unit)
            .await
    }

    async fn ratings_by_rater(
        &self,
        rater_id: i64,
        unit: Option<&mut MemoryUnit>,
    ) -> Result<Vec<RaterRating>, AppError> {
        self.inner.ratings_by_rater(rater_id, unit).await
    }

    async fn rating_by_movie_and_rater(
        &self,
        movie_id: i64,
        rater_id: i64,
        unit: Option<&mut MemoryUnit>,
    ) -> Result<Rating, AppError> {
        self.inner
            .rating_by_movie_and_rater(movie_id, rater_id, unit)
            .await
    }
}

#[async_trait]
impl MovieStore for InstrumentedStore {
    async fn create_movie(
        &self,
        movie: NewMovie,
        unit: Option<&mut MemoryUnit>,
    ) -> Result<Movie, AppError> {
        self.inner.create_movie(movie, unit).await
    }

    async fn get_movie(&self, id: i64, unit: Option<&mut MemoryUnit>) -> Result<Movie, AppError> {
        self.movie_reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_movie_reads.load(Ordering::SeqCst) {
            return Err(AppError::StoreTimeout(Duration::from_secs(1)));
        }
        let movie = self.inner.get_movie(id, unit).await;

        let held = self
            .held_movie_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if held {
            let mut released = self.reads_released.subscribe();
            let _ = released.wait_for(|released| *released).await;
        }
        movie
    }

    async fn list_movies(&self, unit: Option<&mut MemoryUnit>) -> Result<Vec<Movie>, AppError> {
        self.inner.list_movies(unit).await
    }

    async fn update_movie(
        &self,
        id: i64,
        details: NewMovie,
        unit: Option<&mut MemoryUnit>,
    ) -> Result<Movie, AppError> {
        self.inner.update_movie(id, details, unit).await
    }

    async fn delete_movie(
        &self,
        id: i64,
        unit: Option<&mut MemoryUnit>,
    ) -> Result<Movie, AppError> {
        self.inner.delete_movie(id, unit).await
    }

    async fn apply_score_change(
        &self,
        movie_id: i64,
        change: ScoreChange,
        unit: Option<&mut MemoryUnit>,
    ) -> Result<Aggregate, AppError> {
        if self.fail_score_changes.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError(format!(
                "Failed to update movie {} aggregate: injected failure",
                movie_id
            )));
        }
        self.inner.apply_score_change(movie_id, change, unit).await
    }
}

pub struct Harness {
    pub store: Arc<InstrumentedStore>,
    pub service: RatingService<InstrumentedStore>,
}

pub fn harness(ttl: Duration) -> Harness {
    let store = Arc::new(InstrumentedStore::default());
    let cache = Arc::new(MovieCache::new(store.clone(), ttl));
    let service = RatingService::new(store.clone(), cache);
    Harness { store, service }
}

pub fn new_movie(title: &str) -> NewMovie {
    NewMovie {
        title: title.to_string(),
        description: format!("{title} description"),
        genre: "Drama".to_string(),
        director: "Someone".to_string(),
        year: 2001,
    }
}

pub async fn seed_movie(store: &InstrumentedStore, title: &str) -> Movie {
    store.inner.create_movie(new_movie(title), None).await.unwrap()
}

pub fn assert_aggregate(actual: Aggregate, average: f64, count: i64) {
    assert_eq!(actual.count, count, "count of {actual:?}");
    assert!(
        (actual.average - average).abs() < 1e-9,
        "expected average {average}, got {actual:?}"
    );
}
