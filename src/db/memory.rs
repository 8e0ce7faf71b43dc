//! In-process store with the same contract as the Postgres store.
//!
//! A unit of work holds the store lock from `begin` until it is committed or
//! rolled back, so units are fully serialized. Writes inside a unit go to a
//! staged copy of the state that only replaces the shared state on commit.
//! Waiting for the lock is bounded like a store call and fails with
//! `StoreTimeout`.

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    aggregate::{Aggregate, ScoreChange},
    db::{Database, MovieStore, RatingStore, UnitOfWork, tx::bounded},
    errors::AppError,
    models::{Movie, NewMovie, NewRating, RatedMovie, RaterRating, Rating, RatingUpdate},
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    movies: BTreeMap<i64, Movie>,
    // keyed by (rater_id, movie_id)
    ratings: BTreeMap<(i64, i64), Rating>,
    next_movie_id: i64,
    next_rating_id: i64,
}

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    lock_timeout: Duration,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_timeout(DEFAULT_LOCK_TIMEOUT)
    }
}

pub struct MemoryUnit {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(lock_timeout: Duration) -> Self {
        Self {
            state: Arc::default(),
            lock_timeout,
        }
    }

    async fn lock(&self) -> Result<OwnedMutexGuard<MemoryState>, AppError> {
        bounded(self.lock_timeout, async {
            Ok(self.state.clone().lock_owned().await)
        })
        .await
    }

    async fn read<T, F>(&self, unit: Option<&mut MemoryUnit>, op: F) -> Result<T, AppError>
    where
        F: FnOnce(&MemoryState) -> Result<T, AppError> + Send,
    {
        match unit {
            Some(unit) => op(&unit.staged),
            None => op(&*self.lock().await?),
        }
    }

    /// Writes outside a unit go to a copy so a failed `op` leaves no trace.
    async fn run<T, F>(&self, unit: Option<&mut MemoryUnit>, op: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut MemoryState) -> Result<T, AppError> + Send,
    {
        match unit {
            Some(unit) => op(&mut unit.staged),
            None => {
                let mut state = self.lock().await?;
                let mut staged = state.clone();
                let value = op(&mut staged)?;
                *state = staged;
                Ok(value)
            }
        }
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnit {
    async fn commit(mut self) -> Result<(), AppError> {
        *self.guard = self.staged;
        Ok(())
    }

    async fn rollback(self) -> Result<(), AppError> {
        Ok(())
    }
}

#[async_trait]
impl Database for MemoryStore {
    type Unit = MemoryUnit;

    async fn begin(&self) -> Result<MemoryUnit, AppError> {
        let guard = self.lock().await?;
        let staged = guard.clone();
        Ok(MemoryUnit { guard, staged })
    }
}

impl MemoryState {
    fn versioned_rating(
        &mut self,
        rater_id: i64,
        movie_id: i64,
        expected_version: i64,
    ) -> Result<&mut Rating, AppError> {
        let rating = self.ratings.get_mut(&(rater_id, movie_id)).ok_or_else(|| {
            AppError::NotFound(format!(
                "No rating from rater {} on movie {}",
                rater_id, movie_id
            ))
        })?;
        if rating.version != expected_version {
            return Err(AppError::Conflict(format!(
                "Rating of rater {} on movie {} is at version {}, expected {}",
                rater_id, movie_id, rating.version, expected_version
            )));
        }
        Ok(rating)
    }

    fn movie(&self, id: i64) -> Result<&Movie, AppError> {
        self.movies
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Movie {} not found", id)))
    }

    fn movie_mut(&mut self, id: i64) -> Result<&mut Movie, AppError> {
        self.movies
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Movie {} not found", id)))
    }
}

#[async_trait]
impl RatingStore for MemoryStore {
    async fn create_rating(
        &self,
        rating: NewRating,
        unit: Option<&mut MemoryUnit>,
    ) -> Result<Rating, AppError> {
        self.run(unit, move |state| {
            if !state.movies.contains_key(&rating.movie_id) {
                return Err(AppError::NotFound(format!(
                    "Failed to create rating: movie {} not found",
                    rating.movie_id
                )));
            }
            let key = (rating.rater_id, rating.movie_id);
            if state.ratings.contains_key(&key) {
                return Err(AppError::DuplicateRating {
                    rater_id: rating.rater_id,
                    movie_id: rating.movie_id,
                });
            }

            state.next_rating_id += 1;
            let now = Utc::now();
            let created = Rating {
                id: state.next_rating_id,
                rater_id: rating.rater_id,
                movie_id: rating.movie_id,
                score: rating.score,
                review: rating.review,
                version: 1,
                created_at: now,
                updated_at: now,
            };
            state.ratings.insert(key, created.clone());
            Ok(created)
        })
        .await
    }

    async fn update_rating(
        &self,
        update: RatingUpdate,
        unit: Option<&mut MemoryUnit>,
    ) -> Result<Rating, AppError> {
        self.run(unit, move |state| {
            let rating =
                state.versioned_rating(update.rater_id, update.movie_id, update.expected_version)?;
            rating.score = update.score;
            rating.review = update.review;
            rating.version += 1;
            rating.updated_at = Utc::now();
            Ok(rating.clone())
        })
        .await
    }

    async fn delete_rating(
        &self,
        rater_id: i64,
        movie_id: i64,
        expected_version: i64,
        unit: Option<&mut MemoryUnit>,
    ) -> Result<Rating, AppError> {
        self.run(unit, move |state| {
            state.versioned_rating(rater_id, movie_id, expected_version)?;
            state
                .ratings
                .remove(&(rater_id, movie_id))
                .ok_or(AppError::InternalError)
        })
        .await
    }

    async fn ratings_by_rater(
        &self,
        rater_id: i64,
        unit: Option<&mut MemoryUnit>,
    ) -> Result<Vec<RaterRating>, AppError> {
        self.read(unit, move |state| {
            let mut ratings: Vec<&Rating> = state
                .ratings
                .range((rater_id, i64::MIN)..=(rater_id, i64::MAX))
                .map(|(_, rating)| rating)
                .collect();
            ratings.sort_by_key(|rating| rating.id);

            ratings
                .into_iter()
                .map(|rating| {
                    let movie = state.movies.get(&rating.movie_id).ok_or_else(|| {
                        AppError::NotFound(format!("Movie {} not found", rating.movie_id))
                    })?;
                    Ok(RaterRating {
                        rated_movie: RatedMovie::from(movie),
                        score: rating.score,
                        review: rating.review.clone(),
                    })
                })
                .collect()
        })
        .await
    }

    async fn rating_by_movie_and_rater(
        &self,
        movie_id: i64,
        rater_id: i64,
        unit: Option<&mut MemoryUnit>,
    ) -> Result<Rating, AppError> {
        self.read(unit, move |state| {
            state
                .ratings
                .get(&(rater_id, movie_id))
                .cloned()
                .ok_or_else(|| {
                    AppError::NotFound(format!(
                        "No rating from rater {} on movie {}",
                        rater_id, movie_id
                    ))
                })
        })
        .await
    }
}

#[async_trait]
impl MovieStore for MemoryStore {
    async fn create_movie(
        &self,
        movie: NewMovie,
        unit: Option<&mut MemoryUnit>,
    ) -> Result<Movie, AppError> {
        self.run(unit, move |state| {
            state.next_movie_id += 1;
            let now = Utc::now();
            let created = Movie {
                id: state.next_movie_id,
                title: movie.title,
                description: movie.description,
                genre: movie.genre,
                director: movie.director,
                year: movie.year,
                rating: 0.0,
                rating_count: 0,
                created_at: now,
                updated_at: now,
            };
            state.movies.insert(created.id, created.clone());
            Ok(created)
        })
        .await
    }

    async fn get_movie(&self, id: i64, unit: Option<&mut MemoryUnit>) -> Result<Movie, AppError> {
        self.read(unit, move |state| state.movie(id).cloned()).await
    }

    async fn list_movies(&self, unit: Option<&mut MemoryUnit>) -> Result<Vec<Movie>, AppError> {
        self.read(unit, |state| Ok(state.movies.values().cloned().collect()))
            .await
    }

    async fn update_movie(
        &self,
        id: i64,
        details: NewMovie,
        unit: Option<&mut MemoryUnit>,
    ) -> Result<Movie, AppError> {
        self.run(unit, move |state| {
            let movie = state.movie_mut(id)?;
            movie.title = details.title;
            movie.description = details.description;
            movie.genre = details.genre;
            movie.director = details.director;
            movie.year = details.year;
            movie.updated_at = Utc::now();
            Ok(movie.clone())
        })
        .await
    }

    async fn delete_movie(
        &self,
        id: i64,
        unit: Option<&mut MemoryUnit>,
    ) -> Result<Movie, AppError> {
        self.run(unit, move |state| {
            let movie = state
                .movies
                .remove(&id)
                .ok_or_else(|| AppError::NotFound(format!("Movie {} not found", id)))?;
            state.ratings.retain(|&(_, movie_id), _| movie_id != id);
            Ok(movie)
        })
        .await
    }

    async fn apply_score_change(
        &self,
        movie_id: i64,
        change: ScoreChange,
        unit: Option<&mut MemoryUnit>,
    ) -> Result<Aggregate, AppError> {
        self.run(unit, move |state| {
            let movie = state.movie_mut(movie_id)?;
            let aggregate = movie.aggregate().apply(change);
            movie.set_aggregate(aggregate);
            movie.updated_at = Utc::now();
            Ok(aggregate)
        })
        .await
    }
}
