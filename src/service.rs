use std::{future::Future, sync::Arc};

use crate::{
    aggregate::{Aggregate, ScoreChange},
    cache::MovieCache,
    db::{Database, Store, settle},
    errors::AppError,
    models::{
        Movie, NewMovie, NewRating, RaterRating, Rating, RatingUpdate, rating::validate_score,
    },
};

/// Orchestrates rating changes: each mutation runs the row change and the
/// matching aggregate change in one unit of work, then refreshes the cached
/// movie once the unit has committed.
///
/// Mutations run on their own task. A caller that goes away mid-mutation
/// does not stop the commit, nor the cache refresh that follows it.
pub struct RatingService<S> {
    store: Arc<S>,
    movies: Arc<MovieCache<S>>,
}

impl<S> Clone for RatingService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            movies: self.movies.clone(),
        }
    }
}

impl<S: Store> RatingService<S> {
    pub fn new(store: Arc<S>, movies: Arc<MovieCache<S>>) -> Self {
        Self { store, movies }
    }

    pub fn cache(&self) -> &Arc<MovieCache<S>> {
        &self.movies
    }

    pub async fn create_rating(
        &self,
        rater_id: i64,
        movie_id: i64,
        score: f64,
        review: Option<String>,
    ) -> Result<Rating, AppError> {
        validate_score(score)?;

        let service = self.clone();
        detached(async move {
            let mut unit = service.store.begin().await?;
            let result = service
                .create_in(
                    &mut unit,
                    NewRating {
                        rater_id,
                        movie_id,
                        score,
                        review,
                    },
                )
                .await;
            let (rating, aggregate) = settle(unit, result).await?;

            tracing::info!(
                "Rating {} created by rater {} on movie {} (average {:.3} over {})",
                rating.id,
                rater_id,
                movie_id,
                aggregate.average,
                aggregate.count
            );
            service.refresh_movie(movie_id).await;
            Ok(rating)
        })
        .await
    }

    pub async fn update_rating(
        &self,
        rater_id: i64,
        movie_id: i64,
        score: f64,
        review: Option<String>,
    ) -> Result<Rating, AppError> {
        validate_score(score)?;

        let service = self.clone();
        detached(async move {
            let mut unit = service.store.begin().await?;
            let result = service
                .update_in(&mut unit, rater_id, movie_id, score, review)
                .await;
            let (rating, aggregate) = settle(unit, result).await?;

            tracing::info!(
                "Rating {} updated by rater {} on movie {} (average {:.3} over {})",
                rating.id,
                rater_id,
                movie_id,
                aggregate.average,
                aggregate.count
            );
            service.refresh_movie(movie_id).await;
            Ok(rating)
        })
        .await
    }

    pub async fn delete_rating(&self, rater_id: i64, movie_id: i64) -> Result<(), AppError> {
        let service = self.clone();
        detached(async move {
            let mut unit = service.store.begin().await?;
            let result = service.delete_in(&mut unit, rater_id, movie_id).await;
            let (rating, aggregate) = settle(unit, result).await?;

            tracing::info!(
                "Rating {} deleted by rater {} on movie {} (average {:.3} over {})",
                rating.id,
                rater_id,
                movie_id,
                aggregate.average,
                aggregate.count
            );
            service.refresh_movie(movie_id).await;
            Ok(())
        })
        .await
    }

    pub async fn ratings_for_rater(&self, rater_id: i64) -> Result<Vec<RaterRating>, AppError> {
        self.store.ratings_by_rater(rater_id, None).await
    }

    pub async fn movie_aggregate(&self, movie_id: i64) -> Result<Aggregate, AppError> {
        self.movies.aggregate(movie_id).await
    }

    pub async fn get_movie(&self, movie_id: i64) -> Result<Movie, AppError> {
        self.movies.get(movie_id).await
    }

    pub async fn create_movie(&self, movie: NewMovie) -> Result<Movie, AppError> {
        validate_title(&movie)?;
        self.store.create_movie(movie, None).await
    }

    pub async fn update_movie(&self, movie_id: i64, details: NewMovie) -> Result<Movie, AppError> {
        validate_title(&details)?;

        let service = self.clone();
        detached(async move {
            let movie = service.store.update_movie(movie_id, details, None).await?;
            tracing::info!("Movie {} updated", movie_id);
            service.refresh_movie(movie_id).await;
            Ok(movie)
        })
        .await
    }

    pub async fn delete_movie(&self, movie_id: i64) -> Result<(), AppError> {
        let service = self.clone();
        detached(async move {
            service.store.delete_movie(movie_id, None).await?;
            tracing::info!("Movie {} deleted", movie_id);
            service.movies.invalidate(movie_id).await;
            Ok(())
        })
        .await
    }

    pub async fn list_movies(&self) -> Result<Vec<Movie>, AppError> {
        self.store.list_movies(None).await
    }

    async fn create_in(
        &self,
        unit: &mut <S as Database>::Unit,
        rating: NewRating,
    ) -> Result<(Rating, Aggregate), AppError> {
        let movie_id = rating.movie_id;
        let score = rating.score;
        let created = self.store.create_rating(rating, Some(&mut *unit)).await?;
        let aggregate = self
            .store
            .apply_score_change(movie_id, ScoreChange::Add(score), Some(unit))
            .await?;
        Ok((created, aggregate))
    }

    async fn update_in(
        &self,
        unit: &mut <S as Database>::Unit,
        rater_id: i64,
        movie_id: i64,
        score: f64,
        review: Option<String>,
    ) -> Result<(Rating, Aggregate), AppError> {
        let prior = self
            .store
            .rating_by_movie_and_rater(movie_id, rater_id, Some(&mut *unit))
            .await?;
        let updated = self
            .store
            .update_rating(
                RatingUpdate {
                    rater_id,
                    movie_id,
                    score,
                    review,
                    expected_version: prior.version,
                },
                Some(&mut *unit),
            )
            .await?;
        let aggregate = self
            .store
            .apply_score_change(
                movie_id,
                ScoreChange::Replace {
                    old: prior.score,
                    new: score,
                },
                Some(unit),
            )
            .await?;
        Ok((updated, aggregate))
    }

    async fn delete_in(
        &self,
        unit: &mut <S as Database>::Unit,
        rater_id: i64,
        movie_id: i64,
    ) -> Result<(Rating, Aggregate), AppError> {
        let prior = self
            .store
            .rating_by_movie_and_rater(movie_id, rater_id, Some(&mut *unit))
            .await?;
        let deleted = self
            .store
            .delete_rating(rater_id, movie_id, prior.version, Some(&mut *unit))
            .await?;
        let aggregate = self
            .store
            .apply_score_change(movie_id, ScoreChange::Remove(deleted.score), Some(unit))
            .await?;
        Ok((deleted, aggregate))
    }

    /// A failed refresh must not undo the committed change; the entry is
    /// dropped so the next read goes back to the store.
    async fn refresh_movie(&self, movie_id: i64) {
        if let Err(err) = self.movies.refresh(movie_id).await {
            tracing::warn!("Failed to refresh cached movie {}: {}", movie_id, err);
            self.movies.invalidate(movie_id).await;
        }
    }
}

fn validate_title(movie: &NewMovie) -> Result<(), AppError> {
    if movie.title.trim().is_empty() {
        return Err(AppError::Validation("Movie title must not be empty".into()));
    }
    Ok(())
}

/// Runs `work` on its own task and waits for it. Dropping the returned future
/// leaves the task running to completion.
async fn detached<T, F>(work: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(work).await.map_err(|e| {
        tracing::error!("Mutation task failed: {}", e);
        AppError::InternalError
    })?
}
