//! Persistence seams for ratings and movie aggregates.
//!
//! Every store call takes an optional unit of work. Passing `Some(unit)` runs
//! the call inside that unit so several calls commit or roll back together;
//! passing `None` makes the call open and finish its own unit.

pub mod memory;
pub mod movie;
pub mod postgres;
pub mod rating;
pub mod tx;

use async_trait::async_trait;

use crate::{
    aggregate::{Aggregate, ScoreChange},
    errors::AppError,
    models::{Movie, NewMovie, NewRating, RaterRating, Rating, RatingUpdate},
};

pub use memory::{MemoryStore, MemoryUnit};
pub use postgres::PgStore;
pub use tx::PgUnit;

#[async_trait]
pub trait UnitOfWork: Send {
    async fn commit(self) -> Result<(), AppError>;
    async fn rollback(self) -> Result<(), AppError>;
}

#[async_trait]
pub trait Database: Send + Sync + 'static {
    type Unit: UnitOfWork;

    async fn begin(&self) -> Result<Self::Unit, AppError>;
}

#[async_trait]
pub trait RatingStore: Database {
    /// Fails with `DuplicateRating` if the rater already rated the movie.
    async fn create_rating(
        &self,
        rating: NewRating,
        unit: Option<&mut Self::Unit>,
    ) -> Result<Rating, AppError>;

    /// Fails with `NotFound` when no rating exists for the pair and with
    /// `Conflict` when it exists under a different version.
    async fn update_rating(
        &self,
        update: RatingUpdate,
        unit: Option<&mut Self::Unit>,
    ) -> Result<Rating, AppError>;

    /// Returns the deleted row. Same `NotFound`/`Conflict` split as updates.
    async fn delete_rating(
        &self,
        rater_id: i64,
        movie_id: i64,
        expected_version: i64,
        unit: Option<&mut Self::Unit>,
    ) -> Result<Rating, AppError>;

    async fn ratings_by_rater(
        &self,
        rater_id: i64,
        unit: Option<&mut Self::Unit>,
    ) -> Result<Vec<RaterRating>, AppError>;

    async fn rating_by_movie_and_rater(
        &self,
        movie_id: i64,
        rater_id: i64,
        unit: Option<&mut Self::Unit>,
    ) -> Result<Rating, AppError>;
}

#[async_trait]
pub trait MovieStore: Database {
    async fn create_movie(
        &self,
        movie: NewMovie,
        unit: Option<&mut Self::Unit>,
    ) -> Result<Movie, AppError>;

    async fn get_movie(&self, id: i64, unit: Option<&mut Self::Unit>) -> Result<Movie, AppError>;

    async fn list_movies(&self, unit: Option<&mut Self::Unit>) -> Result<Vec<Movie>, AppError>;

    /// Replaces the descriptive fields. The aggregate is left as it is.
    async fn update_movie(
        &self,
        id: i64,
        details: NewMovie,
        unit: Option<&mut Self::Unit>,
    ) -> Result<Movie, AppError>;

    /// Deletes the movie together with its ratings and returns the deleted row.
    async fn delete_movie(
        &self,
        id: i64,
        unit: Option<&mut Self::Unit>,
    ) -> Result<Movie, AppError>;

    /// Applies the change to the stored aggregate in one atomic step and
    /// returns the resulting aggregate.
    async fn apply_score_change(
        &self,
        movie_id: i64,
        change: ScoreChange,
        unit: Option<&mut Self::Unit>,
    ) -> Result<Aggregate, AppError>;
}

pub trait Store: RatingStore + MovieStore {}

impl<T: RatingStore + MovieStore> Store for T {}

/// Commits the unit when `result` is `Ok`, otherwise rolls it back and
/// returns the original error. A failed rollback is reported as a
/// `Transaction` error.
pub async fn settle<U, T>(unit: U, result: Result<T, AppError>) -> Result<T, AppError>
where
    U: UnitOfWork,
    T: Send,
{
    match result {
        Ok(value) => {
            unit.commit().await?;
            Ok(value)
        }
        Err(err) => match unit.rollback().await {
            Ok(()) => Err(err),
            Err(rollback_err) => {
                tracing::error!("Rollback failed after '{}': {}", err, rollback_err);
                Err(AppError::Transaction(format!(
                    "rollback after '{err}' failed: {rollback_err}"
                )))
            }
        },
    }
}
