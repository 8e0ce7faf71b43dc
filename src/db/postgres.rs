use std::time::Duration;

use async_trait::async_trait;
use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{
    aggregate::{Aggregate, ScoreChange},
    config::Config,
    db::{
        Database, MovieStore, RatingStore, movie, rating, settle,
        tx::{PgUnit, bounded},
    },
    errors::AppError,
    models::{Movie, NewMovie, NewRating, RaterRating, Rating, RatingUpdate},
};

/// Runs `$body` against the caller's unit, or against a unit of its own that
/// is committed or rolled back before returning.
macro_rules! within_unit {
    ($store:expr, $unit:expr, |$conn:ident| $body:expr) => {
        match $unit {
            Some(unit) => {
                let $conn = unit.conn();
                bounded($store.call_timeout, $body).await
            }
            None => {
                let mut own = $store.begin().await?;
                let result = {
                    let $conn = own.conn();
                    bounded($store.call_timeout, $body).await
                };
                settle(own, result).await
            }
        }
    };
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    call_timeout: Duration,
}

impl PgStore {
    pub fn new(pool: PgPool, call_timeout: Duration) -> Self {
        Self { pool, call_timeout }
    }

    pub async fn connect(config: &Config) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(config.store_timeout)
            .connect(&config.database_url)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect to database: {}", e)))?;

        if config.migrate {
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to run migrations: {}", e)))?;
            tracing::info!("Database migrations applied");
        }

        Ok(Self::new(pool, config.store_timeout))
    }
}

#[async_trait]
impl Database for PgStore {
    type Unit = PgUnit;

    async fn begin(&self) -> Result<PgUnit, AppError> {
        PgUnit::begin(&self.pool, self.call_timeout).await
    }
}

#[async_trait]
impl RatingStore for PgStore {
    async fn create_rating(
        &self,
        new_rating: NewRating,
        unit: Option<&mut PgUnit>,
    ) -> Result<Rating, AppError> {
        within_unit!(self, unit, |conn| rating::insert_rating(conn, &new_rating))
    }

    async fn update_rating(
        &self,
        update: RatingUpdate,
        unit: Option<&mut PgUnit>,
    ) -> Result<Rating, AppError> {
        within_unit!(self, unit, |conn| rating::update_rating(conn, &update))
    }

    async fn delete_rating(
        &self,
        rater_id: i64,
        movie_id: i64,
        expected_version: i64,
        unit: Option<&mut PgUnit>,
    ) -> Result<Rating, AppError> {
        within_unit!(self, unit, |conn| rating::delete_rating(
            conn,
            rater_id,
            movie_id,
            expected_version
        ))
    }

    async fn ratings_by_rater(
        &self,
        rater_id: i64,
        unit: Option<&mut PgUnit>,
    ) -> Result<Vec<RaterRating>, AppError> {
        within_unit!(self, unit, |conn| rating::get_ratings_by_rater(
            conn, rater_id
        ))
    }

    async fn rating_by_movie_and_rater(
        &self,
        movie_id: i64,
        rater_id: i64,
        unit: Option<&mut PgUnit>,
    ) -> Result<Rating, AppError> {
        within_unit!(self, unit, |conn| rating::get_rating(
            conn, movie_id, rater_id
        ))
    }
}

#[async_trait]
impl MovieStore for PgStore {
    async fn create_movie(
        &self,
        new_movie: NewMovie,
        unit: Option<&mut PgUnit>,
    ) -> Result<Movie, AppError> {
        within_unit!(self, unit, |conn| movie::insert_movie(conn, &new_movie))
    }

    async fn get_movie(&self, id: i64, unit: Option<&mut PgUnit>) -> Result<Movie, AppError> {
        within_unit!(self, unit, |conn| movie::get_movie(conn, id))
    }

    async fn list_movies(&self, unit: Option<&mut PgUnit>) -> Result<Vec<Movie>, AppError> {
        within_unit!(self, unit, |conn| movie::list_movies(conn))
    }

    async fn update_movie(
        &self,
        id: i64,
        details: NewMovie,
        unit: Option<&mut PgUnit>,
    ) -> Result<Movie, AppError> {
        within_unit!(self, unit, |conn| movie::update_movie(conn, id, &details))
    }

    async fn delete_movie(&self, id: i64, unit: Option<&mut PgUnit>) -> Result<Movie, AppError> {
        within_unit!(self, unit, |conn| movie::delete_movie(conn, id))
    }

    async fn apply_score_change(
        &self,
        movie_id: i64,
        change: ScoreChange,
        unit: Option<&mut PgUnit>,
    ) -> Result<Aggregate, AppError> {
        within_unit!(self, unit, |conn| movie::apply_score_change(
            conn, movie_id, change
        ))
    }
}
