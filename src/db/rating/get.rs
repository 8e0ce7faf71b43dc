use sqlx::{FromRow, PgConnection};

use crate::{
    db::rating::not_found,
    errors::AppError,
    models::{RatedMovie, RaterRating, Rating},
};

pub async fn find_rating(
    conn: &mut PgConnection,
    movie_id: i64,
    rater_id: i64,
) -> Result<Option<Rating>, AppError> {
    sqlx::query_as::<_, Rating>(
        "SELECT id, rater_id, movie_id, score, review, version, created_at, updated_at
        FROM ratings
        WHERE movie_id = $1 AND rater_id = $2",
    )
    .bind(movie_id)
    .bind(rater_id)
    .fetch_optional(conn)
    .await
    .map_err(|e| AppError::from_sqlx(e, "Failed to fetch rating"))
}

pub async fn get_rating(
    conn: &mut PgConnection,
    movie_id: i64,
    rater_id: i64,
) -> Result<Rating, AppError> {
    find_rating(conn, movie_id, rater_id)
        .await?
        .ok_or_else(|| not_found(rater_id, movie_id))
}

#[derive(FromRow)]
struct RaterRatingRow {
    movie_id: i64,
    title: String,
    description: String,
    genre: String,
    director: String,
    year: i32,
    rating: f64,
    score: f64,
    review: Option<String>,
}

impl From<RaterRatingRow> for RaterRating {
    fn from(row: RaterRatingRow) -> Self {
        Self {
            rated_movie: RatedMovie {
                id: row.movie_id,
                title: row.title,
                description: row.description,
                genre: row.genre,
                director: row.director,
                year: row.year,
                rating: row.rating,
            },
            score: row.score,
            review: row.review,
        }
    }
}

pub async fn get_ratings_by_rater(
    conn: &mut PgConnection,
    rater_id: i64,
) -> Result<Vec<RaterRating>, AppError> {
    let rows = sqlx::query_as::<_, RaterRatingRow>(
        "SELECT r.movie_id, m.title, m.description, m.genre, m.director, m.year, m.rating,
            r.score, r.review
        FROM ratings r
        JOIN movies m ON m.id = r.movie_id
        WHERE r.rater_id = $1
        ORDER BY r.id",
    )
    .bind(rater_id)
    .fetch_all(conn)
    .await
    .map_err(|e| AppError::from_sqlx(e, "Failed to fetch rater's ratings"))?;

    Ok(rows.into_iter().map(RaterRating::from).collect())
}
