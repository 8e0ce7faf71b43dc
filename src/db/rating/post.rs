use sqlx::PgConnection;

use crate::{
    errors::AppError,
    models::{NewRating, Rating},
};

pub async fn insert_rating(
    conn: &mut PgConnection,
    rating: &NewRating,
) -> Result<Rating, AppError> {
    let created = sqlx::query_as::<_, Rating>(
        "INSERT INTO ratings (rater_id, movie_id, score, review)
        VALUES ($1, $2, $3, $4)
        RETURNING id, rater_id, movie_id, score, review, version, created_at, updated_at",
    )
    .bind(rating.rater_id)
    .bind(rating.movie_id)
    .bind(rating.score)
    .bind(&rating.review)
    .fetch_one(conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            return AppError::DuplicateRating {
                rater_id: rating.rater_id,
                movie_id: rating.movie_id,
            };
        }
        AppError::from_sqlx(e, "Failed to create rating")
    })?;

    Ok(created)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}
