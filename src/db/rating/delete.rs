use sqlx::PgConnection;

use crate::{db::rating::missing_or_conflict, errors::AppError, models::Rating};

pub async fn delete_rating(
    conn: &mut PgConnection,
    rater_id: i64,
    movie_id: i64,
    expected_version: i64,
) -> Result<Rating, AppError> {
    let deleted = sqlx::query_as::<_, Rating>(
        "DELETE FROM ratings
        WHERE rater_id = $1 AND movie_id = $2 AND version = $3
        RETURNING id, rater_id, movie_id, score, review, version, created_at, updated_at",
    )
    .bind(rater_id)
    .bind(movie_id)
    .bind(expected_version)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| AppError::from_sqlx(e, "Failed to delete rating"))?;

    match deleted {
        Some(rating) => Ok(rating),
        None => Err(missing_or_conflict(conn, rater_id, movie_id, expected_version).await),
    }
}
