use sqlx::PgConnection;

use crate::{
    db::rating::missing_or_conflict,
    errors::AppError,
    models::{Rating, RatingUpdate},
};

pub async fn update_rating(
    conn: &mut PgConnection,
    update: &RatingUpdate,
) -> Result<Rating, AppError> {
    let updated = sqlx::query_as::<_, Rating>(
        "UPDATE ratings
        SET score = $3, review = $4, version = version + 1, updated_at = NOW()
        WHERE rater_id = $1 AND movie_id = $2 AND version = $5
        RETURNING id, rater_id, movie_id, score, review, version, created_at, updated_at",
    )
    .bind(update.rater_id)
    .bind(update.movie_id)
    .bind(update.score)
    .bind(&update.review)
    .bind(update.expected_version)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| AppError::from_sqlx(e, "Failed to update rating"))?;

    match updated {
        Some(rating) => Ok(rating),
        None => Err(missing_or_conflict(
            conn,
            update.rater_id,
            update.movie_id,
            update.expected_version,
        )
        .await),
    }
}
