use sqlx::PgConnection;

use crate::{
    aggregate::{Aggregate, ScoreChange},
    errors::AppError,
};

// Evaluated against the stored row in a single statement. Right-hand sides
// see the pre-update values.
const ADD_SQL: &str = "UPDATE movies
    SET rating = (rating * rating_count + $2) / (rating_count + 1),
        rating_count = rating_count + 1,
        updated_at = NOW()
    WHERE id = $1
    RETURNING rating, rating_count";

const REPLACE_SQL: &str = "UPDATE movies
    SET rating = (rating * rating_count - $2 + $3) / GREATEST(rating_count, 1),
        updated_at = NOW()
    WHERE id = $1
    RETURNING rating, rating_count";

const REMOVE_SQL: &str = "UPDATE movies
    SET rating = (rating * rating_count - $2) / GREATEST(rating_count - 1, 1),
        rating_count = GREATEST(rating_count - 1, 0),
        updated_at = NOW()
    WHERE id = $1
    RETURNING rating, rating_count";

pub async fn apply_score_change(
    conn: &mut PgConnection,
    movie_id: i64,
    change: ScoreChange,
) -> Result<Aggregate, AppError> {
    let query = match change {
        ScoreChange::Add(score) => sqlx::query_as::<_, (f64, i64)>(ADD_SQL)
            .bind(movie_id)
            .bind(score),
        ScoreChange::Replace { old, new } => sqlx::query_as::<_, (f64, i64)>(REPLACE_SQL)
            .bind(movie_id)
            .bind(old)
            .bind(new),
        ScoreChange::Remove(score) => sqlx::query_as::<_, (f64, i64)>(REMOVE_SQL)
            .bind(movie_id)
            .bind(score),
    };

    let (average, count) = query
        .fetch_optional(conn)
        .await
        .map_err(|e| {
            AppError::DatabaseError(format!("Failed to update movie {} aggregate: {}", movie_id, e))
        })?
        .ok_or_else(|| AppError::NotFound(format!("Movie {} not found", movie_id)))?;

    Ok(Aggregate::new(average, count))
}
