use sqlx::PgConnection;

use crate::{errors::AppError, models::Movie};

/// Ratings of the movie go with it through `ON DELETE CASCADE`.
pub async fn delete_movie(conn: &mut PgConnection, id: i64) -> Result<Movie, AppError> {
    let deleted = sqlx::query_as::<_, Movie>(
        "DELETE FROM movies
        WHERE id = $1
        RETURNING id, title, description, genre, director, year, rating, rating_count,
            created_at, updated_at",
    )
    .bind(id)
    .fetch_optional(conn)
    .await
    .map_err(|e| AppError::DatabaseError(format!("Failed to delete movie: {}", e)))?
    .ok_or_else(|| AppError::NotFound(format!("Movie {} not found", id)))?;

    tracing::info!("Deleted movie {} with its ratings", id);

    Ok(deleted)
}
