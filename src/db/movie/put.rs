use sqlx::PgConnection;

use crate::{
    errors::AppError,
    models::{Movie, NewMovie},
};

pub async fn update_movie(
    conn: &mut PgConnection,
    id: i64,
    details: &NewMovie,
) -> Result<Movie, AppError> {
    let updated = sqlx::query_as::<_, Movie>(
        "UPDATE movies
        SET title = $2, description = $3, genre = $4, director = $5, year = $6,
            updated_at = NOW()
        WHERE id = $1
        RETURNING id, title, description, genre, director, year, rating, rating_count,
            created_at, updated_at",
    )
    .bind(id)
    .bind(&details.title)
    .bind(&details.description)
    .bind(&details.genre)
    .bind(&details.director)
    .bind(details.year)
    .fetch_optional(conn)
    .await
    .map_err(|e| AppError::DatabaseError(format!("Failed to update movie: {}", e)))?
    .ok_or_else(|| AppError::NotFound(format!("Movie {} not found", id)))?;

    tracing::info!("Updated movie: {} (ID: {})", updated.title, updated.id);

    Ok(updated)
}
