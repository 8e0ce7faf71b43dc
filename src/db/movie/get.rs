use sqlx::PgConnection;

use crate::{errors::AppError, models::Movie};

pub async fn get_movie(conn: &mut PgConnection, id: i64) -> Result<Movie, AppError> {
    sqlx::query_as::<_, Movie>(
        "SELECT id, title, description, genre, director, year, rating, rating_count,
            created_at, updated_at
        FROM movies
        WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(conn)
    .await
    .map_err(|e| AppError::DatabaseError(format!("Failed to fetch movie: {}", e)))?
    .ok_or_else(|| AppError::NotFound(format!("Movie {} not found", id)))
}

pub async fn list_movies(conn: &mut PgConnection) -> Result<Vec<Movie>, AppError> {
    sqlx::query_as::<_, Movie>(
        "SELECT id, title, description, genre, director, year, rating, rating_count,
            created_at, updated_at
        FROM movies
        ORDER BY id",
    )
    .fetch_all(conn)
    .await
    .map_err(|e| AppError::DatabaseError(format!("Failed to list movies: {}", e)))
}
