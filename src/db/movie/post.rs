use sqlx::PgConnection;

use crate::{
    errors::AppError,
    models::{Movie, NewMovie},
};

pub async fn insert_movie(conn: &mut PgConnection, movie: &NewMovie) -> Result<Movie, AppError> {
    let created = sqlx::query_as::<_, Movie>(
        "INSERT INTO movies (title, description, genre, director, year)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, title, description, genre, director, year, rating, rating_count,
            created_at, updated_at",
    )
    .bind(&movie.title)
    .bind(&movie.description)
    .bind(&movie.genre)
    .bind(&movie.director)
    .bind(movie.year)
    .fetch_one(conn)
    .await
    .map_err(|e| AppError::DatabaseError(format!("Failed to create movie: {}", e)))?;

    tracing::info!("Created movie: {} (ID: {})", created.title, created.id);

    Ok(created)
}
