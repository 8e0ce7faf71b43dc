use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    auth::AuthClaims,
    db::Store,
    models::{Movie, NewMovie},
    state::AppState,
};

pub async fn create_movie_handler<S: Store>(
    State(state): State<AppState<S>>,
    claims: AuthClaims,
    Json(payload): Json<NewMovie>,
) -> Result<(StatusCode, Json<Movie>), (StatusCode, String)> {
    claims.require_admin()?;

    let movie = state.ratings.create_movie(payload).await.map_err(|e| {
        tracing::error!("Error creating movie: {}", e);
        e.to_response()
    })?;

    Ok((StatusCode::CREATED, Json(movie)))
}

pub async fn get_movie_handler<S: Store>(
    Path(movie_id): Path<i64>,
    State(state): State<AppState<S>>,
) -> Result<Json<Movie>, (StatusCode, String)> {
    let movie = state.ratings.get_movie(movie_id).await.map_err(|e| {
        tracing::error!("Error retrieving movie {}: {}", movie_id, e);
        e.to_response()
    })?;

    Ok(Json(movie))
}

pub async fn get_all_movies_handler<S: Store>(
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<Movie>>, (StatusCode, String)> {
    let movies = state.ratings.list_movies().await.map_err(|e| {
        tracing::error!("Error listing movies: {}", e);
        e.to_response()
    })?;

    Ok(Json(movies))
}

pub async fn update_movie_handler<S: Store>(
    State(state): State<AppState<S>>,
    claims: AuthClaims,
    Path(movie_id): Path<i64>,
    Json(payload): Json<NewMovie>,
) -> Result<Json<Movie>, (StatusCode, String)> {
    claims.require_admin()?;

    let movie = state
        .ratings
        .update_movie(movie_id, payload)
        .await
        .map_err(|e| {
            tracing::error!("Error updating movie {}: {}", movie_id, e);
            e.to_response()
        })?;

    Ok(Json(movie))
}

pub async fn delete_movie_handler<S: Store>(
    State(state): State<AppState<S>>,
    claims: AuthClaims,
    Path(movie_id): Path<i64>,
) -> Result<StatusCode, (StatusCode, String)> {
    claims.require_admin()?;

    state.ratings.delete_movie(movie_id).await.map_err(|e| {
        tracing::error!("Error deleting movie {}: {}", movie_id, e);
        e.to_response()
    })?;

    Ok(StatusCode::NO_CONTENT)
}
