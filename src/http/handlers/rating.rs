use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use crate::{auth::AuthClaims, db::Store, models::RaterRating, state::AppState};

#[derive(Deserialize)]
pub struct RatingPayload {
    pub score: f64,
    pub review: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RatingIdResponse {
    pub id: i64,
}

pub async fn create_rating_handler<S: Store>(
    State(state): State<AppState<S>>,
    claims: AuthClaims,
    Path(movie_id): Path<i64>,
    Json(payload): Json<RatingPayload>,
) -> Result<(StatusCode, Json<RatingIdResponse>), (StatusCode, String)> {
    let rater_id = claims.rater_id()?;

    let rating = state
        .ratings
        .create_rating(rater_id, movie_id, payload.score, payload.review)
        .await
        .map_err(|e| {
            tracing::error!("Error rating movie {} by rater {}: {}", movie_id, rater_id, e);
            e.to_response()
        })?;

    Ok((StatusCode::CREATED, Json(RatingIdResponse { id: rating.id })))
}

pub async fn update_rating_handler<S: Store>(
    State(state): State<AppState<S>>,
    claims: AuthClaims,
    Path(movie_id): Path<i64>,
    Json(payload): Json<RatingPayload>,
) -> Result<Json<RatingIdResponse>, (StatusCode, String)> {
    let rater_id = claims.rater_id()?;

    let rating = state
        .ratings
        .update_rating(rater_id, movie_id, payload.score, payload.review)
        .await
        .map_err(|e| {
            tracing::error!(
                "Error updating rating on movie {} by rater {}: {}",
                movie_id,
                rater_id,
                e
            );
            e.to_response()
        })?;

    Ok(Json(RatingIdResponse { id: rating.id }))
}

pub async fn delete_rating_handler<S: Store>(
    State(state): State<AppState<S>>,
    claims: AuthClaims,
    Path(movie_id): Path<i64>,
) -> Result<StatusCode, (StatusCode, String)> {
    let rater_id = claims.rater_id()?;

    state
        .ratings
        .delete_rating(rater_id, movie_id)
        .await
        .map_err(|e| {
            tracing::error!(
                "Error deleting rating on movie {} by rater {}: {}",
                movie_id,
                rater_id,
                e
            );
            e.to_response()
        })?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_user_ratings_handler<S: Store>(
    State(state): State<AppState<S>>,
    claims: AuthClaims,
) -> Result<Json<Vec<RaterRating>>, (StatusCode, String)> {
    let rater_id = claims.rater_id()?;

    let ratings = state.ratings.ratings_for_rater(rater_id).await.map_err(|e| {
        tracing::error!("Error retrieving ratings of rater {}: {}", rater_id, e);
        e.to_response()
    })?;

    Ok(Json(ratings))
}
