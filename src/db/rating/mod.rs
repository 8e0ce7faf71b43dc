pub mod delete;
pub mod get;
pub mod patch;
pub mod post;

use sqlx::PgConnection;

use crate::errors::AppError;

pub use delete::delete_rating;
pub use get::{find_rating, get_rating, get_ratings_by_rater};
pub use patch::update_rating;
pub use post::insert_rating;

/// Explains why a versioned write matched no row: the rating is either gone
/// or was changed by someone else since it was read.
async fn missing_or_conflict(
    conn: &mut PgConnection,
    rater_id: i64,
    movie_id: i64,
    expected_version: i64,
) -> AppError {
    match find_rating(conn, movie_id, rater_id).await {
        Ok(None) => not_found(rater_id, movie_id),
        Ok(Some(current)) => AppError::Conflict(format!(
            "Rating of rater {} on movie {} is at version {}, expected {}",
            rater_id, movie_id, current.version, expected_version
        )),
        Err(e) => e,
    }
}

fn not_found(rater_id: i64, movie_id: i64) -> AppError {
    AppError::NotFound(format!(
        "No rating from rater {} on movie {}",
        rater_id, movie_id
    ))
}
