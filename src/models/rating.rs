use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{errors::AppError, models::movie::RatedMovie};

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub id: i64,
    pub rater_id: i64,
    pub movie_id: i64,
    pub score: f64,
    pub review: Option<String>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRating {
    pub rater_id: i64,
    pub movie_id: i64,
    pub score: f64,
    pub review: Option<String>,
}

/// Replacement values for an existing rating, applied only if the stored
/// row still carries `expected_version`.
#[derive(Debug, Clone)]
pub struct RatingUpdate {
    pub rater_id: i64,
    pub movie_id: i64,
    pub score: f64,
    pub review: Option<String>,
    pub expected_version: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaterRating {
    pub rated_movie: RatedMovie,
    pub score: f64,
    pub review: Option<String>,
}

pub fn validate_score(score: f64) -> Result<(), AppError> {
    if !score.is_finite() || !(MIN_SCORE..=MAX_SCORE).contains(&score) {
        return Err(AppError::Validation(format!(
            "Score must be between {MIN_SCORE} and {MAX_SCORE}, got {score}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_score_bounds() {
        assert!(validate_score(0.0).is_ok());
        assert!(validate_score(2.5).is_ok());
        assert!(validate_score(5.0).is_ok());

        assert!(validate_score(-0.1).is_err());
        assert!(validate_score(5.1).is_err());
        assert!(validate_score(f64::NAN).is_err());
        assert!(validate_score(f64::INFINITY).is_err());
    }

    #[test]
    fn test_validate_score_message() {
        let err = validate_score(7.0).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(err.to_string().contains("between 0 and 5"));
    }
}
