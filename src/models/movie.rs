use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::aggregate::Aggregate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub genre: String,
    pub director: String,
    pub year: i32,
    pub rating: f64,
    pub rating_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Movie {
    pub fn aggregate(&self) -> Aggregate {
        Aggregate::new(self.rating, self.rating_count)
    }

    pub fn set_aggregate(&mut self, aggregate: Aggregate) {
        self.rating = aggregate.average;
        self.rating_count = aggregate.count;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMovie {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub director: String,
    pub year: i32,
}

/// Read-only summary of a movie shown next to a rater's own ratings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatedMovie {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub genre: String,
    pub director: String,
    pub year: i32,
    pub rating: f64,
}

impl From<&Movie> for RatedMovie {
    fn from(movie: &Movie) -> Self {
        Self {
            id: movie.id,
            title: movie.title.clone(),
            description: movie.description.clone(),
            genre: movie.genre.clone(),
            director: movie.director.clone(),
            year: movie.year,
            rating: movie.rating,
        }
    }
}
