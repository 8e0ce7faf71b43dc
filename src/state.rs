use std::sync::Arc;

use axum::extract::FromRef;

use crate::{auth::JwtSecret, service::RatingService};

pub struct AppState<S> {
    pub ratings: Arc<RatingService<S>>,
    pub jwt_secret: JwtSecret,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            ratings: self.ratings.clone(),
            jwt_secret: self.jwt_secret.clone(),
        }
    }
}

impl<S> FromRef<AppState<S>> for JwtSecret {
    fn from_ref(state: &AppState<S>) -> Self {
        state.jwt_secret.clone()
    }
}
