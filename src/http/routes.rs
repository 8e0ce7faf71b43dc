use axum::{
    Router,
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    db::Store,
    http::handlers::{
        create_movie_handler, create_rating_handler, delete_movie_handler, delete_rating_handler,
        get_all_movies_handler, get_movie_handler, get_user_ratings_handler, update_movie_handler,
        update_rating_handler,
    },
    state::AppState,
};

pub fn create_http_routes<S: Store>(state: AppState<S>) -> Router {
    Router::new()
        .route("/health", get(|| async { StatusCode::OK }))
        .route(
            "/movie",
            get(get_all_movies_handler::<S>).post(create_movie_handler::<S>),
        )
        .route(
            "/movie/{id}",
            get(get_movie_handler::<S>)
                .put(update_movie_handler::<S>)
                .delete(delete_movie_handler::<S>),
        )
        .route(
            "/movie/{id}/rating",
            post(create_rating_handler::<S>)
                .patch(update_rating_handler::<S>)
                .delete(delete_rating_handler::<S>),
        )
        .route("/user/rating", get(get_user_ratings_handler::<S>))
        .with_state(state)
}
