pub mod movie;
pub mod rating;

pub use movie::{
    create_movie_handler, delete_movie_handler, get_all_movies_handler, get_movie_handler,
    update_movie_handler,
};
pub use rating::{
    create_rating_handler, delete_rating_handler, get_user_ratings_handler, update_rating_handler,
};
