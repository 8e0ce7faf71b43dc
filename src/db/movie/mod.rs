pub mod delete;
pub mod get;
pub mod patch;
pub mod post;
pub mod put;

pub use delete::delete_movie;
pub use get::{get_movie, list_movies};
pub use patch::apply_score_change;
pub use post::insert_movie;
pub use put::update_movie;
