pub mod movie;
pub mod rating;
pub mod user;

pub use movie::{Movie, NewMovie, RatedMovie};
pub use rating::{NewRating, RaterRating, Rating, RatingUpdate};
pub use user::Claims;
