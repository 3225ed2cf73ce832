pub mod api;
pub mod error;
pub mod models;
pub mod validate;

pub use error::ValidationError;
pub use models::{Find, Location, Media, MediaType, Moment, MomentId, Share};
