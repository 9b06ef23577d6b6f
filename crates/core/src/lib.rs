pub mod config;
pub mod errors;
pub mod geo;
pub mod models;
pub mod traits;

pub use errors::*;
pub use geo::{distance_km, GeoPoint};
pub use models::*;
pub use traits::*;
