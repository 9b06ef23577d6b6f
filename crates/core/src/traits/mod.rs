pub mod repository;
pub mod strategy;

pub use repository::*;
pub use strategy::*;
