pub mod assignments;
pub mod assistance;
pub mod dispatches;
pub mod health;
pub mod metrics;
pub mod resources;
