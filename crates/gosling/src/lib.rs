pub mod agent;
pub mod developer;
pub mod errors;
pub mod models;
pub mod providers;
pub mod systems;
