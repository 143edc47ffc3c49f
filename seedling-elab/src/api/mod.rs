//! HTTP API handlers for seedling-elab

pub mod auth;
pub mod elaborate;
pub mod health;
pub mod seeds;

pub use auth::auth_middleware;
pub use elaborate::elaborate_routes;
pub use health::health_routes;
pub use seeds::seed_routes;
