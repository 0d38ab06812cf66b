//! HTTP API handlers for ffs-server

pub mod health;
pub mod statistics;
pub mod tournaments;

pub use health::health_routes;
pub use statistics::statistics_routes;
pub use tournaments::tournament_routes;
