//! HTTP API handlers for pronounce-api

pub mod assess;
pub mod health;

pub use assess::assess_routes;
pub use health::health_routes;
