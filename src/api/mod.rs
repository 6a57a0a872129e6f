//! HTTP API handlers for voxcheck

pub mod detection;
pub mod health;

pub use detection::detection_routes;
pub use health::health_routes;
