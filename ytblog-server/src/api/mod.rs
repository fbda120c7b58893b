//! HTTP API handlers for ytblog-server

pub mod cache_admin;
pub mod health;
pub mod videos;

pub use cache_admin::cache_routes;
pub use health::health_routes;
pub use videos::video_routes;
