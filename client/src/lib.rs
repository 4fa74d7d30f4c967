pub mod activation;
pub mod api;
pub mod config;
pub mod error;
pub mod messages;
pub mod status_cache;
