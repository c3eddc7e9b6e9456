pub mod api;
pub mod auth;
pub mod comments;
pub mod config;
pub mod content;
pub mod database;
pub mod engagement;
pub mod error;
pub mod feed;
pub mod profiles;
pub mod tags;
pub mod telemetry;
pub mod utils;
