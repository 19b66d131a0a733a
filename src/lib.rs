pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod location;
pub mod logging;
pub mod models;
pub mod permission;
pub mod picker;
pub mod ui;
