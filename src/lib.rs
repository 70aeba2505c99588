//! Client for the smartfarm backend: session handling, farm registration
//! with per-device verification, and the farm list and detail views.

pub mod app;
pub mod auth;
pub mod config;
pub mod device;
pub mod errors;
pub mod farm;
pub mod gateway;
pub mod models;
pub mod session;
pub mod ui;
