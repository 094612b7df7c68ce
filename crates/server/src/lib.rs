// quire-server library entry point: document store and HTTP service.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod store;
