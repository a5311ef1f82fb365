pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod render;
pub mod scheduler;
pub mod session;
pub mod transport;
pub mod ui;
