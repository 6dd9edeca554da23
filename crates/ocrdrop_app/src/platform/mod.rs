mod app;
mod config;
mod effects;
mod logging;
mod scan;
mod ui;

pub use app::run_app;
