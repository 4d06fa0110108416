pub mod app;
pub mod backend;
pub mod components;
pub mod config;
pub mod tui;
pub mod types;
pub mod utils;
pub mod widgets;
