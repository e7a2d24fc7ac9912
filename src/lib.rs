pub mod app;
pub mod audio;
pub mod cli;
pub mod config;
pub mod engine;
pub mod global;
pub mod loader;
